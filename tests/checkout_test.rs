mod common;

use common::{Call, FakeDriver, FakeNode, test_config};
use restock_watch::{
    MonitorError,
    checkout::{CheckoutOrchestrator, CheckoutStep, OrderButton},
    config::Config,
    poller::StockPoller,
    session::SessionManager,
    step::StepStatus,
};
use std::sync::Arc;
use std::time::Duration;

async fn checkout_with(config: Config, driver: &FakeDriver) -> restock_watch::checkout::CheckoutReport {
    let config = Arc::new(config);
    let session = SessionManager::new(config.clone())
        .authenticate(driver)
        .await
        .unwrap();
    let detection = StockPoller::new(config.clone())
        .poll_until_available(driver, &session)
        .await
        .unwrap();

    CheckoutOrchestrator::new(config)
        .run(driver, &session, &detection.candidates)
        .await
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_checkout_clicks_in_order() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_checkout()
        .with_listings(vec![vec![FakeNode::checkbox("A"), FakeNode::checkbox("B")]]);

    let report = checkout_with(config, &driver).await;

    assert!(report.is_confirmed());
    assert_eq!(report.selected, vec![0, 1]);
    assert_eq!(report.order_button, Some(OrderButton::Primary));

    let clicked = driver.clicked();
    let tail = &clicked[clicked.len() - 3..];
    assert_eq!(tail, ["A", "B", "checkout"]);
    assert!(!clicked.contains(&"place order".to_string()));
    assert_eq!(driver.force_clicked(), ["place order"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_selection_skips_only_that_candidate() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_checkout()
        .with_listings(vec![vec![
            FakeNode::checkbox("A"),
            FakeNode::checkbox("B").failing_click(),
            FakeNode::checkbox("C"),
        ]]);

    let report = checkout_with(config, &driver).await;

    assert_eq!(report.selected, vec![0, 2]);
    assert!(report.is_confirmed());
    assert!(!driver.clicked().contains(&"B".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_missing_primary_button_falls_back_to_forced_click() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_checkout()
        .without(&config.selectors.place_order_primary)
        .with(
            &config.selectors.place_order_fallback,
            FakeNode::new("place order by label"),
        )
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);

    let started = tokio::time::Instant::now();
    let report = checkout_with(config, &driver).await;

    assert!(report.is_confirmed());
    assert_eq!(report.order_button, Some(OrderButton::Label));
    assert_eq!(report.attempt.step, CheckoutStep::Confirmed);
    assert_eq!(driver.force_clicked(), ["place order by label"]);
    assert!(!driver.clicked().contains(&"place order by label".to_string()));
    assert!(started.elapsed() >= Duration::from_millis(5_000));
}

#[tokio::test(start_paused = true)]
async fn test_failed_primary_click_falls_back_to_label() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_checkout()
        .without(&config.selectors.place_order_primary)
        .with(
            &config.selectors.place_order_primary,
            FakeNode::new("place order").failing_force_click(),
        )
        .with(
            &config.selectors.place_order_fallback,
            FakeNode::new("place order by label"),
        )
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);

    let report = checkout_with(config, &driver).await;

    assert!(report.is_confirmed());
    assert_eq!(report.order_button, Some(OrderButton::Label));
    assert_eq!(driver.force_clicked(), ["place order by label"]);
    assert!(
        report
            .attempt
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("detached"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_lingering_overlay_is_tolerated() {
    let config = test_config();
    let timeout = config.monitor.timeout();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_checkout()
        .with(&config.selectors.loading_overlay, FakeNode::new("overlay"))
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);

    let started = tokio::time::Instant::now();
    let report = checkout_with(config, &driver).await;

    assert!(report.is_confirmed());
    assert_eq!(report.order_button, Some(OrderButton::Primary));
    let overlay = report
        .steps
        .iter()
        .find(|s| s.name == "loading overlay cleared")
        .unwrap();
    assert!(matches!(overlay.status, StepStatus::Skipped(_)));
    assert!(started.elapsed() >= timeout);
    assert_eq!(driver.force_clicked(), ["place order"]);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_checkout_button_escalates_to_forced_click() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with(
            &config.selectors.checkout_button,
            FakeNode::new("checkout")
                .failing_click()
                .navigates_to(common::CONFIRMATION_URL),
        )
        .with(&config.selectors.place_order_primary, FakeNode::new("place order"))
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);

    let report = checkout_with(config, &driver).await;

    assert!(report.is_confirmed());
    assert_eq!(driver.force_clicked(), ["checkout", "place order"]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_checkout_button_aborts_before_submission() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);

    let report = checkout_with(config, &driver).await;

    assert_eq!(report.attempt.step, CheckoutStep::Aborted);
    assert_eq!(report.aborted_at, Some(CheckoutStep::CartReviewed));
    assert!(!report.submitted());
    assert_eq!(report.selected, vec![0]);

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, MonitorError::CheckoutAborted { .. }));
    assert_eq!(err.exit_code(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_page_never_loading_aborts_after_submission() {
    let config = test_config();
    let driver = FakeDriver::signed_in(&config.selectors)
        .with(&config.selectors.checkout_button, FakeNode::new("checkout"))
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);

    let report = checkout_with(config, &driver).await;

    assert_eq!(report.aborted_at, Some(CheckoutStep::CheckoutSubmitted));
    assert!(report.submitted());
    assert!(report.error.as_ref().is_some_and(|e| e.is_timeout()));
}
