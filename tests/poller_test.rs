mod common;

use common::{FakeDriver, FakeNode, test_config};
use restock_watch::{
    MonitorError,
    candidate::{Availability, NodeTraits},
    config::Config,
    poller::StockPoller,
    session::{AuthenticatedSession, SessionManager},
};
use std::sync::Arc;

async fn sign_in(config: &Arc<Config>, driver: &FakeDriver) -> AuthenticatedSession {
    SessionManager::new(config.clone())
        .authenticate(driver)
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_empty_cycles_reload_without_event() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors).with_listings(vec![
        vec![],
        vec![FakeNode::disabled("Sold Out")],
        vec![FakeNode::checkbox("A"), FakeNode::checkbox("B")],
    ]);
    let session = sign_in(&config, &driver).await;

    let detection = StockPoller::new(config.clone())
        .poll_until_available(&driver, &session)
        .await
        .unwrap();

    assert_eq!(detection.cycles, 3);
    assert_eq!(driver.reloads(), 2);
    assert_eq!(detection.event.candidate_count(), 2);
    assert_eq!(detection.event.names(), ["A", "B"]);
    assert_eq!(detection.candidates[0].name.as_deref(), Some("A"));
}

#[tokio::test(start_paused = true)]
async fn test_event_fires_once_per_run() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_listings(vec![vec![FakeNode::checkbox("A")]]);
    let session = sign_in(&config, &driver).await;
    let poller = StockPoller::new(config.clone());

    poller.poll_until_available(&driver, &session).await.unwrap();
    let err = poller
        .poll_until_available(&driver, &session)
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::General(_)));
    assert_eq!(driver.reloads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_filter_keeps_only_selectable_leaves() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors).with_listings(vec![vec![
        FakeNode::container("wrapper"),
        FakeNode::disabled("Sold Out"),
        FakeNode::checkbox("Available"),
        FakeNode {
            child_count: 2,
            ..FakeNode::checkbox("Nested")
        },
    ]]);
    let session = sign_in(&config, &driver).await;

    let poller = StockPoller::new(config.clone());
    let listing = poller.scan(&driver).await.unwrap();
    let states: Vec<_> = listing.iter().map(|c| c.availability).collect();
    assert_eq!(states, [Availability::Disabled, Availability::Available]);

    let detection = poller.poll_until_available(&driver, &session).await.unwrap();
    assert_eq!(detection.event.candidate_count(), 1);
    assert_eq!(detection.event.names(), ["Available"]);
}

#[tokio::test(start_paused = true)]
async fn test_unnamed_candidates_still_count() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors).with_listings(vec![vec![
        FakeNode::checkbox("A").unnamed(),
        FakeNode::checkbox("B"),
    ]]);
    let session = sign_in(&config, &driver).await;

    let detection = StockPoller::new(config.clone())
        .poll_until_available(&driver, &session)
        .await
        .unwrap();

    assert_eq!(detection.event.candidate_count(), 2);
    assert_eq!(detection.event.names(), ["B"]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_policy_replaces_class_markers() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors).with_listings(vec![vec![
        FakeNode::disabled("Preorder"),
    ]]);
    let session = sign_in(&config, &driver).await;

    // Treat every node as purchasable, sold-out marker or not.
    let policy = |_: &NodeTraits| Some(Availability::Available);
    let detection = StockPoller::with_policy(config.clone(), policy)
        .poll_until_available(&driver, &session)
        .await
        .unwrap();

    assert_eq!(detection.event.names(), ["Preorder"]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_reload_failures_are_retried() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_listings(vec![vec![], vec![FakeNode::checkbox("A")]])
        .with_failing_reloads(2);
    let session = sign_in(&config, &driver).await;

    let detection = StockPoller::new(config.clone())
        .poll_until_available(&driver, &session)
        .await
        .unwrap();

    assert_eq!(driver.reloads(), 3);
    assert_eq!(detection.cycles, 4);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_reload_failure_ends_polling() {
    let config = Arc::new(test_config());
    let driver = FakeDriver::signed_in(&config.selectors)
        .with_listings(vec![vec![]])
        .with_failing_reloads(usize::MAX);
    let session = sign_in(&config, &driver).await;

    let err = StockPoller::new(config.clone())
        .poll_until_available(&driver, &session)
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::Connection(_)));
    assert_eq!(driver.reloads(), 4);
}
