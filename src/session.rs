use crate::{
    AuthFailure, MonitorError, Result,
    config::Config,
    driver::Driver,
    selectors::Locator,
    step::{StepLog, StepRecord},
    timeouts::ms,
};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

/// Proof that the login sequence completed on the driver's browser.
///
/// Only [`SessionManager::authenticate`] creates one.
#[derive(Debug)]
pub struct AuthenticatedSession {
    established_at: DateTime<Local>,
    steps: Vec<StepRecord>,
}

impl AuthenticatedSession {
    pub fn established_at(&self) -> DateTime<Local> {
        self.established_at
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }
}

pub struct SessionManager {
    config: Arc<Config>,
}

impl SessionManager {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub async fn authenticate<D: Driver>(&self, driver: &D) -> Result<AuthenticatedSession> {
        let selectors = &self.config.selectors;
        let credentials = &self.config.credentials;
        let timeout = self.config.monitor.timeout();
        let mut steps = StepLog::new();

        tracing::info!(url = %self.config.target.login_url, "signing in");

        steps
            .require(
                "open login page",
                auth(
                    "open login page",
                    driver.navigate(&self.config.target.login_url),
                ),
            )
            .await?;
        settle(ms::LOGIN_PAGE_SETTLE).await;

        // Geo and cookie banners only show up for some regions.
        if steps
            .tolerate(
                "dismiss region selector",
                click_present(driver, &selectors.region_selector),
            )
            .await
            .is_some()
        {
            settle(ms::BANNER_SETTLE).await;
        }
        if steps
            .tolerate(
                "accept policy banner",
                click_present(driver, &selectors.policy_accept),
            )
            .await
            .is_some()
        {
            settle(ms::BANNER_SETTLE).await;
        }

        steps
            .require(
                "check consent box",
                auth(
                    "check consent box",
                    click_present(driver, &selectors.consent_checkbox),
                ),
            )
            .await?;
        settle(ms::PAGE_SETTLE).await;

        steps
            .require(
                "enter email",
                auth("enter email", async {
                    let input = driver.locate(&selectors.email_input).await?;
                    driver.type_text(&input, &credentials.email).await
                }),
            )
            .await?;
        settle(ms::PAGE_SETTLE).await;

        steps
            .require(
                "continue",
                auth("continue", click_present(driver, &selectors.continue_button)),
            )
            .await?;
        settle(ms::LOGIN_PAGE_SETTLE).await;

        steps
            .require(
                "enter password",
                auth("enter password", async {
                    let input = driver.wait_for(&selectors.password_input, timeout).await?;
                    driver.type_text(&input, &credentials.password).await
                }),
            )
            .await?;
        settle(ms::PAGE_SETTLE).await;

        steps
            .require(
                "sign in",
                auth("sign in", click_present(driver, &selectors.sign_in_button)),
            )
            .await?;

        steps
            .require("confirm login", async {
                driver
                    .wait_for(&selectors.cart_indicator, timeout)
                    .await
                    .map(|_| ())
                    .map_err(|e| match e {
                        MonitorError::Timeout { .. } => AuthFailure::LoginNotConfirmed.into(),
                        other => classify("confirm login", other),
                    })
            })
            .await?;

        tracing::info!("login confirmed");

        Ok(AuthenticatedSession {
            established_at: Local::now(),
            steps: steps.into_records(),
        })
    }
}

async fn click_present<D: Driver>(driver: &D, locator: &Locator) -> Result<()> {
    let element = driver.locate(locator).await?;
    driver.click(&element).await
}

async fn settle(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

async fn auth<T>(
    step: &'static str,
    action: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    action.await.map_err(|e| classify(step, e))
}

/// Maps a browser-level failure of a login step onto [`AuthFailure`].
fn classify(step: &'static str, e: MonitorError) -> MonitorError {
    match e {
        MonitorError::Auth(_) => e,
        MonitorError::Timeout { .. } => AuthFailure::Timeout { step }.into(),
        MonitorError::ElementNotFound { .. } => AuthFailure::IncompatiblePage { step }.into(),
        other => AuthFailure::Driver {
            step,
            reason: other.to_string(),
        }
        .into(),
    }
}
