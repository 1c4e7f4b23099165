use crate::{
    Result,
    candidate::{CandidatePolicy, ClassMarkerPolicy},
    checkout::{CheckoutOrchestrator, CheckoutReport, OrderButton},
    config::Config,
    driver::Driver,
    event::StockEvent,
    notify::{DispatchReport, NotifierSet},
    output::{self, OutputFormatter, text},
    poller::StockPoller,
    search::PostCheckoutSearch,
    session::{AuthenticatedSession, SessionManager},
    step::{StepLog, StepRecord, StepStatus},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub event: StockEvent,
    pub poll_cycles: u64,
    pub screenshot: Option<PathBuf>,
    pub dispatch: DispatchReport,
    pub selected: usize,
    pub order_button: Option<OrderButton>,
    pub checkout_steps: Vec<StepRecord>,
    /// Empty when the search did not run.
    pub search_steps: Vec<StepRecord>,
}

impl OutputFormatter for RunSummary {
    fn format_text(&self) -> String {
        let mut lines = vec![text::success(&format!(
            "Order placed for {} of {} item(s) after {} poll cycle(s)",
            self.selected,
            self.event.candidate_count(),
            self.poll_cycles
        ))];

        for name in self.event.names() {
            lines.push(text::bullet(name));
        }
        if let Some(button) = self.order_button {
            lines.push(text::key_value("Order button", &format!("{:?}", button)));
        }
        let skipped = self
            .checkout_steps
            .iter()
            .chain(&self.search_steps)
            .filter(|s| matches!(s.status, StepStatus::Skipped(_)))
            .count();
        if skipped > 0 {
            lines.push(text::warning(&format!("{} optional step(s) skipped", skipped)));
        }
        if let Some(ref path) = self.screenshot {
            lines.push(text::key_value("Screenshot", &path.display().to_string()));
        }
        lines.push(self.dispatch.format_text());

        lines.join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// One monitoring run: sign in, wait for stock, notify, check out, search.
pub struct Monitor<P = ClassMarkerPolicy> {
    config: Arc<Config>,
    sessions: SessionManager,
    poller: StockPoller<P>,
    checkout: CheckoutOrchestrator,
    search: PostCheckoutSearch,
    notifiers: NotifierSet,
}

impl Monitor<ClassMarkerPolicy> {
    pub fn new(config: Arc<Config>, notifiers: NotifierSet) -> Self {
        let poller = StockPoller::new(config.clone());
        Self::with_poller(config, notifiers, poller)
    }
}

impl<P: CandidatePolicy> Monitor<P> {
    pub fn with_poller(config: Arc<Config>, notifiers: NotifierSet, poller: StockPoller<P>) -> Self {
        Self {
            sessions: SessionManager::new(config.clone()),
            checkout: CheckoutOrchestrator::new(config.clone()),
            search: PostCheckoutSearch::new(config.clone()),
            poller,
            notifiers,
            config,
        }
    }

    pub async fn run<D: Driver>(&self, driver: &D) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4();
        self.run_once(driver)
            .instrument(tracing::info_span!("run", id = %run_id))
            .await
    }

    async fn run_once<D: Driver>(&self, driver: &D) -> Result<RunSummary> {
        let session = self.sessions.authenticate(driver).await?;
        self.open_watch_page(driver, &session).await?;

        let detection = self.poller.poll_until_available(driver, &session).await?;
        let screenshot = self.capture(driver, &detection.event).await;
        let dispatch = self
            .notifiers
            .notify(&detection.event, screenshot.as_deref())
            .await;

        let report = self
            .checkout
            .run(driver, &session, &detection.candidates)
            .await;

        let search_steps = if report.submitted() {
            self.search.run(driver).await
        } else {
            Vec::new()
        };

        let CheckoutReport {
            selected,
            order_button,
            steps: checkout_steps,
            ..
        } = report.into_result()?;

        Ok(RunSummary {
            event: detection.event,
            poll_cycles: detection.cycles,
            screenshot,
            dispatch,
            selected: selected.len(),
            order_button,
            checkout_steps,
            search_steps,
        })
    }

    /// Navigates to the configured product page, or clicks through the cart
    /// indicator that confirmed the login.
    async fn open_watch_page<D: Driver>(
        &self,
        driver: &D,
        _session: &AuthenticatedSession,
    ) -> Result<()> {
        let mut steps = StepLog::new();

        match self.config.target.url.as_deref() {
            Some(url) => {
                steps.require("open watch page", driver.navigate(url)).await?;
            }
            None => {
                steps
                    .require("open cart", async {
                        let cart = driver.locate(&self.config.selectors.cart_indicator).await?;
                        driver.click(&cart).await
                    })
                    .await?;
            }
        }

        Ok(())
    }

    async fn capture<D: Driver>(&self, driver: &D, event: &StockEvent) -> Option<PathBuf> {
        if !self.config.monitor.capture_screenshot {
            return None;
        }

        let path = self
            .config
            .monitor
            .screenshot_dir
            .join(event.screenshot_file_name());

        let captured = StepLog::new()
            .tolerate("capture screenshot", driver.screenshot(&path))
            .await;
        captured.map(|()| path)
    }
}
