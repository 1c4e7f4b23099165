//! Purchase flow driven after stock is detected.
//!
//! ```text
//! CandidatesSelected -> CartReviewed -> CheckoutSubmitted
//!     -> AwaitingConfirmation -> Confirmed | Aborted
//! ```
//!
//! The flow runs at most once per run; a failed mandatory step aborts it
//! instead of starting over, since every retry risks a duplicate order.

use crate::{
    MonitorError, Result,
    candidate::ProductCandidate,
    config::Config,
    driver::Driver,
    session::AuthenticatedSession,
    step::{StepLog, StepRecord},
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckoutStep {
    CandidatesSelected,
    CartReviewed,
    CheckoutSubmitted,
    AwaitingConfirmation,
    Confirmed,
    Aborted,
}

impl CheckoutStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Aborted)
    }
}

/// Which order-placement control took the final click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderButton {
    /// Matched by its exact class list.
    Primary,
    /// Found by its label after the primary lookup or click failed.
    Label,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where the flow currently stands.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutAttempt {
    pub step: CheckoutStep,
    pub attempts_at_step: u32,
    pub last_error: Option<String>,
}

impl CheckoutAttempt {
    fn new() -> Self {
        Self {
            step: CheckoutStep::CandidatesSelected,
            attempts_at_step: 0,
            last_error: None,
        }
    }

    fn advance(&mut self, next: CheckoutStep) {
        tracing::debug!(from = %self.step, to = %next, "checkout transition");
        self.step = next;
        self.attempts_at_step = 0;
    }

    fn record_failure(&mut self, error: &MonitorError) {
        self.attempts_at_step += 1;
        self.last_error = Some(error.to_string());
    }
}

#[derive(Debug)]
pub struct CheckoutReport {
    /// Indices into the candidate list whose selection click went through.
    pub selected: Vec<usize>,
    pub attempt: CheckoutAttempt,
    /// The step that was active when the flow aborted.
    pub aborted_at: Option<CheckoutStep>,
    pub order_button: Option<OrderButton>,
    pub steps: Vec<StepRecord>,
    pub error: Option<MonitorError>,
}

impl CheckoutReport {
    pub fn is_confirmed(&self) -> bool {
        self.attempt.step == CheckoutStep::Confirmed
    }

    /// Whether the checkout control was pressed, so an order may be in flight.
    pub fn submitted(&self) -> bool {
        match self.attempt.step {
            CheckoutStep::CheckoutSubmitted
            | CheckoutStep::AwaitingConfirmation
            | CheckoutStep::Confirmed => true,
            CheckoutStep::Aborted => matches!(
                self.aborted_at,
                Some(CheckoutStep::CheckoutSubmitted | CheckoutStep::AwaitingConfirmation)
            ),
            _ => false,
        }
    }

    pub fn into_result(self) -> Result<Self> {
        if let (Some(step), Some(error)) = (self.aborted_at, self.error.as_ref()) {
            return Err(MonitorError::CheckoutAborted {
                step: step.to_string(),
                reason: error.to_string(),
            });
        }
        Ok(self)
    }
}

pub struct CheckoutOrchestrator {
    config: Arc<Config>,
}

impl CheckoutOrchestrator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub async fn run<D: Driver>(
        &self,
        driver: &D,
        _session: &AuthenticatedSession,
        candidates: &[ProductCandidate<D::Element>],
    ) -> CheckoutReport {
        let mut attempt = CheckoutAttempt::new();
        let mut steps = StepLog::new();
        let mut order_button = None;

        let selected = self.select_candidates(driver, candidates, &mut steps).await;
        tracing::info!(selected = selected.len(), of = candidates.len(), "candidates selected");
        attempt.advance(CheckoutStep::CartReviewed);

        let outcome = self
            .advance_to_confirmation(driver, &mut attempt, &mut steps, &mut order_button)
            .await;

        let (aborted_at, error) = match outcome {
            Ok(()) => {
                attempt.advance(CheckoutStep::Confirmed);
                tracing::info!(button = ?order_button, "order placement confirmed");
                (None, None)
            }
            Err(e) => {
                let at = attempt.step;
                attempt.record_failure(&e);
                attempt.step = CheckoutStep::Aborted;
                tracing::error!(step = %at, error = %e, "checkout aborted");
                (Some(at), Some(e))
            }
        };

        CheckoutReport {
            selected,
            attempt,
            aborted_at,
            order_button,
            steps: steps.into_records(),
            error,
        }
    }

    /// Clicks every candidate in order. A failed click skips that candidate.
    pub async fn select_candidates<D: Driver>(
        &self,
        driver: &D,
        candidates: &[ProductCandidate<D::Element>],
        steps: &mut StepLog,
    ) -> Vec<usize> {
        let pacing = self.config.monitor.click_pacing();
        let mut selected = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            if steps
                .tolerate("select candidate", driver.click(&candidate.element))
                .await
                .is_some()
            {
                selected.push(index);
            }
            tokio::time::sleep(pacing).await;
        }

        selected
    }

    async fn advance_to_confirmation<D: Driver>(
        &self,
        driver: &D,
        attempt: &mut CheckoutAttempt,
        steps: &mut StepLog,
        order_button: &mut Option<OrderButton>,
    ) -> Result<()> {
        let selectors = &self.config.selectors;
        let timeout = self.config.monitor.timeout();

        steps
            .require("initiate checkout", async {
                let button = driver.locate(&selectors.checkout_button).await?;
                let tier = driver.click_with_escalation(&button).await?;
                tracing::debug!(?tier, "checkout button clicked");
                Ok(())
            })
            .await?;
        attempt.advance(CheckoutStep::CheckoutSubmitted);

        let url = steps
            .require(
                "reach confirmation page",
                driver.wait_for_url(&selectors.confirmation_url_marker, timeout),
            )
            .await?;
        tracing::info!(%url, "confirmation page reached");

        // The overlay node sometimes stays in the DOM after it stops blocking.
        steps
            .tolerate(
                "loading overlay cleared",
                driver.wait_until_absent(&selectors.loading_overlay, timeout),
            )
            .await;
        attempt.advance(CheckoutStep::AwaitingConfirmation);

        let button = steps
            .require("place order", self.place_order(driver, attempt))
            .await?;
        *order_button = Some(button);

        Ok(())
    }

    /// Forced click on the exact-class button. Any failure there waits,
    /// finds the button by its label and forces that click instead.
    async fn place_order<D: Driver>(
        &self,
        driver: &D,
        attempt: &mut CheckoutAttempt,
    ) -> Result<OrderButton> {
        let selectors = &self.config.selectors;

        let primary = async {
            let button = driver.locate(&selectors.place_order_primary).await?;
            driver.force_click(&button).await
        };
        match primary.await {
            Ok(()) => return Ok(OrderButton::Primary),
            Err(e) => attempt.record_failure(&e),
        }

        tracing::warn!(
            delay_ms = self.config.monitor.confirm_retry_delay_ms,
            error = attempt.last_error.as_deref().unwrap_or_default(),
            "order button by class failed, retrying by label"
        );
        tokio::time::sleep(self.config.monitor.confirm_retry_delay()).await;

        let button = driver.locate(&selectors.place_order_fallback).await?;
        driver.force_click(&button).await?;
        Ok(OrderButton::Label)
    }
}
