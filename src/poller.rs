use crate::{
    MonitorError, Result,
    candidate::{Availability, CandidatePolicy, ClassMarkerPolicy, ProductCandidate},
    config::Config,
    driver::Driver,
    event::StockEvent,
    session::AuthenticatedSession,
};
use chrono::Local;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The first poll that found something to buy.
#[derive(Debug)]
pub struct Detection<E> {
    pub event: StockEvent,
    /// Available candidates in document order.
    pub candidates: Vec<ProductCandidate<E>>,
    pub cycles: u64,
}

pub struct StockPoller<P = ClassMarkerPolicy> {
    config: Arc<Config>,
    policy: P,
    fired: AtomicBool,
}

impl StockPoller<ClassMarkerPolicy> {
    pub fn new(config: Arc<Config>) -> Self {
        let policy = ClassMarkerPolicy::from_selectors(&config.selectors);
        Self::with_policy(config, policy)
    }
}

impl<P: CandidatePolicy> StockPoller<P> {
    pub fn with_policy(config: Arc<Config>, policy: P) -> Self {
        Self {
            config,
            policy,
            fired: AtomicBool::new(false),
        }
    }

    /// Polls until at least one candidate is selectable.
    ///
    /// Never returns on an empty listing: the page is reloaded after a short
    /// randomized pause and inspected again. Only browser errors that repeat
    /// more than `max_retries` times in a row end the wait early.
    pub async fn poll_until_available<D: Driver>(
        &self,
        driver: &D,
        _session: &AuthenticatedSession,
    ) -> Result<Detection<D::Element>> {
        if self.fired.load(Ordering::SeqCst) {
            return Err(MonitorError::General(
                "stock was already detected for this run".into(),
            ));
        }

        let max_retries = self.config.monitor.max_retries;
        let mut consecutive_errors = 0u32;
        let mut cycle = 0u64;

        loop {
            cycle += 1;

            let scanned = match self.scan(driver).await {
                Ok(listing) => {
                    let total = listing.len();
                    let available: Vec<_> =
                        listing.into_iter().filter(|c| c.is_available()).collect();

                    if !available.is_empty() {
                        self.fired.store(true, Ordering::SeqCst);
                        return Ok(self.detect(driver, available, cycle).await);
                    }

                    tracing::debug!(cycle, listed = total, "nothing purchasable yet");
                    true
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors > max_retries {
                        return Err(e);
                    }
                    tracing::warn!(cycle, attempt = consecutive_errors, error = %e, "poll failed, retrying");
                    false
                }
            };

            tokio::time::sleep(self.pause()).await;

            match driver.reload().await {
                Ok(()) if scanned => consecutive_errors = 0,
                Ok(()) => {}
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors > max_retries {
                        return Err(e);
                    }
                    tracing::warn!(cycle, attempt = consecutive_errors, error = %e, "reload failed, retrying");
                }
            }
        }
    }

    /// Current listing of product checkboxes, disabled ones included.
    pub async fn scan<D: Driver>(&self, driver: &D) -> Result<Vec<ProductCandidate<D::Element>>> {
        let selectors = &self.config.selectors;

        if let Err(e) = driver
            .wait_for(&selectors.available_candidate, self.config.monitor.timeout())
            .await
        {
            if !e.is_timeout() {
                return Err(e);
            }
            tracing::trace!("no enabled checkbox rendered before timeout");
        }

        let mut listing = Vec::new();
        for element in driver.find_all(&selectors.candidates).await? {
            let node = match driver.describe(&element).await {
                Ok(node) => node,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping node that vanished mid-scan");
                    continue;
                }
            };

            if let Some(availability) = self.policy.classify(&node) {
                listing.push(ProductCandidate {
                    name: None,
                    availability,
                    element,
                });
            }
        }

        Ok(listing)
    }

    async fn detect<D: Driver>(
        &self,
        driver: &D,
        mut candidates: Vec<ProductCandidate<D::Element>>,
        cycles: u64,
    ) -> Detection<D::Element> {
        let mut names = Vec::new();

        for candidate in &mut candidates {
            debug_assert_eq!(candidate.availability, Availability::Available);
            match driver
                .nearby_text(&candidate.element, &self.config.selectors.product_name)
                .await
            {
                Ok(Some(name)) => {
                    names.push(name.clone());
                    candidate.name = Some(name);
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "product name unavailable"),
            }
        }

        let event = StockEvent::new(candidates.len(), names, Local::now());
        tracing::info!(
            count = event.candidate_count(),
            names = ?event.names(),
            cycles,
            "stock detected"
        );

        Detection {
            event,
            candidates,
            cycles,
        }
    }

    fn pause(&self) -> Duration {
        let monitor = &self.config.monitor;
        let (low, high) = monitor.jitter_range();
        let jitter = rand::thread_rng().gen_range(low..=high);
        monitor.poll_interval() + Duration::from_millis(jitter)
    }
}
