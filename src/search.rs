use crate::{
    config::Config,
    driver::Driver,
    step::{StepLog, StepRecord},
    timeouts::ms,
};
use std::sync::Arc;
use std::time::Duration;

/// Best-effort product search run once checkout has been submitted.
/// Nothing here can fail the run.
pub struct PostCheckoutSearch {
    config: Arc<Config>,
}

impl PostCheckoutSearch {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub async fn run<D: Driver>(&self, driver: &D) -> Vec<StepRecord> {
        let selectors = &self.config.selectors;
        let query = &self.config.search.query;
        let mut steps = StepLog::new();

        if !self.config.search.enabled {
            return steps.into_records();
        }

        steps
            .tolerate("open search", async {
                let entry = driver.locate(&selectors.search_entry).await?;
                driver.click(&entry).await
            })
            .await;
        tokio::time::sleep(Duration::from_millis(ms::PAGE_SETTLE)).await;

        let typed = steps
            .tolerate("enter search query", async {
                let input = driver
                    .wait_for(&selectors.search_input, self.config.monitor.timeout())
                    .await?;
                driver.clear(&input).await?;
                driver.type_text(&input, query).await
            })
            .await;

        if typed.is_some() {
            tokio::time::sleep(Duration::from_millis(ms::PAGE_SETTLE)).await;
            steps
                .tolerate("submit search", async {
                    let icon = driver.locate(&selectors.search_icon).await?;
                    driver.click(&icon).await
                })
                .await;
        }

        tracing::info!(query = %query, submitted = typed.is_some(), "post-checkout search finished");
        steps.into_records()
    }
}
