//! The browser capability the monitoring flow is written against.
//!
//! [`crate::chrome::ChromeDriver`] implements it over the DevTools protocol;
//! tests implement it with scripted page states.

use crate::{MonitorError, Result, candidate::NodeTraits, selectors::Locator, timeouts::ms};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// How a click was finally delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickTier {
    /// Simulated pointer click with normal hit-testing.
    Normal,
    /// Script-level `element.click()`, ignoring overlays.
    Forced,
}

#[async_trait]
pub trait Driver: Send + Sync {
    /// Handle to a node of the current render; stale after the page mutates.
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// All matches in document order.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Invokes the element's click handler directly, bypassing hit-testing.
    async fn force_click(&self, element: &Self::Element) -> Result<()>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<()>;

    async fn clear(&self, element: &Self::Element) -> Result<()>;

    async fn describe(&self, element: &Self::Element) -> Result<NodeTraits>;

    /// Text of the first `locator` match found in a following sibling of the
    /// element or of one of its ancestors.
    async fn nearby_text(&self, element: &Self::Element, locator: &Locator)
    -> Result<Option<String>>;

    async fn reload(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn find_one(&self, locator: &Locator) -> Result<Option<Self::Element>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    /// Like [`Driver::find_one`], but absence is an error.
    async fn locate(&self, locator: &Locator) -> Result<Self::Element> {
        self.find_one(locator)
            .await?
            .ok_or_else(|| MonitorError::ElementNotFound {
                selector: locator.to_string(),
            })
    }

    /// Polls until `locator` matches. Lookup errors count as "not yet".
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Self::Element> {
        let start = tokio::time::Instant::now();

        loop {
            match self.find_one(locator).await {
                Ok(Some(element)) => return Ok(element),
                Ok(None) => {}
                Err(e) => tracing::trace!(%locator, error = %e, "lookup failed while waiting"),
            }

            if start.elapsed() >= timeout {
                return Err(MonitorError::Timeout {
                    what: locator.to_string(),
                    ms: timeout.as_millis() as u64,
                });
            }

            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn wait_until_absent(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let start = tokio::time::Instant::now();

        loop {
            if let Ok(None) = self.find_one(locator).await {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(MonitorError::Timeout {
                    what: format!("{} to disappear", locator),
                    ms: timeout.as_millis() as u64,
                });
            }

            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn wait_for_url(&self, marker: &str, timeout: Duration) -> Result<String> {
        let start = tokio::time::Instant::now();

        loop {
            if let Ok(url) = self.current_url().await
                && url.contains(marker)
            {
                return Ok(url);
            }

            if start.elapsed() >= timeout {
                return Err(MonitorError::Timeout {
                    what: format!("URL containing '{}'", marker),
                    ms: timeout.as_millis() as u64,
                });
            }

            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    /// Pointer click first; a failed pointer click is retried once as a
    /// forced click.
    async fn click_with_escalation(&self, element: &Self::Element) -> Result<ClickTier> {
        match self.click(element).await {
            Ok(()) => Ok(ClickTier::Normal),
            Err(e) => {
                tracing::debug!(error = %e, "pointer click failed, forcing click");
                self.force_click(element).await?;
                Ok(ClickTier::Forced)
            }
        }
    }
}
