use crate::{
    MonitorError, Result,
    candidate::NodeTraits,
    config::Config,
    driver::Driver,
    js_templates,
    selectors::Locator,
    timeouts::secs,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::ReloadParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Ancestor levels searched when looking for a product name next to a checkbox.
const NAME_SEARCH_DEPTH: u32 = 4;

/// One Chrome instance with a single page, driven over the DevTools protocol.
pub struct ChromeDriver {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeDriver {
    pub async fn launch(config: &Config) -> Result<Self> {
        let chrome_path = config
            .browser
            .chrome_path
            .clone()
            .map(Ok)
            .unwrap_or_else(crate::utils::find_chrome_executable)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .port(config.browser.port)
            .request_timeout(Duration::from_secs(secs::REQUEST))
            .window_size(config.browser.window_width, config.browser.window_height)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");

        if !config.browser.headless {
            builder = builder.with_head();
        }

        if let Some(ref dir) = config.browser.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        let browser_config = builder.build().map_err(MonitorError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| MonitorError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| MonitorError::Connection(e.to_string()))?;

        tracing::info!(
            chrome = %chrome_path.display(),
            headless = config.browser.headless,
            "browser launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
        })
    }

    /// Closes the browser. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "browser did not close cleanly");
        }
        browser.wait().await.ok();
        self.handler.abort();

        tracing::info!("browser released");
        Ok(())
    }

    async fn call_on(&self, element: &Element, function: &str) -> Result<Option<serde_json::Value>> {
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(|e| MonitorError::EvaluationError(e.to_string()))?;

        if let Some(details) = returns.exception_details {
            return Err(MonitorError::EvaluationError(details.text));
        }

        Ok(returns.result.value)
    }
}

fn is_missing(e: &CdpError) -> bool {
    if matches!(e, CdpError::NotFound) {
        return true;
    }
    let message = e.to_string();
    message.contains("No node") || message.contains("Could not find node")
}

#[async_trait]
impl Driver for ChromeDriver {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(secs::REQUEST), self.page.goto(url))
            .await
            .map_err(|_| MonitorError::Timeout {
                what: format!("navigation to {}", url),
                ms: secs::REQUEST * 1000,
            })?
            .map_err(|e| MonitorError::General(format!("Navigation failed: {}", e)))?;

        tracing::debug!(url, "navigated");
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::XPath(expression) => self.page.find_xpaths(expression.as_str()).await,
        };

        match found {
            Ok(elements) => Ok(elements),
            Err(e) if is_missing(&e) => Ok(Vec::new()),
            Err(e) => Err(MonitorError::General(format!(
                "Lookup of {} failed: {}",
                locator, e
            ))),
        }
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element
            .click()
            .await
            .map_err(|e| MonitorError::General(format!("Click failed: {}", e)))?;
        Ok(())
    }

    async fn force_click(&self, element: &Element) -> Result<()> {
        self.call_on(element, js_templates::FORCE_CLICK).await?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        element
            .focus()
            .await
            .map_err(|e| MonitorError::General(format!("Focus failed: {}", e)))?;
        element
            .type_str(text)
            .await
            .map_err(|e| MonitorError::General(format!("Type failed: {}", e)))?;
        Ok(())
    }

    async fn clear(&self, element: &Element) -> Result<()> {
        self.call_on(element, js_templates::CLEAR_VALUE).await?;
        Ok(())
    }

    async fn describe(&self, element: &Element) -> Result<NodeTraits> {
        let value = self.call_on(element, js_templates::DESCRIBE_NODE).await?;
        let raw = value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| MonitorError::EvaluationError("node description was empty".into()))?;
        Ok(serde_json::from_str(raw)?)
    }

    async fn nearby_text(&self, element: &Element, locator: &Locator) -> Result<Option<String>> {
        let Locator::Css(css) = locator else {
            return Err(MonitorError::General(format!(
                "nearby text lookup needs a CSS locator, got {}",
                locator
            )));
        };

        let script = js_templates::nearby_text(css, NAME_SEARCH_DEPTH);
        let value = self.call_on(element, &script).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn reload(&self) -> Result<()> {
        self.page
            .execute(ReloadParams::builder().build())
            .await
            .map_err(|e| MonitorError::General(format!("Reload failed: {}", e)))?;

        tokio::time::timeout(
            Duration::from_secs(secs::REQUEST),
            self.page.wait_for_navigation(),
        )
        .await
        .map_err(|_| MonitorError::Timeout {
            what: "reload".into(),
            ms: secs::REQUEST * 1000,
        })?
        .map_err(|e| MonitorError::General(format!("Reload wait failed: {}", e)))?;

        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map(|url| url.unwrap_or_default())
            .map_err(|e| MonitorError::Connection(e.to_string()))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| MonitorError::General(format!("Screenshot failed: {}", e)))?;

        tokio::fs::write(path, bytes).await?;
        tracing::info!(path = %path.display(), "screenshot saved");
        Ok(())
    }
}
