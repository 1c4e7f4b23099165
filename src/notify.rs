//! Outbound notifications for a stock event.
//!
//! Delivery is a side channel: failures are logged and reported, never
//! propagated into the monitoring flow.

use crate::{
    MonitorError, Result,
    config::NotifyConfig,
    event::StockEvent,
    output::{self, OutputFormatter, text},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    /// Delivers `text`, with `image` attached when the channel supports it.
    async fn send(&self, text: &str, image: Option<&Path>) -> Result<()>;
}

fn http_client(config: &NotifyConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

async fn expect_ok(channel: &'static str, response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(MonitorError::Notification {
        channel,
        reason: format!("HTTP {}: {}", status.as_u16(), body),
    })
}

/// Messaging API broadcast to every follower of the channel.
pub struct BroadcastNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl BroadcastNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: config.broadcast_endpoint.clone(),
            token: config.broadcast_token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    fn channel(&self) -> &'static str {
        "broadcast"
    }

    async fn send(&self, text: &str, _image: Option<&Path>) -> Result<()> {
        let token = self.token.as_deref().ok_or_else(|| MonitorError::Notification {
            channel: self.channel(),
            reason: "channel access token is not configured".into(),
        })?;

        let payload = json!({
            "messages": [{ "type": "text", "text": text }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        expect_ok(self.channel(), response).await
    }
}

/// Token-based notify API; attaches an image as multipart when one exists.
pub struct TokenNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl TokenNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: config.notify_endpoint.clone(),
            token: config.notify_token.clone(),
        })
    }

    async fn image_part(path: &Path) -> Result<Part> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".into());
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("jpg" | "jpeg") => "image/jpeg",
            _ => "image/png",
        };
        Ok(Part::bytes(bytes).file_name(file_name).mime_str(mime)?)
    }
}

#[async_trait]
impl Notifier for TokenNotifier {
    fn channel(&self) -> &'static str {
        "notify"
    }

    async fn send(&self, text: &str, image: Option<&Path>) -> Result<()> {
        let token = self.token.as_deref().ok_or_else(|| MonitorError::Notification {
            channel: self.channel(),
            reason: "notify token is not configured".into(),
        })?;

        let attachment = match image {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => Some(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "image not found, sending text only");
                None
            }
            None => None,
        };

        let request = self.client.post(&self.endpoint).bearer_auth(token);
        let request = match attachment {
            Some(path) => {
                let form = Form::new()
                    .text("message", text.to_string())
                    .part("imageFile", Self::image_part(path).await?);
                request.multipart(form)
            }
            None => request.form(&[("message", text)]),
        };

        let response = request.send().await?;
        expect_ok(self.channel(), response).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub channel: &'static str,
    pub delivered: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.deliveries.iter().filter(|d| d.delivered).count()
    }

    pub fn all_delivered(&self) -> bool {
        self.deliveries.iter().all(|d| d.delivered)
    }
}

impl OutputFormatter for DispatchReport {
    fn format_text(&self) -> String {
        self.deliveries
            .iter()
            .map(|d| match d.error {
                None => text::success(&format!("{} notification delivered", d.channel)),
                Some(ref e) => text::warning(&format!("{} notification failed: {}", d.channel, e)),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Fans one message out to every configured channel, once each.
#[derive(Default)]
pub struct NotifierSet {
    sinks: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        Ok(Self::new()
            .with(BroadcastNotifier::new(config)?)
            .with(TokenNotifier::new(config)?))
    }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.sinks.push(Box::new(notifier));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn notify(&self, event: &StockEvent, image: Option<&Path>) -> DispatchReport {
        self.send_text(&event.message(), image).await
    }

    pub async fn send_text(&self, text: &str, image: Option<&Path>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in &self.sinks {
            let delivery = match sink.send(text, image).await {
                Ok(()) => {
                    tracing::info!(channel = sink.channel(), "notification sent");
                    Delivery {
                        channel: sink.channel(),
                        delivered: true,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(channel = sink.channel(), error = %e, "notification failed");
                    Delivery {
                        channel: sink.channel(),
                        delivered: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.deliveries.push(delivery);
        }

        report
    }
}
