use crate::{
    MonitorError, Result,
    selectors::{Locator, Selectors},
    timeouts::{ms, secs},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOGIN_URL: &str = "https://www.popmart.com/jp/user/login";
pub const DEFAULT_BROADCAST_ENDPOINT: &str = "https://api.line.me/v2/bot/message/broadcast";
pub const DEFAULT_NOTIFY_ENDPOINT: &str = "https://notify-api.line.me/api/notify";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Page holding the product checkboxes. When unset, the cart indicator
    /// shown after login is clicked instead.
    pub url: Option<String>,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: None,
            login_url: default_login_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user_data_dir: Option<PathBuf>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Keep the browser open until Enter is pressed once the run ends.
    #[serde(default)]
    pub hold_open: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            port: default_port(),
            user_data_dir: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            hold_open: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Base delay before each reload, added on top of the jitter.
    #[serde(default)]
    pub poll_interval_seconds: f64,
    #[serde(default = "default_jitter_min")]
    pub jitter_min_ms: u64,
    #[serde(default = "default_jitter_max")]
    pub jitter_max_ms: u64,
    /// Consecutive transient browser errors tolerated while polling.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Ceiling for every bounded wait.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_click_pacing")]
    pub click_pacing_ms: u64,
    #[serde(default = "default_confirm_retry_delay")]
    pub confirm_retry_delay_ms: u64,
    #[serde(default)]
    pub capture_screenshot: bool,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 0.0,
            jitter_min_ms: default_jitter_min(),
            jitter_max_ms: default_jitter_max(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            click_pacing_ms: default_click_pacing(),
            confirm_retry_delay_ms: default_confirm_retry_delay(),
            capture_screenshot: false,
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Negative, NaN or out-of-range values mean no base delay.
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_seconds).unwrap_or(Duration::ZERO)
    }

    /// Jitter bounds in milliseconds, low end first even if configured inverted.
    pub fn jitter_range(&self) -> (u64, u64) {
        let (a, b) = (self.jitter_min_ms, self.jitter_max_ms);
        (a.min(b), a.max(b))
    }

    pub fn click_pacing(&self) -> Duration {
        Duration::from_millis(self.click_pacing_ms)
    }

    pub fn confirm_retry_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    pub broadcast_token: Option<String>,
    #[serde(default = "default_broadcast_endpoint")]
    pub broadcast_endpoint: String,
    pub notify_token: Option<String>,
    #[serde(default = "default_notify_endpoint")]
    pub notify_endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            broadcast_token: None,
            broadcast_endpoint: default_broadcast_endpoint(),
            notify_token: None,
            notify_endpoint: default_notify_endpoint(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_enabled")]
    pub enabled: bool,
    #[serde(default = "default_search_query")]
    pub query: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: default_search_enabled(),
            query: default_search_query(),
        }
    }
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}
fn default_headless() -> bool {
    true
}
fn default_port() -> u16 {
    9222
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    800
}
fn default_jitter_min() -> u64 {
    ms::JITTER_MIN
}
fn default_jitter_max() -> u64 {
    ms::JITTER_MAX
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    ms::DEFAULT_WAIT
}
fn default_click_pacing() -> u64 {
    ms::CLICK_PACING
}
fn default_confirm_retry_delay() -> u64 {
    ms::CONFIRM_RETRY_DELAY
}
fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("screenshots")
}
fn default_broadcast_endpoint() -> String {
    DEFAULT_BROADCAST_ENDPOINT.to_string()
}
fn default_notify_endpoint() -> String {
    DEFAULT_NOTIFY_ENDPOINT.to_string()
}
fn default_request_timeout() -> u64 {
    secs::NOTIFY_REQUEST
}
fn default_search_enabled() -> bool {
    true
}
fn default_search_query() -> String {
    "Lil Peach Riot Sleepover シリーズ".to_string()
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|p| p.join("restock-watch"))
        .ok_or_else(|| MonitorError::ConfigError("Could not determine config directory".into()))
}

impl Config {
    /// Defaults, then the global file, then `./.restock-watch.toml`, then
    /// `.env` and the process environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            config = Self::from_file(&global_path)?;
        }

        let project_path = PathBuf::from(".restock-watch.toml");
        if project_path.exists() {
            let project_config = Self::from_file(&project_path)?;
            config = config.merge(project_config);
        }

        dotenvy::dotenv().ok();
        config.load_from_env();

        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(headless) = cli_overrides.headless {
            config.browser.headless = headless;
        }
        if let Some(url) = cli_overrides.target_url {
            config.target.url = Some(url);
        }
        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(timeout) = cli_overrides.timeout_ms {
            config.monitor.timeout_ms = timeout;
        }
        if let Some(hold) = cli_overrides.hold_open {
            config.browser.hold_open = hold;
        }
        if let Some(capture) = cli_overrides.capture_screenshot {
            config.monitor.capture_screenshot = capture;
        }

        config
    }

    fn merge(mut self, other: Config) -> Self {
        if other.target.url.is_some() {
            self.target.url = other.target.url;
        }
        if other.browser.chrome_path.is_some() {
            self.browser.chrome_path = other.browser.chrome_path;
        }
        if other.browser.user_data_dir.is_some() {
            self.browser.user_data_dir = other.browser.user_data_dir;
        }
        if !other.credentials.email.is_empty() {
            self.credentials.email = other.credentials.email;
        }
        if !other.credentials.password.is_empty() {
            self.credentials.password = other.credentials.password;
        }
        if other.notify.broadcast_token.is_some() {
            self.notify.broadcast_token = other.notify.broadcast_token;
        }
        if other.notify.notify_token.is_some() {
            self.notify.notify_token = other.notify.notify_token;
        }
        self.monitor = other.monitor;
        self.selectors = other.selectors;
        self.search = other.search;
        self
    }

    /// Applies the recognized environment variables over the current values.
    pub fn load_from_env(&mut self) {
        if let Ok(url) = std::env::var("TARGET_URL")
            && !url.is_empty()
        {
            self.target.url = Some(url);
        }
        if let Ok(email) = std::env::var("EMAIL_ADDRESS") {
            self.credentials.email = email;
        }
        if let Ok(password) = std::env::var("PASSWORD") {
            self.credentials.password = password;
        }
        if let Ok(token) = std::env::var("LINE_CHANNEL_ACCESS_TOKEN") {
            self.notify.broadcast_token = Some(token);
        }
        if let Ok(token) = std::env::var("LINE_NOTIFY_TOKEN") {
            self.notify.notify_token = Some(token);
        }
        if let Ok(headless) = std::env::var("RESTOCK_HEADLESS") {
            self.browser.headless = headless == "true" || headless == "1";
        }
        if let Ok(timeout) = std::env::var("RESTOCK_TIMEOUT_MS")
            && let Ok(timeout) = timeout.parse()
        {
            self.monitor.timeout_ms = timeout;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor.timeout_ms == 0 {
            return Err(MonitorError::ConfigError(
                "timeout_ms must be greater than 0".into(),
            ));
        }

        if self.monitor.jitter_min_ms > self.monitor.jitter_max_ms {
            return Err(MonitorError::ConfigError(format!(
                "jitter_min_ms ({}) exceeds jitter_max_ms ({})",
                self.monitor.jitter_min_ms, self.monitor.jitter_max_ms
            )));
        }

        if !self.monitor.poll_interval_seconds.is_finite()
            || self.monitor.poll_interval_seconds < 0.0
        {
            return Err(MonitorError::ConfigError(
                "poll_interval_seconds must be a non-negative number".into(),
            ));
        }

        if self.credentials.email.is_empty() || self.credentials.password.is_empty() {
            return Err(MonitorError::ConfigError(
                "credentials are missing: set EMAIL_ADDRESS and PASSWORD".into(),
            ));
        }

        if !matches!(self.selectors.product_name, Locator::Css(_)) {
            return Err(MonitorError::ConfigError(format!(
                "selectors.product_name must be a CSS locator, got {}",
                self.selectors.product_name
            )));
        }

        validate_url(&self.target.login_url)?;
        if let Some(ref url) = self.target.url {
            validate_url(url)?;
        }
        validate_url(&self.notify.broadcast_endpoint)?;
        validate_url(&self.notify.notify_endpoint)?;

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(MonitorError::ConfigError(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// A copy with every secret masked, safe to print or serialize.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.credentials.email = mask(&config.credentials.email);
        config.credentials.password = mask(&config.credentials.password);
        config.notify.broadcast_token = config.notify.broadcast_token.as_deref().map(mask);
        config.notify.notify_token = config.notify.notify_token.as_deref().map(mask);
        config
    }

    pub fn show_masked(&self) -> String {
        format!(
            r#"Target:
  URL: {}
  Login URL: {}

Browser:
  Chrome Path: {}
  Headless: {}
  Hold Open: {}

Monitor:
  Poll Interval: {}s (+{}-{}ms jitter)
  Max Retries: {}
  Timeout: {}ms
  Screenshots: {}

Credentials:
  Email: {}
  Password: {}

Notify:
  Broadcast Token: {}
  Notify Token: {}

Search:
  Enabled: {}
  Query: {}
"#,
            self.target.url.as_deref().unwrap_or("cart indicator"),
            self.target.login_url,
            self.browser
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.browser.headless,
            self.browser.hold_open,
            self.monitor.poll_interval_seconds,
            self.monitor.jitter_min_ms,
            self.monitor.jitter_max_ms,
            self.monitor.max_retries,
            self.monitor.timeout_ms,
            if self.monitor.capture_screenshot {
                self.monitor.screenshot_dir.display().to_string()
            } else {
                "off".into()
            },
            mask(&self.credentials.email),
            mask(&self.credentials.password),
            self.notify
                .broadcast_token
                .as_deref()
                .map(mask)
                .unwrap_or_else(|| "not set".into()),
            self.notify
                .notify_token
                .as_deref()
                .map(mask)
                .unwrap_or_else(|| "not set".into()),
            self.search.enabled,
            self.search.query,
        )
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| MonitorError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(MonitorError::InvalidUrl(format!(
            "{raw}: unsupported scheme '{other}'"
        ))),
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "not set".into();
    }
    let visible: String = secret.chars().take(2).collect();
    format!("{}****", visible)
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub target_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub hold_open: Option<bool>,
    pub capture_screenshot: Option<bool>,
}
