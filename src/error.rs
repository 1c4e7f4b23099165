use thiserror::Error;

/// Reasons the login sequence can fail.
#[derive(Error, Debug)]
pub enum AuthFailure {
    #[error("timed out during '{step}'")]
    Timeout { step: &'static str },

    #[error("login was submitted but the signed-in state never appeared")]
    LoginNotConfirmed,

    #[error("login page is missing '{step}', page layout is not supported")]
    IncompatiblePage { step: &'static str },

    #[error("browser error during '{step}': {reason}")]
    Driver { step: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("Login failed: {0}")]
    Auth(#[from] AuthFailure),

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: &'static str,
        #[source]
        source: Box<MonitorError>,
    },

    #[error("Checkout aborted at {step}: {reason}")]
    CheckoutAborted { step: String, reason: String },

    #[error("Notification failed ({channel}): {reason}")]
    Notification {
        channel: &'static str,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Interrupted by operator")]
    Interrupted,

    #[error("General error: {0}")]
    General(String),
}

impl MonitorError {
    /// The innermost error beneath any step wrappers.
    pub fn root(&self) -> &MonitorError {
        match self {
            Self::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.root(),
            Self::Timeout { .. } | Self::Auth(AuthFailure::Timeout { .. })
        )
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self.root() {
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Check if another Chrome instance is using the debugging port".into(),
                "Set browser.chrome_path in the config file".into(),
            ],
            Self::Auth(AuthFailure::LoginNotConfirmed) => vec![
                "Verify EMAIL_ADDRESS and PASSWORD".into(),
                "Run with --headless false to watch the login".into(),
            ],
            Self::Auth(AuthFailure::IncompatiblePage { .. }) => vec![
                "The login page layout changed; update [selectors] in the config".into(),
            ],
            Self::Auth(_) | Self::Timeout { .. } => vec![
                "Increase monitor.timeout_ms".into(),
                "Check network connectivity".into(),
            ],
            Self::ElementNotFound { selector } => vec![
                format!("Check if '{}' still exists on the page", selector),
                "Update [selectors] in the config".into(),
            ],
            Self::CheckoutAborted { .. } => vec![
                "Finish the order manually in the open browser".into(),
                "Run with hold_open = true to keep the browser after a failure".into(),
            ],
            Self::Notification { .. } => vec![
                "Verify LINE_CHANNEL_ACCESS_TOKEN and LINE_NOTIFY_TOKEN".into(),
                "Run the notify-test command to check delivery".into(),
            ],
            Self::ConfigError(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => vec![
                "Check configuration file syntax".into(),
                "Run `restock-watch config show` to inspect the resolved values".into(),
            ],
            Self::InvalidUrl(_) => vec![
                "Ensure URL includes protocol (http:// or https://)".into(),
            ],
            _ => vec!["Run with --verbose for more details".into()],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.root() {
            Self::LaunchFailed(_) | Self::Connection(_) => 3,
            Self::Timeout { .. } => 4,
            Self::ElementNotFound { .. } => 5,
            Self::Auth(_) => 6,
            Self::CheckoutAborted { .. } => 8,
            Self::ConfigError(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => 7,
            Self::InvalidUrl(_) => 2,
            Self::Interrupted => 130,
            _ => 1,
        }
    }
}
