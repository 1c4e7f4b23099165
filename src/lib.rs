pub mod candidate;
pub mod checkout;
pub mod chrome;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod js_templates;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod poller;
pub mod search;
pub mod selectors;
pub mod session;
pub mod step;
pub mod timeouts;
pub mod utils;

pub use config::Config;
pub use driver::Driver;
pub use error::{AuthFailure, MonitorError};
pub use monitor::{Monitor, RunSummary};

pub type Result<T> = std::result::Result<T, MonitorError>;
