pub mod commands;
pub mod dispatch;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "restock-watch")]
#[command(version, about = "Watch a store page for restocks and check out automatically")]
#[command(
    long_about = "Signs in to the store, polls the watched page until a purchasable item appears, \
notifies the configured LINE channels, then selects every available item and places the order"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Run Chrome in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Product page to watch instead of the cart")]
    pub target_url: Option<String>,

    #[arg(long, global = true, help = "Per-step wait timeout in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[arg(long, global = true, help = "Keep the browser open until Enter is pressed")]
    pub hold: bool,

    #[arg(long, global = true, help = "Capture a screenshot when stock is found")]
    pub screenshot: Option<bool>,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            dotenvy::dotenv().ok();
            let mut config = crate::config::Config::from_file(path)?;
            config.load_from_env();
            config
        }
        None => crate::config::Config::load()?,
    };

    let overrides = crate::config::ConfigOverrides {
        headless: cli.headless,
        target_url: cli.target_url.clone(),
        chrome_path: cli.chrome_path.clone(),
        timeout_ms: cli.timeout_ms,
        hold_open: cli.hold.then_some(true),
        capture_screenshot: cli.screenshot,
    };

    let config = Arc::new(config.load_with_overrides(overrides));
    dispatch::dispatch(cli, config).await
}
