use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Sign in, wait for stock, notify and check out (default)")]
    Run,

    #[command(about = "Send a test message through every notification channel")]
    NotifyTest {
        #[arg(default_value = "restock-watch test notification", help = "Message text")]
        message: String,
        #[arg(long, help = "Image to attach where the channel supports it")]
        image: Option<PathBuf>,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    #[command(about = "Initialize config file with defaults")]
    Init,

    #[command(about = "Show current configuration with secrets masked")]
    Show,

    #[command(about = "Show config file path")]
    Path,
}
