use super::{
    Cli,
    commands::{Command, ConfigCommand},
};
use crate::{
    MonitorError, Result,
    chrome::ChromeDriver,
    config::{self, Config},
    monitor::Monitor,
    notify::NotifierSet,
    output::{self, OutputFormatter, text},
    utils,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub path: PathBuf,
    pub exists: bool,
}

impl OutputFormatter for ConfigInfo {
    fn format_text(&self) -> String {
        format!(
            "{}\n{}",
            text::key_value("Config Path", &self.path.display().to_string()),
            text::key_value("Exists", &self.exists.to_string())
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub struct ConfigShowResult {
    pub config: Config,
}

impl OutputFormatter for ConfigShowResult {
    fn format_text(&self) -> String {
        self.config.show_masked()
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(&self.config.redacted(), pretty)
    }
}

pub async fn dispatch(mut cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command.take().unwrap_or(Command::Run) {
        Command::Run => handle_run(&cli, config).await,
        Command::NotifyTest { message, image } => {
            handle_notify_test(&message, image.as_deref(), &cli, &config).await
        }
        Command::Config { subcommand } => handle_config_command(subcommand, &cli, &config),
    }
}

async fn handle_run(cli: &Cli, config: Arc<Config>) -> Result<()> {
    config.validate()?;

    let notifiers = NotifierSet::from_config(&config.notify)?;
    let monitor = Monitor::new(config.clone(), notifiers);
    let driver = ChromeDriver::launch(&config).await?;

    let outcome = utils::until_interrupted(monitor.run(&driver))
        .await
        .and_then(|result| result);

    match &outcome {
        Err(MonitorError::Interrupted) => {
            tracing::warn!("interrupted, releasing the browser");
        }
        _ if config.browser.hold_open => {
            let prompt = utils::wait_for_enter("Press Enter to close the browser...");
            match utils::until_interrupted(prompt).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "could not read from stdin"),
                Err(_) => tracing::warn!("interrupted, releasing the browser"),
            }
        }
        _ => {}
    }

    // A second interrupt while closing drops the driver, which kills Chrome.
    utils::until_interrupted(driver.close()).await??;

    let summary = outcome?;
    output::print_output(&summary, cli.json)
}

async fn handle_notify_test(
    message: &str,
    image: Option<&Path>,
    cli: &Cli,
    config: &Config,
) -> Result<()> {
    let report = NotifierSet::from_config(&config.notify)?
        .send_text(message, image)
        .await;
    output::print_output(&report, cli.json)?;

    if report.delivered() == 0 {
        return Err(MonitorError::Notification {
            channel: "all",
            reason: "no channel accepted the message".into(),
        });
    }
    Ok(())
}

fn handle_config_command(subcommand: ConfigCommand, cli: &Cli, config: &Config) -> Result<()> {
    match subcommand {
        ConfigCommand::Init => {
            let result = handle_config_init()?;
            output::print_output(&result, cli.json)
        }
        ConfigCommand::Show => {
            let result = ConfigShowResult {
                config: config.clone(),
            };
            output::print_output(&result, cli.json)
        }
        ConfigCommand::Path => {
            let path = match cli.config {
                Some(ref path) => path.clone(),
                None => config::default_config_path()?,
            };
            let result = ConfigInfo {
                exists: path.exists(),
                path,
            };
            output::print_output(&result, cli.json)
        }
    }
}

fn handle_config_init() -> Result<ConfigInfo> {
    let config_path = config::default_config_path()?;
    let config_dir = config::default_config_dir()?;

    std::fs::create_dir_all(&config_dir)?;

    if config_path.exists() {
        return Err(MonitorError::ConfigError(format!(
            "Config file already exists at {}",
            config_path.display()
        )));
    }

    let toml_content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(&config_path, toml_content)?;

    Ok(ConfigInfo {
        path: config_path,
        exists: true,
    })
}
