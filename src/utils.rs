use crate::{MonitorError, Result};
use std::path::PathBuf;

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
];

#[cfg(target_os = "linux")]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[];

#[cfg(windows)]
const PATH_BINARIES: &[&str] = &["chrome.exe", "chromium.exe"];

#[cfg(not(windows))]
const PATH_BINARIES: &[&str] = &["google-chrome", "chromium", "chromium-browser", "chrome"];

/// Well-known install locations first, then `PATH`.
pub fn find_chrome_executable() -> Result<PathBuf> {
    INSTALL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            PATH_BINARIES
                .iter()
                .find_map(|binary| which::which(binary).ok())
        })
        .ok_or_else(|| {
            MonitorError::LaunchFailed(
                "Could not find Chrome/Chromium executable. Set browser.chrome_path or pass --chrome-path"
                    .into(),
            )
        })
}

/// Resolves when the operator interrupts the process.
///
/// If the signal handlers cannot be installed this never resolves, so the
/// work it races against still runs to completion.
pub async fn interrupted() {
    if let Err(e) = wait_for_signal().await {
        tracing::warn!(error = %e, "could not install signal handlers, Ctrl-C is disabled");
        std::future::pending::<()>().await;
    }
}

async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C, shutting down...");
    }

    Ok(())
}

/// Runs `work` unless the operator interrupts first.
///
/// Once a signal handler is installed the default Ctrl-C behavior is gone
/// for the rest of the process, so every wait after the first one that
/// listens must go through here too.
pub async fn until_interrupted<T>(work: impl Future<Output = T>) -> Result<T> {
    tokio::select! {
        value = work => Ok(value),
        () = interrupted() => Err(MonitorError::Interrupted),
    }
}

/// Blocks until the operator presses Enter.
pub async fn wait_for_enter(prompt: &str) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    eprintln!("{}", prompt);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}
