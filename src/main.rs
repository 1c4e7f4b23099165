use restock_watch::output::text;
use std::process;

#[tokio::main]
async fn main() {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    init_logging(verbose);

    if let Err(e) = restock_watch::cli::run().await {
        eprintln!("{}", text::error(&e.to_string()));
        for suggestion in e.suggestions() {
            eprintln!("{}", text::bullet(&suggestion));
        }
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Progress of a run is logged at info, so keep it visible by default.
    let filter = if verbose {
        EnvFilter::new("restock_watch=debug,chromiumoxide=info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("restock_watch=info,chromiumoxide=off"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
