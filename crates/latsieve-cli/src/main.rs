use clap::Parser;
use latsieve_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Per-run log file when there is one, stderr only otherwise.
    match cli.log_file() {
        Some(path) => {
            if let Err(err) = logging::init_logging(cli.verbose, &path) {
                logging::init_logging_stderr(cli.verbose);
                tracing::warn!("could not open log file {}: {:#}", path.display(), err);
            }
        }
        None => logging::init_logging_stderr(cli.verbose),
    }
    tracing::debug!(
        "latsieve version {}, command line: {}",
        env!("CARGO_PKG_VERSION"),
        std::env::args().collect::<Vec<_>>().join(" ")
    );

    if let Err(err) = cli.run().await {
        tracing::debug!("run failed: {:#}", err);
        eprintln!("latsieve error: {:#}", err);
        std::process::exit(1);
    }
}
