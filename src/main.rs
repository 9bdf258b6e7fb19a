use clap::Parser;
use portfolio_analyzer::cli::{Cli, run};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portfolio_analyzer=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
