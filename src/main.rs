use anyhow::Result;
use clap::Parser;
use defgrep::cli::Cli;
use defgrep::core::Outcome;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "DEFGREP_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = cli.context();

    init_tracing(ctx.verbose);

    match defgrep::symbols_run(cli, &ctx)? {
        Outcome::MatchesFound => std::process::exit(1),
        Outcome::Done | Outcome::HelpShown => Ok(()),
    }
}

/// Logs go to stderr; stdout carries results only.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
