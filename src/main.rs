// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, load the credential, run the
//   pipeline and print the listing.
// - All errors come back here; this is the only place that picks an exit
//   status.

use anyhow::Context;
use florence_cli::config::Config;
use florence_cli::pipeline::{self, Invocation};
use florence_cli::{ui, FlorenceError};
use std::process;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = init_logging() {
        eprintln!("Warning: {err:#}");
    }

    if let Err(err) = try_main() {
        report(&err);
        process::exit(1);
    }
}

fn try_main() -> Result<(), FlorenceError> {
    let invocation = Invocation::from_args(std::env::args().skip(1))?;
    let config = Config::from_env()?;
    let report = pipeline::run(&config, &invocation)?;
    println!("{}", ui::format_listing(&report));
    Ok(())
}

fn report(err: &FlorenceError) {
    match err {
        FlorenceError::Usage { .. } => println!("{}", ui::usage()),
        err if err.is_user_input() => println!("{err}"),
        err => eprintln!("Error: {err}"),
    }
}

/// Logs go to stderr, `warn` and above unless `RUST_LOG` says otherwise.
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()
        .context("invalid RUST_LOG")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))
}
