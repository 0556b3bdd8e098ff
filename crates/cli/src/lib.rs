mod cli_args;

pub use cli_args::{CliArgs, DependencyOptions};

use clap::Parser;
use pnbundle_diagnostics::enable_tracing_by_env;

/// Parse the command line and run the bundler.
pub async fn run_cli() -> miette::Result<()> {
    enable_tracing_by_env();
    CliArgs::parse().run().await
}
