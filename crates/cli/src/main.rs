//! stash - multi-tenant storage naming for S3-compatible object storage
//!
//! Resolves tenant files to buckets and keys and moves them in and out of
//! storage. Logs go to stderr so JSON output on stdout stays parseable.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use stash_cli::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
