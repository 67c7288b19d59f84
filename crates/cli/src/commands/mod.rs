//! CLI command definitions and execution
//!
//! This module contains all CLI commands and the helpers they share for
//! loading configuration, building the storage service and reporting errors.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use stash_core::{Config, ConfigManager, Environment, Error, KeyResolver, StorageService};
use stash_s3::S3Gateway;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod config;
mod get;
mod ls;
mod mb;
mod put;
mod resolve;
mod rm;
mod sanitize;

/// stash - multi-tenant storage naming
///
/// Resolves tenant files to S3 buckets and keys, and moves them in and out of
/// S3-compatible object storage.
#[derive(Parser, Debug)]
#[command(name = "stash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable spinners
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show where a file would be stored
    Resolve(resolve::ResolveArgs),

    /// Sanitize or validate a path, directory or file name
    Sanitize(sanitize::SanitizeArgs),

    /// Create the bucket for a tenant
    Mb(mb::MbArgs),

    /// Upload a local file for a tenant
    Put(put::PutArgs),

    /// Download a tenant's file
    Get(get::GetArgs),

    /// List a tenant's files
    Ls(ls::LsArgs),

    /// Delete a tenant's file
    Rm(rm::RmArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Tenant selection shared by storage commands
#[derive(Args, Debug, Clone)]
pub struct TenantArgs {
    /// Client (tenant) identifier
    #[arg(short, long, env = "STASH_CLIENT")]
    pub client: String,

    /// Environment: dev, staging, prod, test or uat
    #[arg(short, long = "env", env = "STASH_ENV")]
    pub environment: Environment,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Resolve(args) => resolve::execute(args, output_config),
        Commands::Sanitize(args) => sanitize::execute(args, output_config),
        Commands::Mb(args) => mb::execute(args, output_config).await,
        Commands::Put(args) => put::execute(args, output_config).await,
        Commands::Get(args) => get::execute(args, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Config(cmd) => config::execute(cmd, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Print an error with context and map it to an exit code
pub(crate) fn report(formatter: &Formatter, context: &str, err: &Error) -> ExitCode {
    formatter.error(&format!("{context}: {err}"));
    ExitCode::from(err)
}

/// Load the configuration file, or defaults when none exists
pub(crate) fn load_config(formatter: &Formatter) -> Result<Config, ExitCode> {
    let manager =
        ConfigManager::new().map_err(|e| report(formatter, "Failed to load configuration", &e))?;
    tracing::debug!(path = %manager.config_path().display(), "Loading configuration");
    manager
        .load()
        .map_err(|e| report(formatter, "Failed to load configuration", &e))
}

/// Build the key resolver from configuration
pub(crate) fn build_resolver(
    formatter: &Formatter,
    config: &Config,
) -> Result<KeyResolver, ExitCode> {
    config
        .resolver_config()
        .and_then(KeyResolver::new)
        .map_err(|e| report(formatter, "Invalid naming configuration", &e))
}

/// Load configuration and connect the storage service
pub(crate) async fn connect(formatter: &Formatter) -> Result<StorageService, ExitCode> {
    let config = load_config(formatter)?;
    let resolver = build_resolver(formatter, &config)?;

    let gateway = S3Gateway::new(&config.storage)
        .await
        .map_err(|e| report(formatter, "Failed to create S3 client", &e))?;

    Ok(StorageService::new(
        Arc::new(gateway),
        resolver,
        config.service_options(),
    ))
}
