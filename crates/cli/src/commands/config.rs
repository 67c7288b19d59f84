//! config command - Manage the configuration file
//!
//! `init` writes a default configuration, `show` prints the effective one
//! with credentials masked.

use clap::{Args, Subcommand};
use serde::Serialize;
use stash_core::{Config, ConfigManager, StorageConfig};

use super::{load_config, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Placeholder printed instead of secrets
const MASK: &str = "********";

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init(InitArgs),

    /// Show the effective configuration
    Show,
}

/// Arguments for `config init`
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ConfigOutput {
    path: String,
    exists: bool,
    config: Config,
}

/// Execute a config subcommand
pub fn execute(cmd: ConfigCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ConfigManager::new() {
        Ok(manager) => manager,
        Err(e) => return report(&formatter, "Failed to locate configuration", &e),
    };

    match cmd {
        ConfigCommands::Init(args) => init(&manager, &args, &formatter),
        ConfigCommands::Show => show(&manager, &formatter),
    }
}

fn init(manager: &ConfigManager, args: &InitArgs, formatter: &Formatter) -> ExitCode {
    let path = manager.config_path().display().to_string();

    if manager.config_path().exists() && !args.force {
        formatter.error(&format!(
            "Configuration already exists at {path}; use --force to overwrite"
        ));
        return ExitCode::Conflict;
    }

    if let Err(e) = manager.save(&Config::default()) {
        return report(formatter, "Failed to write configuration", &e);
    }

    if formatter.is_json() {
        formatter.json(&serde_json::json!({ "status": "success", "path": path }));
    } else {
        formatter.success(&format!("Wrote default configuration to {path}"));
    }
    ExitCode::Success
}

fn show(manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    let mut config = match load_config(formatter) {
        Ok(config) => config,
        Err(code) => return code,
    };
    mask_secrets(&mut config.storage);

    let output = ConfigOutput {
        path: manager.config_path().display().to_string(),
        exists: manager.config_path().exists(),
        config,
    };

    if formatter.is_json() {
        formatter.json(&output);
        return ExitCode::Success;
    }

    let source = if output.exists { "" } else { " (not found, using defaults)" };
    formatter.println(&format!("Config file: {}{source}", output.path));
    formatter.table(&["Setting", "Value"], storage_rows(&output.config.storage));
    ExitCode::Success
}

fn mask_secrets(storage: &mut StorageConfig) {
    if storage.secret_key.is_some() {
        storage.secret_key = Some(MASK.to_string());
    }
}

fn storage_rows(storage: &StorageConfig) -> Vec<Vec<String>> {
    let unset = || "-".to_string();
    let retry = storage.retry.clone().unwrap_or_default();
    let timeout = storage.timeout.clone().unwrap_or_default();
    let max_size = match storage.max_file_size_bytes() {
        Some(bytes) => humansize::format_size(bytes, humansize::BINARY),
        None => "unlimited".to_string(),
    };

    [
        ("endpoint", storage.endpoint.clone().unwrap_or_else(unset)),
        ("region", storage.region.clone()),
        ("access_key", storage.access_key.clone().unwrap_or_else(unset)),
        ("secret_key", storage.secret_key.clone().unwrap_or_else(unset)),
        ("path_style", storage.path_style.to_string()),
        ("bucket_strategy", storage.bucket_strategy.clone()),
        ("shared_bucket", storage.shared_bucket.clone()),
        ("bucket_suffix", storage.bucket_suffix.clone()),
        ("duplicate_file_strategy", storage.duplicate_file_strategy.clone()),
        ("auto_create_buckets", storage.auto_create_buckets.to_string()),
        ("max_file_size", max_size),
        ("retry.max_attempts", retry.max_attempts.to_string()),
        ("timeout.connect_ms", timeout.connect_ms.to_string()),
        ("timeout.read_ms", timeout.read_ms.to_string()),
    ]
    .into_iter()
    .map(|(name, value)| vec![name.to_string(), value])
    .collect()
}
