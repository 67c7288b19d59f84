//! put command - Upload a local file for a tenant
//!
//! The stored name is derived from the local file name (or `--name`) by the
//! configured duplicate-file strategy, so it may differ from the input.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use stash_core::{DuplicateFileStrategy, ObjectLocation, ResolveRequest};

use super::{TenantArgs, connect, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Upload a local file
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub source: PathBuf,

    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory inside the tenant namespace
    #[arg(short, long)]
    pub dir: Option<String>,

    /// File name to store under (defaults to the local file name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Duplicate-file strategy (overrides configuration)
    #[arg(short, long)]
    pub strategy: Option<DuplicateFileStrategy>,

    /// Version number for the "version" strategy
    #[arg(long)]
    pub version: Option<u32>,

    /// Content type (guessed from the file name when omitted)
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    source: String,
    location: ObjectLocation,
    original_name: String,
    strategy: DuplicateFileStrategy,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let source_display = args.source.display().to_string();

    let Some(file_name) = upload_name(&args) else {
        formatter.error(&format!("Cannot derive a file name from {source_display}; use --name"));
        return ExitCode::UsageError;
    };

    let data = match tokio::fs::read(&args.source).await {
        Ok(data) => data,
        Err(e) => {
            formatter.error(&format!("Failed to read {source_display}: {e}"));
            return ExitCode::GeneralError;
        }
    };

    let content_type = args
        .content_type
        .clone()
        .or_else(|| guess_content_type(Path::new(&file_name)));

    let service = match connect(&formatter).await {
        Ok(service) => service,
        Err(code) => return code,
    };

    let request = ResolveRequest::new(&args.tenant.client, args.tenant.environment, &file_name)
        .directory(args.dir.as_deref())
        .strategy(args.strategy)
        .version(args.version);

    let spinner = Spinner::start(formatter.config(), &format!("Uploading {source_display}"));
    let result = service
        .upload(&request, content_type.as_deref(), data)
        .await;
    spinner.finish();

    match result {
        Ok(receipt) => {
            if formatter.is_json() {
                formatter.json(&PutOutput {
                    status: "success",
                    source: source_display,
                    location: receipt.location,
                    original_name: receipt.original_name,
                    strategy: receipt.strategy,
                    size_bytes: receipt.object.size_bytes,
                    size_human: receipt.object.size_human,
                    content_type,
                    etag: receipt.object.etag,
                });
            } else {
                formatter.println(&format!(
                    "{source_display} -> {} ({})",
                    formatter.emphasize(&receipt.location.to_string()),
                    receipt.object.size_human
                ));
            }
            ExitCode::Success
        }
        Err(e) => report(&formatter, &format!("Failed to upload {source_display}"), &e),
    }
}

fn upload_name(args: &PutArgs) -> Option<String> {
    match &args.name {
        Some(name) => Some(name.clone()),
        None => args
            .source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    }
}

fn guess_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}
