//! get command - Download a tenant's file
//!
//! Writes the object to a local file, or to stdout when no output is given.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use super::{TenantArgs, connect, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Download a tenant's file
#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory inside the tenant namespace
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Stored file name
    pub file: String,

    /// Local destination (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    status: &'static str,
    bucket: String,
    key: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

/// Execute the get command
pub async fn execute(args: GetArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let service = match connect(&formatter).await {
        Ok(service) => service,
        Err(code) => return code,
    };

    // Raw bytes on stdout must not be interleaved with a spinner
    let spinner = args
        .output
        .as_ref()
        .map(|_| Spinner::start(formatter.config(), &format!("Downloading {}", args.file)));
    let result = service
        .download(
            &args.tenant.client,
            args.tenant.environment,
            args.dir.as_deref(),
            &args.file,
        )
        .await;
    drop(spinner);

    let (location, data) = match result {
        Ok(downloaded) => downloaded,
        Err(e) => return report(&formatter, &format!("Failed to download {}", args.file), &e),
    };

    let Some(target) = args.output else {
        let mut stdout = tokio::io::stdout();
        if let Err(e) = stdout.write_all(&data).await {
            formatter.error(&format!("Failed to write to stdout: {e}"));
            return ExitCode::GeneralError;
        }
        if let Err(e) = stdout.flush().await {
            formatter.error(&format!("Failed to write to stdout: {e}"));
            return ExitCode::GeneralError;
        }
        return ExitCode::Success;
    };

    let target_display = target.display().to_string();
    if let Err(e) = tokio::fs::write(&target, &data).await {
        formatter.error(&format!("Failed to write {target_display}: {e}"));
        return ExitCode::GeneralError;
    }

    let size = data.len() as u64;
    let size_human = humansize::format_size(size, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&GetOutput {
            status: "success",
            bucket: location.bucket().to_string(),
            key: location.key().to_string(),
            target: target_display,
            size_bytes: size,
            size_human,
        });
    } else {
        formatter.println(&format!("{location} -> {target_display} ({size_human})"));
    }

    ExitCode::Success
}
