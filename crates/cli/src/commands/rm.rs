//! rm command - Remove a tenant's file

use clap::Args;
use serde::Serialize;

use super::{TenantArgs, connect, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Delete a tenant's file
#[derive(Args, Debug)]
pub struct RmArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory inside the tenant namespace
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Stored file name
    pub file: String,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    bucket: String,
    key: String,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let service = match connect(&formatter).await {
        Ok(service) => service,
        Err(code) => return code,
    };

    let result = service
        .delete(
            &args.tenant.client,
            args.tenant.environment,
            args.dir.as_deref(),
            &args.file,
        )
        .await;

    match result {
        Ok(location) => {
            if formatter.is_json() {
                formatter.json(&RmOutput {
                    status: "success",
                    bucket: location.bucket().to_string(),
                    key: location.key().to_string(),
                });
            } else {
                formatter.success(&format!("Removed '{location}'."));
            }
            ExitCode::Success
        }
        Err(e) => report(&formatter, &format!("Failed to remove {}", args.file), &e),
    }
}
