//! mb command - Make bucket
//!
//! Resolves the bucket for a tenant and creates it if it does not exist.

use clap::Args;
use serde::Serialize;

use super::{TenantArgs, connect, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create the bucket for a tenant
#[derive(Args, Debug)]
pub struct MbArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: &'static str,
    bucket: String,
}

/// Execute the mb command
pub async fn execute(args: MbArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let service = match connect(&formatter).await {
        Ok(service) => service,
        Err(code) => return code,
    };

    match service
        .ensure_tenant_bucket(&args.tenant.client, args.tenant.environment)
        .await
    {
        Ok(bucket) => {
            if formatter.is_json() {
                formatter.json(&MbOutput {
                    status: "success",
                    bucket,
                });
            } else {
                formatter.success(&format!("Bucket '{}' is ready.", formatter.emphasize(&bucket)));
            }
            ExitCode::Success
        }
        Err(e) => report(&formatter, "Failed to create bucket", &e),
    }
}
