//! ls command - List a tenant's files
//!
//! Listing is confined to the tenant's key prefix, so tenants sharing a
//! bucket never see each other's objects.

use clap::Args;
use serde::Serialize;

use super::{TenantArgs, connect, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List a tenant's files
#[derive(Args, Debug)]
pub struct LsArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory inside the tenant namespace
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Show keys relative to the tenant prefix
    #[arg(short, long)]
    pub relative: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    bucket: String,
    prefix: String,
    keys: Vec<String>,
    count: usize,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let service = match connect(&formatter).await {
        Ok(service) => service,
        Err(code) => return code,
    };

    let client = &args.tenant.client;
    let environment = args.tenant.environment;
    let dir = args.dir.as_deref();

    let (bucket, prefix) = match service.resolver().listing_scope(client, environment, dir) {
        Ok(scope) => scope,
        Err(e) => return report(&formatter, "Failed to list files", &e),
    };

    let keys = match service.list(client, environment, dir).await {
        Ok(keys) => keys,
        Err(e) => return report(&formatter, "Failed to list files", &e),
    };

    let keys: Vec<String> = if args.relative {
        keys.into_iter()
            .map(|key| strip_scope(&key, &prefix).to_string())
            .collect()
    } else {
        keys
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            count: keys.len(),
            bucket,
            prefix,
            keys,
        });
    } else {
        for key in &keys {
            formatter.println(key);
        }
        formatter.println(&format!(
            "\nTotal: {} files in {}/{prefix}",
            keys.len(),
            formatter.emphasize(&bucket)
        ));
    }

    ExitCode::Success
}

fn strip_scope<'a>(key: &'a str, prefix: &str) -> &'a str {
    key.strip_prefix(prefix).unwrap_or(key)
}
