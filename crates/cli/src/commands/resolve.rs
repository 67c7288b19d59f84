//! resolve command - Show where a file would be stored
//!
//! Runs the full naming pipeline (duplicate strategy, bucket and key
//! resolution, sanitization) without touching storage.

use clap::Args;
use serde::Serialize;
use stash_core::{DuplicateFileStrategy, ResolveRequest};

use super::{TenantArgs, build_resolver, load_config, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Resolve a file to its bucket and key
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Directory inside the tenant namespace
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Duplicate-file strategy (overrides configuration)
    #[arg(short, long)]
    pub strategy: Option<DuplicateFileStrategy>,

    /// Version number for the "version" strategy
    #[arg(long)]
    pub version: Option<u32>,

    /// File name to resolve
    pub file: String,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    bucket: String,
    key: String,
    original_name: String,
    strategy: DuplicateFileStrategy,
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let resolver = match load_config(&formatter).and_then(|c| build_resolver(&formatter, &c)) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };

    let request = ResolveRequest::new(&args.tenant.client, args.tenant.environment, &args.file)
        .directory(args.dir.as_deref())
        .strategy(args.strategy)
        .version(args.version);
    let strategy = resolver.effective_strategy(&request);

    let location = match resolver.resolve(&request) {
        Ok(location) => location,
        Err(e) => return report(&formatter, "Failed to resolve", &e),
    };

    if formatter.is_json() {
        formatter.json(&ResolveOutput {
            bucket: location.bucket().to_string(),
            key: location.key().to_string(),
            original_name: args.file,
            strategy,
        });
    } else {
        formatter.println(&location.to_string());
    }

    ExitCode::Success
}
