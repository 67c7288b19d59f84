//! sanitize command - Sanitize or validate user-supplied paths
//!
//! Exposes the path sanitizer so operators can check what a caller-supplied
//! path, directory or file name turns into before it reaches storage.

use clap::{Args, ValueEnum};
use serde::Serialize;
use stash_core::{Result, is_valid_path, sanitize_file_name, sanitize_path, sanitizer};

use super::report;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// What kind of input to sanitize
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeKind {
    /// Relative object path
    Path,
    /// Optional directory (empty input allowed)
    Dir,
    /// Single file name
    File,
}

/// Sanitize a path, directory or file name
#[derive(Args, Debug)]
pub struct SanitizeArgs {
    /// Kind of input
    #[arg(value_enum)]
    pub kind: SanitizeKind,

    /// Value to sanitize
    pub input: String,

    /// Only report whether the input is acceptable
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Serialize)]
struct SanitizeOutput {
    kind: SanitizeKind,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sanitized: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Execute the sanitize command
pub fn execute(args: SanitizeArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    if args.check {
        return check(&args, &formatter);
    }

    match sanitize(args.kind, &args.input) {
        Ok(sanitized) => {
            if formatter.is_json() {
                formatter.json(&SanitizeOutput {
                    kind: args.kind,
                    valid: true,
                    sanitized: Some(sanitized),
                    reason: None,
                });
            } else {
                formatter.println(&sanitized);
            }
            ExitCode::Success
        }
        Err(e) => report(&formatter, "Rejected", &e),
    }
}

fn check(args: &SanitizeArgs, formatter: &Formatter) -> ExitCode {
    let (valid, reason) = verdict(args.kind, &args.input);

    if formatter.is_json() {
        formatter.json(&SanitizeOutput {
            kind: args.kind,
            valid,
            sanitized: None,
            reason,
        });
    } else if valid {
        formatter.println("valid");
    } else {
        formatter.println(&format!(
            "invalid{}",
            reason.map(|r| format!(": {r}")).unwrap_or_default()
        ));
    }

    if valid {
        ExitCode::Success
    } else {
        ExitCode::UsageError
    }
}

/// Whether the input is acceptable, and the failed check when it is not
fn verdict(kind: SanitizeKind, input: &str) -> (bool, Option<String>) {
    if kind == SanitizeKind::Path && is_valid_path(input) {
        return (true, None);
    }
    match sanitize(kind, input) {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    }
}

fn sanitize(kind: SanitizeKind, input: &str) -> Result<String> {
    match kind {
        SanitizeKind::Path => sanitize_path(input).map(String::from),
        SanitizeKind::Dir => sanitizer::sanitize_directory(Some(input)),
        SanitizeKind::File => sanitize_file_name(input),
    }
}
