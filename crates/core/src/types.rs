//! Closed vocabularies of the naming layer
//!
//! Environments, bucket strategies and duplicate-file strategies are fixed
//! sets. Each carries a canonical lowercase code used in paths, bucket names
//! and configuration files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Deployment stage a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// `dev`
    #[serde(rename = "dev")]
    Development,
    /// `staging`
    #[serde(rename = "staging")]
    Staging,
    /// `prod`
    #[serde(rename = "prod")]
    Production,
    /// `test`
    #[serde(rename = "test")]
    Test,
    /// `uat`
    #[serde(rename = "uat")]
    Uat,
}

impl Environment {
    /// All environments, in declaration order
    pub const ALL: [Environment; 5] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
        Environment::Test,
        Environment::Uat,
    ];

    /// Tag used in object keys and bucket names
    pub const fn tag(self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Staging => "staging",
            Environment::Production => "prod",
            Environment::Test => "test",
            Environment::Uat => "uat",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            "uat" => Ok(Environment::Uat),
            _ => Err(Error::InvalidEnvironment(s.to_string())),
        }
    }
}

/// How tenants and environments map onto physical buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketStrategy {
    /// One shared bucket, keys prefixed with `client/env/`
    #[serde(rename = "shared-prefix")]
    SharedWithPrefix,
    /// `client-suffix` bucket per tenant, keys prefixed with `env/`
    #[serde(rename = "per-client")]
    PerClient,
    /// `client-env-suffix` bucket per tenant and environment
    #[serde(rename = "per-client-env")]
    PerClientPerEnvironment,
}

impl BucketStrategy {
    /// Configuration code
    pub const fn code(self) -> &'static str {
        match self {
            BucketStrategy::SharedWithPrefix => "shared-prefix",
            BucketStrategy::PerClient => "per-client",
            BucketStrategy::PerClientPerEnvironment => "per-client-env",
        }
    }
}

impl fmt::Display for BucketStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BucketStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_code(s).as_str() {
            "shared-prefix" | "shared-with-prefix" => Ok(BucketStrategy::SharedWithPrefix),
            "per-client" => Ok(BucketStrategy::PerClient),
            "per-client-env" | "per-client-per-environment" => {
                Ok(BucketStrategy::PerClientPerEnvironment)
            }
            _ => Err(Error::InvalidBucketStrategy(s.to_string())),
        }
    }
}

/// Naming policy for uploads that may collide with an existing object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuplicateFileStrategy {
    /// Keep the name; the write replaces any existing object
    #[serde(rename = "overwrite")]
    Overwrite,
    /// `name_1a2b3c4d.ext`
    #[serde(rename = "uuid")]
    UuidSuffix,
    /// `name_20251230_103045.ext`
    #[serde(rename = "timestamp")]
    TimestampSuffix,
    /// `name_v2.ext`
    #[serde(rename = "version")]
    Version,
    /// Keep the name; the write fails if the object exists
    #[serde(rename = "reject")]
    Reject,
}

impl DuplicateFileStrategy {
    /// Configuration code
    pub const fn code(self) -> &'static str {
        match self {
            DuplicateFileStrategy::Overwrite => "overwrite",
            DuplicateFileStrategy::UuidSuffix => "uuid",
            DuplicateFileStrategy::TimestampSuffix => "timestamp",
            DuplicateFileStrategy::Version => "version",
            DuplicateFileStrategy::Reject => "reject",
        }
    }
}

impl fmt::Display for DuplicateFileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DuplicateFileStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_code(s).as_str() {
            "overwrite" => Ok(DuplicateFileStrategy::Overwrite),
            "uuid" | "uuid-suffix" => Ok(DuplicateFileStrategy::UuidSuffix),
            "timestamp" | "timestamp-suffix" => Ok(DuplicateFileStrategy::TimestampSuffix),
            "version" => Ok(DuplicateFileStrategy::Version),
            "reject" => Ok(DuplicateFileStrategy::Reject),
            _ => Err(Error::InvalidDuplicateStrategy(s.to_string())),
        }
    }
}

/// Lowercase and treat `_` as `-`, so `PER_CLIENT` and `per-client` agree
fn normalize_code(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}

/// A resolved, sanitized storage target
///
/// Only the resolver builds these: `bucket` is always a valid bucket name and
/// `key` has already passed the path sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectLocation {
    bucket: String,
    key: String,
}

impl ObjectLocation {
    pub(crate) fn new(bucket: String, key: String) -> Self {
        Self { bucket, key }
    }

    /// Target bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key within the bucket
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}
