//! stash-core: Core library for the stash multi-tenant storage layer
//!
//! This crate provides the naming layer that sits in front of S3-compatible
//! object storage:
//! - Path and file-name sanitization
//! - Collision-avoiding file names
//! - Bucket and key resolution per tenant and environment
//! - Configuration management
//! - StorageGateway trait and the tenant-aware StorageService
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing for easy testing and potential future support for other backends.

pub mod config;
pub mod error;
pub mod gateway;
pub mod naming;
pub mod resolver;
pub mod sanitizer;
pub mod service;
pub mod types;

pub use config::{Config, ConfigManager, RetryConfig, StorageConfig, TimeoutConfig};
pub use error::{Error, PathViolation, Result};
pub use gateway::{ObjectInfo, StorageGateway};
pub use naming::{FileNameGenerator, SuffixSource, SystemSource, generate_file_name};
pub use resolver::{KeyResolver, ResolveRequest, ResolverConfig, validate_bucket_name};
pub use sanitizer::{SanitizedPath, is_valid_path, sanitize_file_name, sanitize_path};
pub use service::{ServiceOptions, StorageService, UploadReceipt};
pub use types::{BucketStrategy, DuplicateFileStrategy, Environment, ObjectLocation};
