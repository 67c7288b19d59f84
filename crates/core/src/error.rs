//! Error types for stash-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.
//! Sanitizer failures carry a [`PathViolation`] naming the check that failed,
//! never the rejected input itself.

use std::fmt;

use thiserror::Error;

/// Result type alias for stash-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// The sanitizer check that rejected a path or file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathViolation {
    /// Input was empty or whitespace only
    Empty,
    /// A `..` segment next to a separator
    Traversal,
    /// Leading separator or drive-letter prefix
    Absolute,
    /// One of `< > : " | ? *` or an ASCII control code
    IllegalCharacters,
    /// Normalized path still climbs above its root
    EscapesBase,
    /// Final component is a reserved device name
    ReservedName,
    /// File name contains `/` or `\`
    ContainsSeparator,
    /// Nothing left after stripping dots and spaces
    EmptyAfterSanitization,
}

impl fmt::Display for PathViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            PathViolation::Empty => "cannot be null or empty",
            PathViolation::Traversal => "path traversal detected",
            PathViolation::Absolute => "absolute paths not allowed",
            PathViolation::IllegalCharacters => "contains illegal characters",
            PathViolation::EscapesBase => "escapes base directory",
            PathViolation::ReservedName => "uses reserved name",
            PathViolation::ContainsSeparator => "cannot contain path separators",
            PathViolation::EmptyAfterSanitization => "empty after sanitization",
        };
        f.write_str(reason)
    }
}

/// Error types for stash-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Directory or object path failed sanitization
    #[error("Invalid path: {0}")]
    InvalidPath(PathViolation),

    /// File name failed sanitization
    #[error("Invalid file name: {0}")]
    InvalidFileName(PathViolation),

    /// Client id is blank and cannot identify a tenant
    #[error("Invalid client id: {0:?}")]
    InvalidClientId(String),

    /// Resolved bucket name is not a valid S3 bucket name
    #[error("Invalid bucket name: {0:?}")]
    InvalidBucketName(String),

    /// Configured bucket strategy is not recognized
    #[error("Invalid bucket strategy: {0:?}")]
    InvalidBucketStrategy(String),

    /// Configured or requested duplicate-file strategy is not recognized
    #[error("Invalid duplicate file strategy: {0:?}")]
    InvalidDuplicateStrategy(String),

    /// Unknown environment tag
    #[error("Unknown environment: {0:?}")]
    InvalidEnvironment(String),

    /// Bucket does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Object does not exist in the bucket
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound {
        /// Bucket that was searched
        bucket: String,
        /// Missing key
        key: String,
    },

    /// Upload rejected because the target key is already taken
    #[error("Object already exists: {bucket}/{key}")]
    ObjectExists {
        /// Target bucket
        bucket: String,
        /// Existing key
        key: String,
    },

    /// Payload exceeds the configured maximum size
    #[error("File size {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge {
        /// Payload size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_)
            | Error::InvalidFileName(_)
            | Error::InvalidClientId(_)
            | Error::InvalidBucketName(_)
            | Error::InvalidBucketStrategy(_)
            | Error::InvalidDuplicateStrategy(_)
            | Error::InvalidEnvironment(_)
            | Error::FileTooLarge { .. }
            | Error::InvalidUrl(_)
            | Error::Config(_) => 2, // UsageError
            Error::Network(_) => 3,  // NetworkError
            Error::Auth(_) => 4,     // AuthError
            Error::BucketNotFound(_) | Error::ObjectNotFound { .. } => 5, // NotFound
            Error::Conflict(_) | Error::ObjectExists { .. } => 6, // Conflict
            _ => 1,                  // GeneralError
        }
    }
}
