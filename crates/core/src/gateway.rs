//! StorageGateway trait definition
//!
//! This trait defines the object-storage operations the naming layer hands
//! resolved locations to. It keeps stash-core independent of any S3 SDK and
//! can be mocked for testing.

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;

use crate::error::Result;

/// Metadata for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Human-readable size
    pub size_human: String,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a key of the given size
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes: size,
            size_human: humansize::format_size(size, humansize::BINARY),
            last_modified: None,
            etag: None,
            content_type: None,
        }
    }
}

/// Object-storage operations consumed after resolution
///
/// Implementations report a missing bucket as `Error::BucketNotFound`, a
/// missing key as `Error::ObjectNotFound` and a bucket that already exists on
/// create as `Error::Conflict`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create a bucket
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Check if an object exists
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Store an object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        data: Vec<u8>,
    ) -> Result<ObjectInfo>;

    /// Get object content as bytes
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// List object keys, skipping directory markers (keys ending in `/`)
    async fn list_objects(&self, bucket: &str, prefix: Option<String>) -> Result<Vec<String>>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}
