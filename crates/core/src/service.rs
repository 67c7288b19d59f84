//! Tenant-aware storage operations
//!
//! Glues the [`KeyResolver`] to a [`StorageGateway`]: every operation resolves
//! its location first and only then touches storage.
//!
//! `DuplicateFileStrategy::Reject` is a check-then-write: two concurrent
//! uploads resolving to the same key can both pass the existence check.
//! Callers that need at-most-once semantics must serialize uploads per key.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::gateway::{ObjectInfo, StorageGateway};
use crate::naming::{SuffixSource, SystemSource};
use crate::resolver::{KeyResolver, ResolveRequest};
use crate::types::{DuplicateFileStrategy, Environment, ObjectLocation};

/// Behaviour switches read from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Create missing buckets on upload
    pub auto_create_buckets: bool,
    /// Largest accepted payload in bytes
    pub max_file_size: Option<u64>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            auto_create_buckets: true,
            max_file_size: None,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    /// Where the object was stored
    pub location: ObjectLocation,
    /// Name the caller asked for
    pub original_name: String,
    /// Strategy that produced the stored name
    pub strategy: DuplicateFileStrategy,
    /// Metadata reported by the store
    pub object: ObjectInfo,
}

/// Storage operations scoped to tenants
pub struct StorageService<S = SystemSource> {
    gateway: Arc<dyn StorageGateway>,
    resolver: KeyResolver<S>,
    options: ServiceOptions,
}

impl<S: SuffixSource> StorageService<S> {
    /// Create a service over a gateway
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        resolver: KeyResolver<S>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            gateway,
            resolver,
            options,
        }
    }

    /// The resolver used for every operation
    pub fn resolver(&self) -> &KeyResolver<S> {
        &self.resolver
    }

    /// Make sure a bucket exists, creating it if needed
    ///
    /// Safe to call concurrently: losing a creation race to another caller is
    /// not an error once the bucket exists.
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if self.gateway.bucket_exists(bucket).await? {
            return Ok(());
        }

        tracing::info!(bucket, "Creating bucket");
        match self.gateway.create_bucket(bucket).await {
            Ok(()) => {
                tracing::info!(bucket, "Bucket created");
                Ok(())
            }
            Err(Error::Conflict(reason)) => {
                if self.gateway.bucket_exists(bucket).await? {
                    tracing::debug!(bucket, "Bucket created concurrently");
                    Ok(())
                } else {
                    Err(Error::Conflict(reason))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve and ensure the bucket for a tenant
    pub async fn ensure_tenant_bucket(
        &self,
        client_id: &str,
        environment: Environment,
    ) -> Result<String> {
        let bucket = self.resolver.checked_bucket(client_id, environment)?;
        self.ensure_bucket(&bucket).await?;
        Ok(bucket)
    }

    /// Store a new file for a tenant
    pub async fn upload(
        &self,
        request: &ResolveRequest<'_>,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let size = data.len() as u64;
        if let Some(limit) = self.options.max_file_size
            && size > limit
        {
            return Err(Error::FileTooLarge { size, limit });
        }

        let strategy = self.resolver.effective_strategy(request);
        let location = self.resolver.resolve(request)?;

        if self.options.auto_create_buckets {
            self.ensure_bucket(location.bucket()).await?;
        } else {
            self.require_bucket(location.bucket()).await?;
        }

        match strategy {
            DuplicateFileStrategy::Reject => {
                if self
                    .gateway
                    .object_exists(location.bucket(), location.key())
                    .await?
                {
                    tracing::warn!(
                        bucket = location.bucket(),
                        key = location.key(),
                        "Upload rejected: object already exists"
                    );
                    return Err(Error::ObjectExists {
                        bucket: location.bucket().to_string(),
                        key: location.key().to_string(),
                    });
                }
            }
            DuplicateFileStrategy::Overwrite
            | DuplicateFileStrategy::UuidSuffix
            | DuplicateFileStrategy::TimestampSuffix
            | DuplicateFileStrategy::Version => {}
        }

        let object = self
            .gateway
            .put_object(
                location.bucket(),
                location.key(),
                content_type.map(str::to_string),
                data,
            )
            .await?;

        tracing::info!(
            bucket = location.bucket(),
            key = location.key(),
            size,
            "File uploaded"
        );

        Ok(UploadReceipt {
            location,
            original_name: request.file_name.to_string(),
            strategy,
            object,
        })
    }

    /// Fetch a tenant's file
    pub async fn download(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
        file_name: &str,
    ) -> Result<(ObjectLocation, Vec<u8>)> {
        let location = self
            .resolver
            .locate(client_id, environment, directory, file_name)?;
        self.require_bucket(location.bucket()).await?;

        let data = self
            .gateway
            .get_object(location.bucket(), location.key())
            .await?;
        tracing::info!(
            bucket = location.bucket(),
            key = location.key(),
            size = data.len(),
            "File downloaded"
        );
        Ok((location, data))
    }

    /// List a tenant's files, optionally under a directory
    pub async fn list(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
    ) -> Result<Vec<String>> {
        let (bucket, prefix) = self
            .resolver
            .listing_scope(client_id, environment, directory)?;
        self.require_bucket(&bucket).await?;

        let prefix = (!prefix.is_empty()).then_some(prefix);
        let keys = self.gateway.list_objects(&bucket, prefix).await?;
        tracing::info!(bucket = %bucket, count = keys.len(), "Listed files");
        Ok(keys)
    }

    /// Delete a tenant's file
    pub async fn delete(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
        file_name: &str,
    ) -> Result<ObjectLocation> {
        let location = self
            .resolver
            .locate(client_id, environment, directory, file_name)?;
        self.require_bucket(location.bucket()).await?;

        self.gateway
            .delete_object(location.bucket(), location.key())
            .await?;
        tracing::info!(
            bucket = location.bucket(),
            key = location.key(),
            "File deleted"
        );
        Ok(location)
    }

    async fn require_bucket(&self, bucket: &str) -> Result<()> {
        if self.gateway.bucket_exists(bucket).await? {
            Ok(())
        } else {
            Err(Error::BucketNotFound(bucket.to_string()))
        }
    }
}
