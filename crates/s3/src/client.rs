//! S3 gateway implementation
//!
//! Wraps aws-sdk-s3 and implements the StorageGateway trait from stash-core.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::timeout::TimeoutConfig as SdkTimeoutConfig;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use stash_core::{Error, ObjectInfo, Result, StorageConfig, StorageGateway};

/// Region that rejects an explicit location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// StorageGateway backed by an S3-compatible service
pub struct S3Gateway {
    inner: aws_sdk_s3::Client,
    region: String,
}

impl S3Gateway {
    /// Create a new gateway from the storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;

        let retry = config.retry.clone().unwrap_or_default();
        let timeout = config.timeout.clone().unwrap_or_default();

        let retry_config = SdkRetryConfig::standard()
            .with_max_attempts(retry.max_attempts)
            .with_initial_backoff(Duration::from_millis(retry.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(retry.max_backoff_ms));

        let timeout_config = SdkTimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        // Without static keys the default provider chain applies
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = aws_credential_types::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None, // session token
                None, // expiry
                "stash-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        tracing::debug!(
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            region = %config.region,
            path_style = config.path_style,
            "S3 gateway configured"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            region: config.region.clone(),
        })
    }

    fn bucket_configuration(&self) -> Option<CreateBucketConfiguration> {
        if self.region == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

#[async_trait]
impl StorageGateway for S3Gateway {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, bucket, None) {
                Error::BucketNotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.inner
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.bucket_configuration())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, None))?;

        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.inner.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, bucket, Some(key)) {
                Error::ObjectNotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        data: Vec<u8>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as u64;

        let response = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type.clone())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        let mut info = ObjectInfo::new(key, size);
        info.etag = response.e_tag().map(|etag| etag.trim_matches('"').to_string());
        info.last_modified = Some(jiff::Timestamp::now());
        info.content_type = content_type;

        Ok(info)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<String>) -> Result<Vec<String>> {
        let mut pages = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_sdk_error(e, bucket, None))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| !key.ends_with('/'))
                    .map(str::to_string),
            );
        }

        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        Ok(())
    }
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, bucket: &str, key: Option<&str>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    tracing::debug!(bucket, key, ?code, ?status, "S3 request failed");
    classify(code.as_deref(), status, bucket, key, message)
}

/// Map an S3 error code or HTTP status onto a stash error
///
/// HEAD responses carry no body, so a bare 404 is read as the object when a
/// key was involved and as the bucket otherwise.
fn classify(
    code: Option<&str>,
    status: Option<u16>,
    bucket: &str,
    key: Option<&str>,
    message: String,
) -> Error {
    let object_not_found = |key: &str| Error::ObjectNotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    };

    match (code, status, key) {
        (Some("NoSuchBucket"), _, _) => Error::BucketNotFound(bucket.to_string()),
        (Some("NoSuchKey"), _, Some(key)) => object_not_found(key),
        (Some("NotFound"), _, Some(key)) | (None, Some(404), Some(key)) => object_not_found(key),
        (Some("NotFound"), _, None) | (None, Some(404), None) => {
            Error::BucketNotFound(bucket.to_string())
        }
        (Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists"), _, _) | (_, Some(409), _) => {
            Error::Conflict(message)
        }
        (Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"), _, _)
        | (_, Some(401 | 403), _) => Error::Auth(message),
        _ => Error::Network(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_simple(code: Option<&str>, status: Option<u16>, key: Option<&str>) -> Error {
        classify(code, status, "acme-storage", key, "boom".to_string())
    }

    #[test]
    fn test_classify_missing_bucket() {
        assert!(matches!(
            classify_simple(Some("NoSuchBucket"), Some(404), Some("dev/a.txt")),
            Error::BucketNotFound(b) if b == "acme-storage"
        ));
        assert!(matches!(
            classify_simple(None, Some(404), None),
            Error::BucketNotFound(_)
        ));
        assert!(matches!(
            classify_simple(Some("NotFound"), Some(404), None),
            Error::BucketNotFound(_)
        ));
    }

    #[test]
    fn test_classify_missing_object() {
        assert!(matches!(
            classify_simple(Some("NoSuchKey"), Some(404), Some("dev/a.txt")),
            Error::ObjectNotFound { key, .. } if key == "dev/a.txt"
        ));
        assert!(matches!(
            classify_simple(None, Some(404), Some("dev/a.txt")),
            Error::ObjectNotFound { .. }
        ));
    }

    #[test]
    fn test_classify_conflict() {
        assert!(matches!(
            classify_simple(Some("BucketAlreadyOwnedByYou"), Some(409), None),
            Error::Conflict(_)
        ));
        assert!(matches!(
            classify_simple(Some("BucketAlreadyExists"), None, None),
            Error::Conflict(_)
        ));
    }

    #[test]
    fn test_classify_auth() {
        assert!(matches!(
            classify_simple(Some("AccessDenied"), Some(403), None),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify_simple(None, Some(403), Some("k")),
            Error::Auth(_)
        ));
    }

    #[test]
    fn test_classify_fallback_is_network() {
        let err = classify_simple(Some("SlowDown"), Some(503), None);
        assert!(matches!(&err, Error::Network(m) if m == "boom"));
        assert_eq!(err.exit_code(), 3);
        assert!(matches!(classify_simple(None, None, None), Error::Network(_)));
    }

    #[tokio::test]
    async fn test_new_with_static_credentials() {
        let config = StorageConfig {
            endpoint: Some("http://localhost:9000".to_string()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
            region: "eu-west-1".to_string(),
            ..Default::default()
        };

        let gateway = S3Gateway::new(&config).await.unwrap();
        let constraint = gateway.bucket_configuration().unwrap();
        assert_eq!(
            constraint.location_constraint(),
            Some(&BucketLocationConstraint::EuWest1)
        );
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_endpoint() {
        let config = StorageConfig {
            endpoint: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            S3Gateway::new(&config).await,
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_default_region_has_no_location_constraint() {
        let config = StorageConfig {
            access_key: Some("k".to_string()),
            secret_key: Some("s".to_string()),
            ..Default::default()
        };
        let gateway = S3Gateway::new(&config).await.unwrap();
        assert!(gateway.bucket_configuration().is_none());
    }
}
