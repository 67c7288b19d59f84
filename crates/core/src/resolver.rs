//! Bucket and key resolution
//!
//! Maps `(client, environment, directory, file name)` to an [`ObjectLocation`]
//! under the configured [`BucketStrategy`]:
//!
//! | strategy         | bucket                   | key                          |
//! |------------------|--------------------------|------------------------------|
//! | `shared-prefix`  | `shared_bucket`          | `client/env/[dir/]file`      |
//! | `per-client`     | `client-suffix`          | `env/[dir/]file`             |
//! | `per-client-env` | `client-env-suffix`      | `[dir/]file`                 |
//!
//! Client ids and environment tags are operator-controlled and only go
//! through the loose bucket/path filters below, except that a blank client
//! id is rejected outright. Directories and file names
//! come from callers and always go through the [`sanitizer`](crate::sanitizer).

use crate::error::{Error, Result};
use crate::naming::{FileNameGenerator, SuffixSource, SystemSource};
use crate::sanitizer;
use crate::types::{BucketStrategy, DuplicateFileStrategy, Environment, ObjectLocation};

/// Default bucket for the shared strategy
pub const DEFAULT_SHARED_BUCKET: &str = "shared-storage";

/// Default suffix for per-client buckets
pub const DEFAULT_BUCKET_SUFFIX: &str = "storage";

/// Immutable naming settings, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How tenants map onto buckets
    pub bucket_strategy: BucketStrategy,
    /// Bucket used by [`BucketStrategy::SharedWithPrefix`]
    pub shared_bucket: String,
    /// Suffix appended to per-client bucket names
    pub bucket_suffix: String,
    /// Strategy used when a request does not pick one
    pub duplicate_strategy: DuplicateFileStrategy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bucket_strategy: BucketStrategy::SharedWithPrefix,
            shared_bucket: DEFAULT_SHARED_BUCKET.to_string(),
            bucket_suffix: DEFAULT_BUCKET_SUFFIX.to_string(),
            duplicate_strategy: DuplicateFileStrategy::UuidSuffix,
        }
    }
}

impl ResolverConfig {
    /// Check the settings that would otherwise fail on every request
    pub fn validate(&self) -> Result<()> {
        match self.bucket_strategy {
            BucketStrategy::SharedWithPrefix => validate_bucket_name(&self.shared_bucket),
            BucketStrategy::PerClient | BucketStrategy::PerClientPerEnvironment => {
                let suffix = &self.bucket_suffix;
                if suffix.is_empty() || sanitize_for_bucket_name(suffix) != *suffix {
                    return Err(Error::Config(format!(
                        "bucket suffix {suffix:?} must be lowercase letters, digits and hyphens"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Everything needed to place a new upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest<'a> {
    /// Tenant identifier
    pub client_id: &'a str,
    /// Target environment
    pub environment: Environment,
    /// Optional directory inside the tenant namespace
    pub directory: Option<&'a str>,
    /// Caller-supplied file name
    pub file_name: &'a str,
    /// Per-call override of the configured duplicate strategy
    pub duplicate_strategy: Option<DuplicateFileStrategy>,
    /// Version number for [`DuplicateFileStrategy::Version`]
    pub version: Option<u32>,
}

impl<'a> ResolveRequest<'a> {
    /// Request with no directory and the configured duplicate strategy
    pub fn new(client_id: &'a str, environment: Environment, file_name: &'a str) -> Self {
        Self {
            client_id,
            environment,
            directory: None,
            file_name,
            duplicate_strategy: None,
            version: None,
        }
    }

    /// Place the file under a directory
    pub fn directory(mut self, directory: Option<&'a str>) -> Self {
        self.directory = directory;
        self
    }

    /// Override the duplicate-file strategy
    pub fn strategy(mut self, strategy: Option<DuplicateFileStrategy>) -> Self {
        self.duplicate_strategy = strategy;
        self
    }

    /// Set the version for versioned names
    pub fn version(mut self, version: Option<u32>) -> Self {
        self.version = version;
        self
    }
}

/// Resolves tenant requests to sanitized storage locations
#[derive(Debug, Clone)]
pub struct KeyResolver<S = SystemSource> {
    config: ResolverConfig,
    names: FileNameGenerator<S>,
}

impl KeyResolver<SystemSource> {
    /// Create a resolver using the system clock and RNG for suffixes
    pub fn new(config: ResolverConfig) -> Result<Self> {
        Self::with_generator(config, FileNameGenerator::new())
    }
}

impl<S: SuffixSource> KeyResolver<S> {
    /// Create a resolver with a custom file-name generator
    pub fn with_generator(config: ResolverConfig, names: FileNameGenerator<S>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, names })
    }

    /// Active configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Duplicate strategy a request will actually use
    pub fn effective_strategy(&self, request: &ResolveRequest<'_>) -> DuplicateFileStrategy {
        request
            .duplicate_strategy
            .unwrap_or(self.config.duplicate_strategy)
    }

    /// Bucket name for a tenant and environment
    ///
    /// Never fails; an unusable client id yields a name that
    /// [`validate_bucket_name`] rejects.
    pub fn resolve_bucket(&self, client_id: &str, environment: Environment) -> String {
        match self.config.bucket_strategy {
            BucketStrategy::SharedWithPrefix => self.config.shared_bucket.clone(),
            BucketStrategy::PerClient => format!(
                "{}-{}",
                sanitize_for_bucket_name(client_id),
                self.config.bucket_suffix
            ),
            BucketStrategy::PerClientPerEnvironment => format!(
                "{}-{}-{}",
                sanitize_for_bucket_name(client_id),
                environment.tag(),
                self.config.bucket_suffix
            ),
        }
    }

    /// The part of every key that identifies the tenant, e.g. `acme/dev/`
    ///
    /// Fails for a blank client id, which would otherwise produce a prefix
    /// with a leading `/`.
    pub fn key_prefix(&self, client_id: &str, environment: Environment) -> Result<String> {
        check_client_id(client_id)?;
        let mut prefix = String::new();

        match self.config.bucket_strategy {
            BucketStrategy::SharedWithPrefix => {
                prefix.push_str(&sanitize_for_path(client_id));
                prefix.push('/');
                prefix.push_str(environment.tag());
                prefix.push('/');
            }
            BucketStrategy::PerClient => {
                prefix.push_str(environment.tag());
                prefix.push('/');
            }
            // Environment is already part of the bucket name
            BucketStrategy::PerClientPerEnvironment => {}
        }

        Ok(prefix)
    }

    /// Object key for a file, sanitizing directory and file name
    pub fn resolve_key(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
        file_name: &str,
    ) -> Result<String> {
        let mut key = self.key_prefix(client_id, environment)?;

        let directory = sanitizer::sanitize_directory(directory)?;
        if !directory.is_empty() {
            key.push_str(&directory);
            key.push('/');
        }

        key.push_str(&sanitizer::sanitize_file_name(file_name)?);
        Ok(key)
    }

    /// Resolve where a new upload goes, applying the duplicate strategy
    pub fn resolve(&self, request: &ResolveRequest<'_>) -> Result<ObjectLocation> {
        let strategy = self.effective_strategy(request);
        let file_name = self
            .names
            .generate(request.file_name, strategy, request.version);

        let location = self.build_location(
            request.client_id,
            request.environment,
            request.directory,
            &file_name,
        )?;

        tracing::debug!(
            bucket = location.bucket(),
            key = location.key(),
            strategy = %strategy,
            "Resolved upload location"
        );
        Ok(location)
    }

    /// Resolve an existing object's location without renaming
    pub fn locate(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
        file_name: &str,
    ) -> Result<ObjectLocation> {
        self.build_location(client_id, environment, directory, file_name)
    }

    /// Bucket and key prefix for listing a tenant's files
    pub fn listing_scope(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
    ) -> Result<(String, String)> {
        let bucket = self.checked_bucket(client_id, environment)?;
        let mut prefix = self.key_prefix(client_id, environment)?;

        let directory = sanitizer::sanitize_directory(directory)?;
        if !directory.is_empty() {
            prefix.push_str(&directory);
            prefix.push('/');
        }

        Ok((bucket, prefix))
    }

    /// Resolved bucket, rejected if it is not a usable bucket name
    pub fn checked_bucket(&self, client_id: &str, environment: Environment) -> Result<String> {
        check_client_id(client_id)?;
        let bucket = self.resolve_bucket(client_id, environment);
        validate_bucket_name(&bucket)?;
        Ok(bucket)
    }

    fn build_location(
        &self,
        client_id: &str,
        environment: Environment,
        directory: Option<&str>,
        file_name: &str,
    ) -> Result<ObjectLocation> {
        let bucket = self.checked_bucket(client_id, environment)?;
        let key = self.resolve_key(client_id, environment, directory, file_name)?;
        Ok(ObjectLocation::new(bucket, key))
    }
}

fn check_client_id(client_id: &str) -> Result<()> {
    if client_id.trim().is_empty() {
        tracing::warn!("Rejected blank client id");
        return Err(Error::InvalidClientId(client_id.to_string()));
    }
    Ok(())
}

/// Lowercase and collapse everything outside `[a-z0-9-]` into single hyphens
///
/// Leading and trailing hyphens are dropped. May return an empty string.
pub fn sanitize_for_bucket_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_for_path(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Check S3 bucket naming rules: 3-63 chars of `[a-z0-9-]`, alphanumeric at
/// both ends
pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    let bytes = bucket.as_bytes();
    let valid_chars = bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
    let valid_ends = matches!(
        (bytes.first(), bytes.last()),
        (Some(first), Some(last)) if first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric()
    );

    if (3..=63).contains(&bytes.len()) && valid_chars && valid_ends {
        Ok(())
    } else {
        Err(Error::InvalidBucketName(bucket.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathViolation;
    use jiff::civil::DateTime;
    use uuid::Uuid;

    struct FixedSource;

    impl SuffixSource for FixedSource {
        fn now(&self) -> DateTime {
            jiff::civil::date(2025, 1, 2).at(3, 4, 5, 0)
        }

        fn unique_id(&self) -> Uuid {
            Uuid::from_u128(0x0123_4567_89ab_4def_8123_456789abcdef)
        }
    }

    fn resolver(strategy: BucketStrategy) -> KeyResolver<FixedSource> {
        let config = ResolverConfig {
            bucket_strategy: strategy,
            ..Default::default()
        };
        KeyResolver::with_generator(config, FileNameGenerator::with_source(FixedSource)).unwrap()
    }

    #[test]
    fn test_sanitize_for_bucket_name() {
        assert_eq!(sanitize_for_bucket_name("Client_001"), "client-001");
        assert_eq!(sanitize_for_bucket_name("--Acme  Corp!!--"), "acme-corp");
        assert_eq!(sanitize_for_bucket_name("a..b"), "a-b");
        assert_eq!(sanitize_for_bucket_name("___"), "");
        assert_eq!(sanitize_for_bucket_name(""), "");
    }

    #[test]
    fn test_sanitize_for_bucket_name_is_idempotent() {
        for raw in ["Client_001", "--x--y--", "ÜBER tenant", "a/b\\c"] {
            let once = sanitize_for_bucket_name(raw);
            assert_eq!(sanitize_for_bucket_name(&once), once, "{raw:?}");
        }
    }

    #[test]
    fn test_sanitize_for_path() {
        assert_eq!(sanitize_for_path("client-001"), "client-001");
        assert_eq!(sanitize_for_path("acme/../x"), "acme____x");
        assert_eq!(sanitize_for_path("Tenant_7"), "Tenant_7");
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("client-001-storage").is_ok());
        assert!(validate_bucket_name("abc").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("-storage").is_err());
        assert!(validate_bucket_name("storage-").is_err());
        assert!(validate_bucket_name("Storage").is_err());
        assert!(validate_bucket_name("my_bucket").is_err());
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
        assert!(validate_bucket_name("").is_err());
    }

    #[test]
    fn test_resolve_bucket_per_strategy() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        assert_eq!(
            shared.resolve_bucket("Client_001", Environment::Development),
            "shared-storage"
        );

        let per_client = resolver(BucketStrategy::PerClient);
        assert_eq!(
            per_client.resolve_bucket("Client_001", Environment::Production),
            "client-001-storage"
        );

        let per_env = resolver(BucketStrategy::PerClientPerEnvironment);
        assert_eq!(
            per_env.resolve_bucket("Client_001", Environment::Staging),
            "client-001-staging-storage"
        );
    }

    #[test]
    fn test_resolve_bucket_is_stable_under_resanitization() {
        let per_client = resolver(BucketStrategy::PerClient);
        let bucket = per_client.resolve_bucket("Client_001", Environment::Test);
        let again = per_client.resolve_bucket("client-001", Environment::Test);
        assert_eq!(bucket, again);
    }

    #[test]
    fn test_resolve_key_per_strategy() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        assert_eq!(
            shared
                .resolve_key("client-001", Environment::Development, Some("documents"), "file.pdf")
                .unwrap(),
            "client-001/dev/documents/file.pdf"
        );

        let per_client = resolver(BucketStrategy::PerClient);
        assert_eq!(
            per_client
                .resolve_key("client-001", Environment::Development, Some("documents"), "file.pdf")
                .unwrap(),
            "dev/documents/file.pdf"
        );

        let per_env = resolver(BucketStrategy::PerClientPerEnvironment);
        assert_eq!(
            per_env
                .resolve_key("client-001", Environment::Development, Some("documents"), "file.pdf")
                .unwrap(),
            "documents/file.pdf"
        );
    }

    #[test]
    fn test_resolve_key_without_directory() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        for directory in [None, Some(""), Some("   ")] {
            assert_eq!(
                shared
                    .resolve_key("acme", Environment::Uat, directory, "a.txt")
                    .unwrap(),
                "acme/uat/a.txt"
            );
        }
    }

    #[test]
    fn test_resolve_key_sanitizes_client_for_path() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        assert_eq!(
            shared
                .resolve_key("../other", Environment::Development, None, "a.txt")
                .unwrap(),
            "___other/dev/a.txt"
        );
    }

    #[test]
    fn test_resolve_key_rejects_unsafe_input() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        assert!(matches!(
            shared.resolve_key("acme", Environment::Development, Some("../../x"), "a.txt"),
            Err(Error::InvalidPath(PathViolation::Traversal))
        ));
        assert!(matches!(
            shared.resolve_key("acme", Environment::Development, None, "x/a.txt"),
            Err(Error::InvalidFileName(PathViolation::ContainsSeparator))
        ));
        assert!(matches!(
            shared.resolve_key("acme", Environment::Development, None, "nul.txt"),
            Err(Error::InvalidFileName(PathViolation::ReservedName))
        ));
    }

    #[test]
    fn test_resolve_applies_duplicate_strategy() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);

        let request = ResolveRequest::new("acme", Environment::Development, "report.pdf")
            .directory(Some("reports/2025"));
        let location = shared.resolve(&request).unwrap();
        assert_eq!(location.bucket(), "shared-storage");
        assert_eq!(location.key(), "acme/dev/reports/2025/report_01234567.pdf");

        let request = request
            .strategy(Some(DuplicateFileStrategy::TimestampSuffix));
        assert_eq!(
            shared.resolve(&request).unwrap().key(),
            "acme/dev/reports/2025/report_20250102_030405.pdf"
        );

        let request = request
            .strategy(Some(DuplicateFileStrategy::Version))
            .version(Some(2));
        assert_eq!(
            shared.resolve(&request).unwrap().key(),
            "acme/dev/reports/2025/report_v2.pdf"
        );
    }

    #[test]
    fn test_resolve_sanitizes_generated_name() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        let request = ResolveRequest::new("acme", Environment::Development, "..notes.txt")
            .strategy(Some(DuplicateFileStrategy::Version))
            .version(Some(3));
        assert_eq!(shared.resolve(&request).unwrap().key(), "acme/dev/notes_v3.txt");
    }

    #[test]
    fn test_resolve_rejects_unusable_bucket() {
        let per_client = resolver(BucketStrategy::PerClient);
        let request = ResolveRequest::new("!!!", Environment::Development, "a.txt")
            .strategy(Some(DuplicateFileStrategy::Overwrite));
        assert!(matches!(
            per_client.resolve(&request),
            Err(Error::InvalidBucketName(_))
        ));
    }

    #[test]
    fn test_blank_client_id_is_rejected() {
        for strategy in [
            BucketStrategy::SharedWithPrefix,
            BucketStrategy::PerClient,
            BucketStrategy::PerClientPerEnvironment,
        ] {
            let key_resolver = resolver(strategy);
            for client in ["", "   "] {
                assert!(matches!(
                    key_resolver.locate(client, Environment::Development, None, "a.txt"),
                    Err(Error::InvalidClientId(_))
                ));
                let request = ResolveRequest::new(client, Environment::Development, "a.txt");
                assert!(matches!(
                    key_resolver.resolve(&request),
                    Err(Error::InvalidClientId(_))
                ));
                assert!(matches!(
                    key_resolver.listing_scope(client, Environment::Development, None),
                    Err(Error::InvalidClientId(_))
                ));
                assert!(matches!(
                    key_resolver.checked_bucket(client, Environment::Development),
                    Err(Error::InvalidClientId(_))
                ));
            }
        }
    }

    #[test]
    fn test_shared_keys_never_start_with_separator() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        let location = shared
            .locate("*", Environment::Development, None, "a.txt")
            .unwrap();
        assert_eq!(location.key(), "_/dev/a.txt");
    }

    #[test]
    fn test_locate_keeps_name() {
        let per_env = resolver(BucketStrategy::PerClientPerEnvironment);
        let location = per_env
            .locate("Acme", Environment::Production, None, "invoice.pdf")
            .unwrap();
        assert_eq!(location.bucket(), "acme-prod-storage");
        assert_eq!(location.key(), "invoice.pdf");
    }

    #[test]
    fn test_listing_scope() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        assert_eq!(
            shared
                .listing_scope("acme", Environment::Development, Some("docs/"))
                .unwrap(),
            ("shared-storage".to_string(), "acme/dev/docs/".to_string())
        );

        let per_env = resolver(BucketStrategy::PerClientPerEnvironment);
        assert_eq!(
            per_env
                .listing_scope("acme", Environment::Development, None)
                .unwrap(),
            ("acme-dev-storage".to_string(), String::new())
        );
    }

    #[test]
    fn test_config_validation() {
        let config = ResolverConfig {
            shared_bucket: "Bad_Bucket".into(),
            ..Default::default()
        };
        assert!(matches!(
            KeyResolver::new(config),
            Err(Error::InvalidBucketName(_))
        ));

        let config = ResolverConfig {
            bucket_strategy: BucketStrategy::PerClient,
            bucket_suffix: "Files!".into(),
            ..Default::default()
        };
        assert!(matches!(KeyResolver::new(config), Err(Error::Config(_))));

        // Shared bucket is irrelevant for per-client strategies
        let config = ResolverConfig {
            bucket_strategy: BucketStrategy::PerClient,
            shared_bucket: String::new(),
            ..Default::default()
        };
        assert!(KeyResolver::new(config).is_ok());
    }

    #[test]
    fn test_effective_strategy() {
        let shared = resolver(BucketStrategy::SharedWithPrefix);
        let request = ResolveRequest::new("acme", Environment::Development, "a.txt");
        assert_eq!(
            shared.effective_strategy(&request),
            DuplicateFileStrategy::UuidSuffix
        );
        let request = request.strategy(Some(DuplicateFileStrategy::Reject));
        assert_eq!(shared.effective_strategy(&request), DuplicateFileStrategy::Reject);
    }
}
