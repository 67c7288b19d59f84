//! Collision-avoiding file names
//!
//! Rewrites an upload's file name according to a [`DuplicateFileStrategy`].
//! Suffixes go between the base name and the extension, where the extension
//! starts at the last dot: `archive.tar.gz` becomes `archive.tar_v2.gz`.
//!
//! `UuidSuffix` keeps 8 hex characters (32 bits) of a random UUID, so two
//! uploads of the same name collide with probability around 2^-32.
//! `TimestampSuffix` has one-second resolution; uploads of the same name in the
//! same second get the same name.

use jiff::civil::DateTime;
use uuid::Uuid;

use crate::types::DuplicateFileStrategy;

/// strftime pattern for timestamp suffixes (`yyyyMMdd_HHmmss`)
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Number of UUID hex characters kept in a suffix
const SHORT_ID_LEN: usize = 8;

/// Clock and randomness behind generated suffixes
pub trait SuffixSource: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime;

    /// A fresh random identifier
    fn unique_id(&self) -> Uuid;
}

/// Local system clock and v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSource;

impl SuffixSource for SystemSource {
    fn now(&self) -> DateTime {
        jiff::Zoned::now().datetime()
    }

    fn unique_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Applies a duplicate-file strategy to file names
#[derive(Debug, Clone, Default)]
pub struct FileNameGenerator<S = SystemSource> {
    source: S,
}

impl FileNameGenerator<SystemSource> {
    /// Generator backed by the system clock and RNG
    pub fn new() -> Self {
        Self {
            source: SystemSource,
        }
    }
}

impl<S: SuffixSource> FileNameGenerator<S> {
    /// Generator backed by a custom source
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Produce the name to store `original` under
    ///
    /// `version` only matters for [`DuplicateFileStrategy::Version`]; `None`,
    /// 0 and 1 all mean the unversioned name.
    pub fn generate(
        &self,
        original: &str,
        strategy: DuplicateFileStrategy,
        version: Option<u32>,
    ) -> String {
        let (base, extension) = split_extension(original);

        match strategy {
            DuplicateFileStrategy::UuidSuffix => {
                let id = self.source.unique_id().simple().to_string();
                format!("{base}_{}{extension}", &id[..SHORT_ID_LEN])
            }
            DuplicateFileStrategy::TimestampSuffix => {
                let timestamp = self.source.now().strftime(TIMESTAMP_FORMAT);
                format!("{base}_{timestamp}{extension}")
            }
            DuplicateFileStrategy::Version => match version {
                Some(v) if v > 1 => format!("{base}_v{v}{extension}"),
                _ => format!("{base}{extension}"),
            },
            DuplicateFileStrategy::Overwrite | DuplicateFileStrategy::Reject => {
                original.to_string()
            }
        }
    }
}

/// Generate a name with the system clock and RNG
pub fn generate_file_name(
    original: &str,
    strategy: DuplicateFileStrategy,
    version: Option<u32>,
) -> String {
    FileNameGenerator::new().generate(original, strategy, version)
}

/// Split at the last dot into `(base, extension)`; the extension keeps its dot.
///
/// A leading dot does not start an extension, so `.env` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
