//! Path sanitization
//!
//! Object stores expose a flat key namespace and enforce no directory
//! boundaries of their own, so every caller-supplied directory and file name
//! passes through here before it becomes part of a key.
//!
//! `sanitize_path` runs its checks in a fixed order and stops at the first
//! failure:
//!
//! 1. trim, reject empty input
//! 2. reject `..` segments next to a separator
//! 3. reject absolute paths (`/x`, `\x`, `C:...`)
//! 4. reject `< > : " | ? *` and ASCII control codes
//! 5. normalize (drop `.` and empty segments, fold `..`, join with `/`)
//! 6. reject results that still climb above the root
//! 7. reject a reserved device name as the final component

use std::fmt;

use crate::error::{Error, PathViolation, Result};

/// Characters that are never allowed in a path or file name
const ILLEGAL_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// Device names that cannot be used as a file stem on Windows
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A relative, `/`-separated path that passed [`sanitize_path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SanitizedPath(String);

impl SanitizedPath {
    /// Borrow the sanitized path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the sanitized path
    pub fn into_string(self) -> String {
        self.0
    }

    /// Final path component
    pub fn file_name(&self) -> &str {
        last_component(&self.0)
    }
}

impl AsRef<str> for SanitizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SanitizedPath> for String {
    fn from(path: SanitizedPath) -> Self {
        path.0
    }
}

/// Sanitize an untrusted relative path
pub fn sanitize_path(raw: &str) -> Result<SanitizedPath> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(reject_path(raw, PathViolation::Empty));
    }

    if contains_traversal(trimmed) {
        return Err(reject_path(raw, PathViolation::Traversal));
    }

    if is_absolute(trimmed) {
        return Err(reject_path(raw, PathViolation::Absolute));
    }

    if has_illegal_chars(trimmed) {
        return Err(reject_path(raw, PathViolation::IllegalCharacters));
    }

    let normalized = normalize(trimmed);
    if normalized.is_empty() {
        return Err(reject_path(raw, PathViolation::Empty));
    }

    if normalized.starts_with("..") || normalized.split('/').any(|segment| segment == "..") {
        return Err(reject_path(raw, PathViolation::EscapesBase));
    }

    // normalize() only emits '/' and never a leading separator; these are no-ops
    // kept so the output contract does not depend on that detail.
    let unified = normalized.replace('\\', "/");
    let relative = unified.trim_start_matches('/');

    if is_reserved_name(last_component(relative)) {
        return Err(reject_path(raw, PathViolation::ReservedName));
    }

    Ok(SanitizedPath(relative.to_string()))
}

/// Sanitize an optional directory
///
/// Missing or blank directories yield an empty string.
pub fn sanitize_directory(raw: Option<&str>) -> Result<String> {
    let Some(raw) = raw.filter(|d| !d.trim().is_empty()) else {
        return Ok(String::new());
    };

    let mut sanitized = sanitize_path(raw)?.into_string();
    if sanitized.ends_with('/') {
        sanitized.pop();
    }
    Ok(sanitized)
}

/// Sanitize a bare file name
///
/// Leading and trailing dots and spaces are stripped rather than rejected.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(reject_file_name(raw, PathViolation::Empty));
    }

    if trimmed.contains(is_separator) {
        return Err(reject_file_name(raw, PathViolation::ContainsSeparator));
    }

    if has_illegal_chars(trimmed) {
        return Err(reject_file_name(raw, PathViolation::IllegalCharacters));
    }

    if is_reserved_name(trimmed) {
        return Err(reject_file_name(raw, PathViolation::ReservedName));
    }

    let stripped = trimmed.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if stripped.is_empty() {
        return Err(reject_file_name(
            raw,
            PathViolation::EmptyAfterSanitization,
        ));
    }

    // "..CON.txt" only reveals its stem after stripping
    if is_reserved_name(stripped) {
        return Err(reject_file_name(raw, PathViolation::ReservedName));
    }

    if stripped.len() != trimmed.len() {
        tracing::debug!(raw = ?raw, sanitized = stripped, "Stripped leading/trailing dots or spaces");
    }

    Ok(stripped.to_string())
}

/// Join an optional directory and a file name, sanitizing both
pub fn build_path(directory: Option<&str>, file_name: &str) -> Result<String> {
    let directory = sanitize_directory(directory)?;
    let file_name = sanitize_file_name(file_name)?;

    if directory.is_empty() {
        Ok(file_name)
    } else {
        Ok(format!("{directory}/{file_name}"))
    }
}

/// Whether [`sanitize_path`] would accept the input
pub fn is_valid_path(raw: &str) -> bool {
    sanitize_path(raw).is_ok()
}

fn reject_path(raw: &str, violation: PathViolation) -> Error {
    // Debug formatting escapes control characters, keeping log lines intact
    tracing::warn!(raw = ?raw, reason = %violation, "Rejected path");
    Error::InvalidPath(violation)
}

fn reject_file_name(raw: &str, violation: PathViolation) -> Error {
    tracing::warn!(raw = ?raw, reason = %violation, "Rejected file name");
    Error::InvalidFileName(violation)
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn contains_traversal(path: &str) -> bool {
    path.contains(is_separator) && path.split(is_separator).any(|s| s.trim() == "..")
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with(is_separator) {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn has_illegal_chars(path: &str) -> bool {
    path.chars()
        .any(|c| ILLEGAL_CHARS.contains(&c) || (c as u32) < 0x20)
}

/// Collapse `.` and empty segments and fold `..` into its parent.
///
/// Segments are trimmed so that re-sanitizing the output is a no-op. A `..`
/// with nothing left to fold is kept for the caller to reject.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(is_separator).map(str::trim) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn last_component(path: &str) -> &str {
    path.rsplit(is_separator).next().unwrap_or(path)
}

/// Reserved device names match case-insensitively on the stem before the
/// first dot, so `con.tar.gz` is as reserved as `CON`.
///
/// This is stricter than stripping only the last extension, which would
/// compare `con.tar` and let `con.tar.gz` through. Windows itself treats
/// any name whose first segment is a device name as the device.
fn is_reserved_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_violation(raw: &str) -> PathViolation {
        match sanitize_path(raw) {
            Err(Error::InvalidPath(v)) => v,
            other => panic!("expected InvalidPath for {raw:?}, got {other:?}"),
        }
    }

    fn file_violation(raw: &str) -> PathViolation {
        match sanitize_file_name(raw) {
            Err(Error::InvalidFileName(v)) => v,
            other => panic!("expected InvalidFileName for {raw:?}, got {other:?}"),
        }
    }

    fn all_reserved_stems() -> Vec<String> {
        let mut stems: Vec<String> = ["CON", "PRN", "AUX", "NUL"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for n in 1..=9 {
            stems.push(format!("COM{n}"));
            stems.push(format!("LPT{n}"));
        }
        stems
    }

    #[test]
    fn test_sanitize_path_valid() {
        assert_eq!(
            sanitize_path("documents/file.pdf").unwrap().as_str(),
            "documents/file.pdf"
        );
        assert_eq!(
            sanitize_path("2025/invoices/invoice-001.pdf").unwrap().as_str(),
            "2025/invoices/invoice-001.pdf"
        );
    }

    #[test]
    fn test_sanitize_path_unifies_backslashes() {
        assert_eq!(
            sanitize_path("documents\\file.pdf").unwrap().as_str(),
            "documents/file.pdf"
        );
    }

    #[test]
    fn test_sanitize_path_normalizes_segments() {
        assert_eq!(sanitize_path("./docs/./a.txt").unwrap().as_str(), "docs/a.txt");
        assert_eq!(sanitize_path("docs//a.txt").unwrap().as_str(), "docs/a.txt");
        assert_eq!(sanitize_path("docs/reports/").unwrap().as_str(), "docs/reports");
        assert_eq!(sanitize_path("  docs/a.txt  ").unwrap().as_str(), "docs/a.txt");
    }

    #[test]
    fn test_sanitize_path_blocks_traversal() {
        for raw in [
            "../../../etc/passwd",
            "../../passwords.txt",
            "docs/../../../sensitive",
            "folder/../../etc/passwd",
            "a/..",
            "a\\..\\b",
            "..\\windows",
            "docs/.. /secret",
        ] {
            assert_eq!(path_violation(raw), PathViolation::Traversal, "{raw:?}");
        }
    }

    #[test]
    fn test_sanitize_path_blocks_escape_after_normalization() {
        assert_eq!(path_violation(".."), PathViolation::EscapesBase);
        assert_eq!(path_violation("..hidden"), PathViolation::EscapesBase);
    }

    #[test]
    fn test_sanitize_path_blocks_absolute_paths() {
        for raw in [
            "/etc/passwd",
            "/absolute/path",
            "C:\\Windows\\System32",
            "C:/Windows/System32",
            "c:relative",
            "\\\\server\\share",
            "/usr/local/bin",
        ] {
            assert_eq!(path_violation(raw), PathViolation::Absolute, "{raw:?}");
        }
    }

    #[test]
    fn test_sanitize_path_blocks_illegal_characters() {
        for raw in [
            "file<name>.txt",
            "file>name.txt",
            "file:name.txt",
            "file|name.txt",
            "file?name.txt",
            "file*name.txt",
            "file\"name.txt",
            "file\u{0}name.txt",
            "docs/a\u{1b}[31m.txt",
            "line\nbreak",
        ] {
            assert_eq!(
                path_violation(raw),
                PathViolation::IllegalCharacters,
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_sanitize_path_blocks_reserved_names() {
        for stem in all_reserved_stems() {
            for candidate in [
                stem.clone(),
                format!("{stem}.txt"),
                format!("docs/{}.pdf", stem.to_lowercase()),
            ] {
                assert_eq!(
                    path_violation(&candidate),
                    PathViolation::ReservedName,
                    "{candidate:?}"
                );
            }
        }
        // Reserved stems are fine as directory names or substrings
        assert!(sanitize_path("CON/file.txt").is_ok());
        assert!(sanitize_path("console.txt").is_ok());
        assert!(sanitize_path("COM10.txt").is_ok());
    }

    #[test]
    fn test_sanitize_path_rejects_empty() {
        assert_eq!(path_violation(""), PathViolation::Empty);
        assert_eq!(path_violation("   "), PathViolation::Empty);
        assert_eq!(path_violation("./."), PathViolation::Empty);
    }

    #[test]
    fn test_sanitize_path_is_idempotent() {
        for raw in [
            "documents/file.pdf",
            "documents\\file.pdf",
            "./a/./b/c.txt",
            "a//b///c",
            "  spaced / name .txt ",
            "./ x/y",
            "reports/2025/",
            "a/b/../c",
        ] {
            let Ok(once) = sanitize_path(raw) else {
                continue;
            };
            let twice = sanitize_path(once.as_str()).unwrap();
            assert_eq!(once, twice, "{raw:?}");
        }
    }

    #[test]
    fn test_sanitize_directory() {
        assert_eq!(
            sanitize_directory(Some("documents/invoices")).unwrap(),
            "documents/invoices"
        );
        assert_eq!(
            sanitize_directory(Some("documents/invoices/")).unwrap(),
            "documents/invoices"
        );
        assert_eq!(sanitize_directory(None).unwrap(), "");
        assert_eq!(sanitize_directory(Some("")).unwrap(), "");
        assert_eq!(sanitize_directory(Some("   ")).unwrap(), "");
        assert!(matches!(
            sanitize_directory(Some("../up")),
            Err(Error::InvalidPath(PathViolation::Traversal))
        ));
    }

    #[test]
    fn test_sanitize_file_name_valid() {
        assert_eq!(sanitize_file_name("document.pdf").unwrap(), "document.pdf");
        assert_eq!(sanitize_file_name("archive.tar.gz").unwrap(), "archive.tar.gz");
    }

    #[test]
    fn test_sanitize_file_name_strips_dots_and_spaces() {
        assert_eq!(sanitize_file_name(" file.pdf ").unwrap(), "file.pdf");
        assert_eq!(sanitize_file_name("..file.pdf").unwrap(), "file.pdf");
        assert_eq!(sanitize_file_name("file.pdf...").unwrap(), "file.pdf");
        assert_eq!(sanitize_file_name(". .hidden").unwrap(), "hidden");
    }

    #[test]
    fn test_sanitize_file_name_rejects_separators() {
        for raw in ["docs/file.pdf", "docs\\file.pdf", "../file.pdf"] {
            assert_eq!(file_violation(raw), PathViolation::ContainsSeparator, "{raw:?}");
        }
    }

    #[test]
    fn test_sanitize_file_name_rejects_illegal_characters() {
        assert_eq!(file_violation("a<b.txt"), PathViolation::IllegalCharacters);
        assert_eq!(file_violation("a\u{7}.txt"), PathViolation::IllegalCharacters);
    }

    #[test]
    fn test_sanitize_file_name_rejects_reserved_names() {
        for stem in all_reserved_stems() {
            assert_eq!(file_violation(&stem), PathViolation::ReservedName);
            assert_eq!(
                file_violation(&format!("{}.docx", stem.to_lowercase())),
                PathViolation::ReservedName
            );
        }
        assert_eq!(file_violation("..CON.txt"), PathViolation::ReservedName);
        assert_eq!(file_violation("con.tar.gz"), PathViolation::ReservedName);
    }

    #[test]
    fn test_sanitize_file_name_rejects_empty() {
        assert_eq!(file_violation(""), PathViolation::Empty);
        assert_eq!(file_violation("  "), PathViolation::Empty);
        assert_eq!(file_violation("..."), PathViolation::EmptyAfterSanitization);
        assert_eq!(file_violation(". ."), PathViolation::EmptyAfterSanitization);
    }

    #[test]
    fn test_build_path() {
        assert_eq!(
            build_path(Some("documents"), "file.pdf").unwrap(),
            "documents/file.pdf"
        );
        assert_eq!(
            build_path(Some("documents/"), " file.pdf").unwrap(),
            "documents/file.pdf"
        );
        assert_eq!(build_path(None, "file.pdf").unwrap(), "file.pdf");
        assert_eq!(build_path(Some("  "), "file.pdf").unwrap(), "file.pdf");
        assert!(build_path(Some("/etc"), "passwd").is_err());
        assert!(build_path(Some("docs"), "a/b.pdf").is_err());
    }

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path("documents/file.pdf"));
        assert!(!is_valid_path("../etc/passwd"));
        assert!(!is_valid_path("/etc/passwd"));
        assert!(!is_valid_path("NUL"));
        assert!(!is_valid_path(""));
    }

    #[test]
    fn test_sanitized_path_accessors() {
        let path = sanitize_path("docs/report.pdf").unwrap();
        assert_eq!(path.file_name(), "report.pdf");
        assert_eq!(path.to_string(), "docs/report.pdf");
        let owned: String = path.into();
        assert_eq!(owned, "docs/report.pdf");
    }
}
