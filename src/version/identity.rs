//! Numeric version identity and the archive paths derived from it

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::{LOCK_FILE_NAME, MANIFEST_FILE_NAME, VERSION_DIR_PREFIX};

/// Release tags are exactly three dot-separated numbers: `1.2.3`
static RELEASE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());

/// Returns true if `raw` is a strict `N.N.N` release version
pub fn is_release_version(raw: &str) -> bool {
    RELEASE_VERSION_RE.is_match(raw)
}

/// A dot-separated numeric version, ordered component-wise
///
/// Equality is on the raw string; the optional timestamp does not take part
/// in comparisons. Components are kept as digit strings so that numbers of
/// any width compare by value.
#[derive(Debug, Clone)]
pub struct VersionIdentity {
    number: String,
    parts: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Drops leading zeros; anything that is not all digits becomes `0`
fn normalize_part(part: &str) -> String {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return "0".to_string();
    }
    match part.trim_start_matches('0') {
        "" => "0".to_string(),
        digits => digits.to_string(),
    }
}

/// Normalized digit strings order by length first, then lexically
fn compare_parts(left: &[String], right: &[String]) -> Ordering {
    left.iter()
        .map(|part| (part.len(), part.as_str()))
        .cmp(right.iter().map(|part| (part.len(), part.as_str())))
}

impl VersionIdentity {
    /// Builds an identity from any string.
    ///
    /// Components that are not numbers count as 0, so ordering is only
    /// meaningful for strings accepted by [`is_release_version`].
    pub fn new(number: impl Into<String>) -> Self {
        let number = number.into();
        let parts = number.split('.').map(normalize_part).collect();

        Self {
            number,
            parts,
            updated_at: None,
        }
    }

    /// Builds an identity only for strict `N.N.N` versions
    pub fn parse(raw: &str) -> Option<Self> {
        is_release_version(raw).then(|| Self::new(raw))
    }

    /// Parses an archive directory name such as `v1.2.3`
    pub fn from_dir_name(name: &str) -> Option<Self> {
        name.strip_prefix(VERSION_DIR_PREFIX).and_then(Self::parse)
    }

    /// Returns a copy carrying the given timestamp
    pub fn with_updated_at(self, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(updated_at),
            ..self
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Numeric components without leading zeros
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn dir_name(&self) -> String {
        format!("{}{}", VERSION_DIR_PREFIX, self.number)
    }

    pub fn directory(&self, archive_root: &Path) -> PathBuf {
        archive_root.join(self.dir_name())
    }

    pub fn manifest_path(&self, archive_root: &Path) -> PathBuf {
        self.directory(archive_root).join(MANIFEST_FILE_NAME)
    }

    pub fn lock_path(&self, archive_root: &Path) -> PathBuf {
        self.directory(archive_root).join(LOCK_FILE_NAME)
    }

    /// True only when both the manifest and the lock are regular files
    pub fn exists_locally(&self, archive_root: &Path) -> bool {
        self.manifest_path(archive_root).is_file() && self.lock_path(archive_root).is_file()
    }
}

impl PartialEq for VersionIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for VersionIdentity {}

impl PartialOrd for VersionIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_parts(&self.parts, &other.parts)
            .then_with(|| self.number.cmp(&other.number))
    }
}

impl std::fmt::Display for VersionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.number)
    }
}

/// Sorts version strings ascending by numeric component order
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by_cached_key(|v| VersionIdentity::new(v.as_str()));
}

/// Returns the numerically highest version, if any
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .max_by_key(|v| VersionIdentity::new(*v))
}
