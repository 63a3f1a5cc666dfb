//! Version utilities.
//!
//! Artifact versions in the wild are rarely strict semver: `1.0`, `2`,
//! `1.2.3-SNAPSHOT` and `4.1.0.Final` all occur. [`ArtifactVersion`] parses
//! them leniently and orders them the way repositories usually do.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Error parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError {
    /// The invalid version string.
    pub version: String,

    /// The reason for the error.
    pub reason: String,
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid version '{}': {}", self.version, self.reason)
    }
}

impl std::error::Error for VersionParseError {}

/// A leniently parsed artifact version.
///
/// Leading dot-separated numeric components form the release part; the
/// remainder (after `-` or a non-numeric dotted component) is the
/// qualifier. Missing trailing components compare as zero, and a version
/// without a qualifier is newer than the same release with one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactVersion {
    /// Numeric release components.
    pub release: Vec<u64>,

    /// Qualifier such as `SNAPSHOT` or `beta.2`.
    pub qualifier: Option<String>,

    raw: String,
}

impl ArtifactVersion {
    /// Original text of the version.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check if this version carries a qualifier.
    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    fn component(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for ArtifactVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArtifactVersion {}

impl PartialOrd for ArtifactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArtifactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => {}
                ordering => return ordering,
            }
        }

        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        }
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ArtifactVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = |reason: &str| VersionParseError {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(error("Empty version"));
        }

        let (head, mut qualifier) = match trimmed.split_once('-') {
            Some((head, rest)) => (head, Some(rest.to_string())),
            None => (trimmed, None),
        };

        let mut release = Vec::new();
        let mut parts = head.split('.');
        for part in parts.by_ref() {
            match part.parse::<u64>() {
                Ok(n) => release.push(n),
                Err(_) => {
                    let rest: Vec<&str> = std::iter::once(part).chain(parts.by_ref()).collect();
                    let dotted = rest.join(".");
                    qualifier = Some(match qualifier {
                        Some(q) => format!("{}-{}", dotted, q),
                        None => dotted,
                    });
                    break;
                }
            }
        }

        if release.is_empty() {
            return Err(error("Missing numeric release"));
        }
        if matches!(&qualifier, Some(q) if q.is_empty()) {
            return Err(error("Empty qualifier"));
        }

        Ok(Self {
            release,
            qualifier,
            raw: trimmed.to_string(),
        })
    }
}
