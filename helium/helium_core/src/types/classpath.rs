//! Classpaths.
//!
//! A classpath is the ordered, duplicate-free list of local artifact files
//! produced by dependency resolution. Two classpaths are equal when they
//! list the same files in the same order; isolation environments are
//! cached under that structural identity.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ordered sequence of local artifact locations.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Classpath {
    entries: Arc<[PathBuf]>,
}

impl Classpath {
    /// Build a classpath, keeping the first occurrence of every path.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen = HashSet::new();
        let entries: Vec<PathBuf> = paths
            .into_iter()
            .map(Into::into)
            .filter(|path| seen.insert(path.clone()))
            .collect();

        Self {
            entries: entries.into(),
        }
    }

    /// The artifact files, in load order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Iterate over the artifact files.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Number of artifacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the classpath is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the classpath lists this file.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }
}

impl fmt::Debug for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .entries
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        f.write_str(&joined)
    }
}
