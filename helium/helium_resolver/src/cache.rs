//! Local artifact cache.
//!
//! The cache is a directory in the same layout as a
//! [`FileSystemRepository`](crate::repository::FileSystemRepository), so
//! cached artifacts are resolved without touching the remote repositories.
//!
//! Writes are atomic: each writer stages the bytes in a uniquely named temp
//! file next to the target and renames it into place. Concurrent resolvers
//! writing the same artifact race only on the rename, and the last writer
//! wins with identical content.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use helium_core::error::{ResolutionError, Result};

use crate::coordinate::ArtifactCoordinate;
use crate::repository::{DependencyDescriptor, FileSystemRepository};

/// Compute the lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify `data` against a published digest.
pub fn verify_checksum(coordinate: &ArtifactCoordinate, data: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(data);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(ResolutionError::ChecksumMismatch {
            artifact: coordinate.to_string(),
            expected: expected.trim().to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

/// On-disk artifact cache.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    layout: FileSystemRepository,
}

impl ArtifactCache {
    /// Open (lazily) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: FileSystemRepository::new("cache", root),
        }
    }

    /// The cache viewed as a repository.
    pub fn as_repository(&self) -> &FileSystemRepository {
        &self.layout
    }

    /// Cache root.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Where the artifact is cached.
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.layout.artifact_path(coordinate)
    }

    /// Whether the artifact is already cached.
    pub fn contains(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.artifact_path(coordinate).is_file()
    }

    /// Store an artifact and its sidecars.
    ///
    /// # Arguments
    ///
    /// * `coordinate` - The artifact being stored.
    /// * `data` - Artifact bytes.
    /// * `descriptor` - Dependency descriptor to cache alongside, if any.
    /// * `checksum` - Published checksum. When present the bytes are verified
    ///   before anything is written, and the checksum is cached too.
    ///
    /// # Returns
    ///
    /// The cached artifact path.
    pub fn store(
        &self,
        coordinate: &ArtifactCoordinate,
        data: &[u8],
        descriptor: Option<&DependencyDescriptor>,
        checksum: Option<&str>,
    ) -> Result<PathBuf> {
        if let Some(expected) = checksum {
            verify_checksum(coordinate, data, expected)?;
        }

        let path = self.artifact_path(coordinate);

        if let Some(descriptor) = descriptor {
            let json = serde_json::to_vec_pretty(descriptor)?;
            write_atomic(&self.layout.descriptor_path(coordinate), &json)?;
        }
        if let Some(expected) = checksum {
            write_atomic(
                &self.layout.checksum_path(coordinate),
                expected.trim().as_bytes(),
            )?;
        }
        // The artifact goes last: its presence marks the entry complete.
        write_atomic(&path, data)?;

        debug!(
            artifact = %coordinate,
            path = %path.display(),
            bytes = data.len(),
            verified = checksum.is_some(),
            "Cached artifact"
        );
        Ok(path)
    }
}

fn cache_error(path: &Path, e: impl ToString) -> helium_core::Error {
    ResolutionError::Cache {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
    .into()
}

/// Write `data` to `path` through a uniquely named temp file and a rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| cache_error(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| cache_error(path, "not a file path"))?;
    let temp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, uuid::Uuid::new_v4()));

    fs::write(&temp_path, data).map_err(|e| cache_error(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        cache_error(path, e)
    })?;

    Ok(())
}
