//! Artifact repositories.
//!
//! A repository maps repository coordinates to artifact bytes and, when
//! published, a dependency descriptor and a checksum. The network transport
//! of remote repositories is out of scope here; [`FileSystemRepository`]
//! serves any directory in the usual `group/artifact/version` layout, which
//! covers local mirrors and the resolver's own cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::trace;

use helium_core::error::{ResolutionError, Result};

use crate::coordinate::ArtifactCoordinate;

/// Suffix of the dependency descriptor sidecar.
pub const DESCRIPTOR_SUFFIX: &str = ".deps.json";

/// Suffix appended to the artifact file name for its checksum sidecar.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Direct dependencies published next to an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// Coordinates of the direct dependencies, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// `group:artifact` keys excluded from this artifact's subtree.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Source of published artifacts.
pub trait Repository: Send + Sync {
    /// Repository identity, for diagnostics.
    fn id(&self) -> &str;

    /// Whether the repository publishes this artifact.
    fn contains(&self, coordinate: &ArtifactCoordinate) -> bool;

    /// Read the artifact bytes.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` if the artifact is published here.
    /// * `Ok(None)` if it is not.
    /// * `Err` if it exists but could not be read.
    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<Option<Vec<u8>>>;

    /// Read the dependency descriptor, if one is published.
    fn descriptor(&self, coordinate: &ArtifactCoordinate) -> Result<Option<DependencyDescriptor>>;

    /// Read the published SHA-256 checksum (lowercase hex), if any.
    fn checksum(&self, coordinate: &ArtifactCoordinate) -> Result<Option<String>>;
}

/// Repository backed by a directory.
#[derive(Debug, Clone)]
pub struct FileSystemRepository {
    id: String,
    root: PathBuf,
}

impl FileSystemRepository {
    /// Create a repository rooted at `root`.
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact lives (or would live) in this repository.
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root.join(coordinate.relative_path())
    }

    /// Where the dependency descriptor lives.
    pub fn descriptor_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        coordinate.sidecar_path(&self.root, DESCRIPTOR_SUFFIX)
    }

    /// Where the checksum lives.
    pub fn checksum_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        let mut name = self.artifact_path(coordinate).into_os_string();
        name.push(CHECKSUM_SUFFIX);
        PathBuf::from(name)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ResolutionError::Cache {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()),
    }
}

impl Repository for FileSystemRepository {
    fn id(&self) -> &str {
        &self.id
    }

    fn contains(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.artifact_path(coordinate).is_file()
    }

    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<Option<Vec<u8>>> {
        let path = self.artifact_path(coordinate);
        trace!(repository = %self.id, path = %path.display(), "Reading artifact");
        read_optional(&path)
    }

    fn descriptor(&self, coordinate: &ArtifactCoordinate) -> Result<Option<DependencyDescriptor>> {
        let Some(bytes) = read_optional(&self.descriptor_path(coordinate))? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| {
                ResolutionError::InvalidDescriptor {
                    artifact: coordinate.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    fn checksum(&self, coordinate: &ArtifactCoordinate) -> Result<Option<String>> {
        let Some(bytes) = read_optional(&self.checksum_path(coordinate))? else {
            return Ok(None);
        };

        // `sha256sum` output is "<hex>  <file name>"; keep the digest only.
        let text = String::from_utf8_lossy(&bytes);
        Ok(text
            .split_whitespace()
            .next()
            .map(|digest| digest.to_ascii_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn publish(root: &Path, coordinate: &ArtifactCoordinate, bytes: &[u8], deps: Option<&str>) {
        let repo = FileSystemRepository::new("test", root);
        let path = repo.artifact_path(coordinate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        if let Some(deps) = deps {
            fs::write(repo.descriptor_path(coordinate), deps).unwrap();
        }
    }

    #[test]
    fn test_fetch_and_descriptor() {
        let dir = TempDir::new().unwrap();
        let coordinate = ArtifactCoordinate::new("org.example", "plot", "1.0");
        publish(
            dir.path(),
            &coordinate,
            b"plot",
            Some(r#"{"dependencies": ["org.example:core:2.0"], "exclusions": ["org.bad:x"]}"#),
        );

        let repo = FileSystemRepository::new("local", dir.path());
        assert!(repo.contains(&coordinate));
        assert_eq!(repo.fetch(&coordinate).unwrap().unwrap(), b"plot");

        let descriptor = repo.descriptor(&coordinate).unwrap().unwrap();
        assert_eq!(descriptor.dependencies, vec!["org.example:core:2.0"]);
        assert_eq!(descriptor.exclusions, vec!["org.bad:x"]);
        assert!(repo.checksum(&coordinate).unwrap().is_none());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let repo = FileSystemRepository::new("local", dir.path());
        let coordinate = ArtifactCoordinate::new("org.example", "missing", "1.0");
        assert!(!repo.contains(&coordinate));
        assert!(repo.fetch(&coordinate).unwrap().is_none());
        assert!(repo.descriptor(&coordinate).unwrap().is_none());
    }

    #[test]
    fn test_invalid_descriptor() {
        let dir = TempDir::new().unwrap();
        let coordinate = ArtifactCoordinate::new("org.example", "broken", "1.0");
        publish(dir.path(), &coordinate, b"x", Some("not json"));

        let repo = FileSystemRepository::new("local", dir.path());
        let err = repo.descriptor(&coordinate).unwrap_err();
        assert!(err.to_string().contains("Invalid dependency descriptor"));
    }

    #[test]
    fn test_checksum_sidecar_format() {
        let dir = TempDir::new().unwrap();
        let coordinate = ArtifactCoordinate::new("org.example", "plot", "1.0");
        publish(dir.path(), &coordinate, b"plot", None);

        let repo = FileSystemRepository::new("local", dir.path());
        fs::write(repo.checksum_path(&coordinate), "ABCDEF  plot-1.0.jar\n").unwrap();
        assert_eq!(repo.checksum(&coordinate).unwrap().as_deref(), Some("abcdef"));
    }
}
