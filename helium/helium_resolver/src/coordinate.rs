//! Artifact coordinates.
//!
//! A coordinate with at least three `:`-separated parts is a repository
//! coordinate, `group:artifact:version[:extension]`. Anything else is a
//! path to a local artifact file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use helium_core::error::ResolutionError;

/// Extension used when a repository coordinate does not name one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// A parsed artifact coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Coordinate {
    /// An artifact published in a repository.
    Repository(ArtifactCoordinate),

    /// A file on the local filesystem.
    Local(PathBuf),
}

impl FromStr for Coordinate {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ResolutionError::InvalidCoordinate(s.to_string()));
        }

        if trimmed.split(':').count() >= 3 {
            Ok(Self::Repository(trimmed.parse()?))
        } else {
            Ok(Self::Local(PathBuf::from(trimmed)))
        }
    }
}

/// `group:artifact:version[:extension]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinate {
    /// Group id, dot separated.
    pub group: String,

    /// Artifact id.
    pub artifact: String,

    /// Version string.
    pub version: String,

    /// File extension.
    pub extension: String,
}

impl ArtifactCoordinate {
    /// Create a coordinate with the default extension.
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Set the extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Version-less identity, `group:artifact`.
    ///
    /// Conflicts and exclusions are decided on this key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    /// File name of the artifact, `artifact-version.extension`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.artifact, self.version, self.extension)
    }

    /// Directory of the artifact relative to a repository root.
    pub fn directory(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        for segment in self.group.split('.') {
            dir.push(segment);
        }
        dir.push(&self.artifact);
        dir.push(&self.version);
        dir
    }

    /// Path of the artifact relative to a repository root.
    pub fn relative_path(&self) -> PathBuf {
        self.directory().join(self.file_name())
    }

    /// Path of a sidecar file next to the artifact, `artifact-version<suffix>`.
    pub fn sidecar_path(&self, root: &Path, suffix: &str) -> PathBuf {
        root.join(self.directory())
            .join(format!("{}-{}{}", self.artifact, self.version, suffix))
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ResolutionError::InvalidCoordinate(s.to_string());

        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        match parts.as_slice() {
            [group, artifact, version] => Ok(Self::new(*group, *artifact, *version)),
            [group, artifact, version, extension] => {
                Ok(Self::new(*group, *artifact, *version).with_extension(*extension))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if self.extension != DEFAULT_EXTENSION {
            write!(f, ":{}", self.extension)?;
        }
        Ok(())
    }
}
