//! Loader configuration.
//!
//! Handles loading and validating the configuration of the application
//! loader. Every field has a default, so an empty JSON object (or no file
//! at all) is a valid configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use helium_core::error::{Error, Result};
use helium_resolver::{ConflictPolicy, FileSystemRepository, Repository, RepositoryResolver};

/// A repository to resolve artifacts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository id
    pub id: String,

    /// Repository root directory
    pub path: PathBuf,
}

/// Application loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Local artifact cache
    #[serde(default = "default_cache_directory")]
    pub cache_directory: PathBuf,

    /// Repositories, searched in order after the cache
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,

    /// Directory relative local artifact paths are resolved against
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,

    /// Version conflict policy
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Whether fetched artifacts are checked against published checksums
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,

    /// Upper bound on one load, in milliseconds
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("./local-repo")
}

fn default_local_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_verify_checksums() -> bool {
    true
}

fn default_load_timeout_ms() -> u64 {
    60_000
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_directory: default_cache_directory(),
            repositories: Vec::new(),
            local_root: default_local_root(),
            conflict_policy: ConflictPolicy::default(),
            verify_checksums: default_verify_checksums(),
            load_timeout_ms: default_load_timeout_ms(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults with a warning; a file that
    /// cannot be read or parsed is an error.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = LoaderConfig::default();

        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());

            if !path.exists() {
                warn!("Configuration file not found: {}", path.display());
                return Ok(config);
            }

            let content = fs::read_to_string(path).await.map_err(|e| {
                Error::Config(format!(
                    "Failed to read configuration file {}: {}",
                    path.display(),
                    e
                ))
            })?;

            config = serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!(
                    "Failed to parse configuration file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        } else {
            info!("No configuration file specified, using defaults");
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_directory.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.load_timeout_ms == 0 {
            return Err(Error::Config("Load timeout cannot be zero".to_string()));
        }

        let mut ids = HashSet::new();
        for repository in &self.repositories {
            if repository.id.is_empty() {
                return Err(Error::Config("Repository id cannot be empty".to_string()));
            }
            if !ids.insert(repository.id.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate repository id '{}'",
                    repository.id
                )));
            }
            if repository.path.as_os_str().is_empty() {
                return Err(Error::Config(format!(
                    "Repository '{}' has no path",
                    repository.id
                )));
            }
        }

        if !self.verify_checksums {
            warn!("Checksum verification is disabled");
        }

        Ok(())
    }

    /// Merge with another configuration.
    ///
    /// Values in `other` that differ from the defaults win; repositories
    /// are appended unless one with the same id is already present.
    pub fn merge(&mut self, other: LoaderConfig) {
        if other.cache_directory != default_cache_directory() {
            self.cache_directory = other.cache_directory;
        }

        for repository in other.repositories {
            if !self.repositories.iter().any(|r| r.id == repository.id) {
                self.repositories.push(repository);
            }
        }

        if other.local_root != default_local_root() {
            self.local_root = other.local_root;
        }

        if other.conflict_policy != ConflictPolicy::default() {
            self.conflict_policy = other.conflict_policy;
        }

        if !other.verify_checksums {
            self.verify_checksums = false;
        }

        if other.load_timeout_ms != default_load_timeout_ms() {
            self.load_timeout_ms = other.load_timeout_ms;
        }
    }

    /// Load timeout as a duration.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Build the resolver this configuration describes.
    pub fn resolver(&self) -> RepositoryResolver {
        let repositories = self
            .repositories
            .iter()
            .map(|r| Arc::new(FileSystemRepository::new(&r.id, &r.path)) as Arc<dyn Repository>)
            .collect();

        RepositoryResolver::new()
            .with_repositories(repositories)
            .with_policy(self.conflict_policy)
            .with_local_root(&self.local_root)
            .with_checksum_verification(self.verify_checksums)
    }
}
