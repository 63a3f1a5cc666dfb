//! Transitive dependency resolution.
//!
//! [`RepositoryResolver`] walks the dependency graph breadth-first from the
//! requested coordinates. The classpath lists artifacts in the order they
//! were first visited, root coordinates first, and every artifact it lists
//! has been copied into the local cache.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use helium_core::error::{ResolutionError, Result};
use helium_core::types::Classpath;
use helium_core::utils::ArtifactVersion;

use crate::cache::ArtifactCache;
use crate::coordinate::{ArtifactCoordinate, Coordinate};
use crate::repository::Repository;

/// Turns artifact coordinates into a classpath of local files.
pub trait DependencyResolver: Send + Sync {
    /// Resolve `coordinates` and their transitive dependencies.
    ///
    /// # Arguments
    ///
    /// * `coordinates` - Requested coordinates, in declaration order.
    /// * `cache_dir` - Local artifact cache. Missing artifacts are written
    ///   here; concurrent calls for the same coordinates are safe.
    ///
    /// # Returns
    ///
    /// * `Ok(Classpath)` - Ordered, duplicate-free local artifact files.
    /// * `Err(Error::Resolution(_))` if a coordinate cannot be found, a
    ///   conflict cannot be settled, or cache I/O fails.
    fn resolve(&self, coordinates: &[String], cache_dir: &Path) -> Result<Classpath>;
}

/// How to settle two requested versions of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// The version closest to the root wins.
    #[default]
    Nearest,

    /// The highest version wins.
    Highest,

    /// Any conflict fails resolution.
    Fail,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Highest => write!(f, "highest"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "highest" => Ok(Self::Highest),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown conflict policy '{}'", other)),
        }
    }
}

/// Work item of the breadth-first walk.
enum Pending {
    Local(PathBuf),
    Artifact {
        coordinate: ArtifactCoordinate,
        exclusions: Arc<BTreeSet<String>>,
    },
}

/// Classpath slot, fixed at first visit.
enum Slot {
    Local(PathBuf),
    Artifact(String),
}

/// Resolver backed by an ordered list of repositories.
pub struct RepositoryResolver {
    repositories: Vec<Arc<dyn Repository>>,
    policy: ConflictPolicy,
    local_root: PathBuf,
    verify_checksums: bool,
}

impl Default for RepositoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryResolver {
    /// Create a resolver with no repositories.
    ///
    /// Local coordinates resolve against the working directory until
    /// [`with_local_root`](Self::with_local_root) says otherwise.
    pub fn new() -> Self {
        Self {
            repositories: Vec::new(),
            policy: ConflictPolicy::default(),
            local_root: PathBuf::from("."),
            verify_checksums: true,
        }
    }

    /// Append a repository. Repositories are searched in insertion order.
    pub fn with_repository(mut self, repository: impl Repository + 'static) -> Self {
        self.repositories.push(Arc::new(repository));
        self
    }

    /// Append already shared repositories.
    pub fn with_repositories(mut self, repositories: Vec<Arc<dyn Repository>>) -> Self {
        self.repositories.extend(repositories);
        self
    }

    /// Set the conflict policy.
    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the directory relative local coordinates are resolved against.
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = root.into();
        self
    }

    /// Enable or disable checksum verification of fetched artifacts.
    pub fn with_checksum_verification(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// The conflict policy in effect.
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    fn resolve_local(&self, path: &Path) -> Result<PathBuf> {
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.local_root.join(path)
        };

        if !full.is_file() {
            return Err(ResolutionError::NotFound(path.display().to_string()).into());
        }
        canonical(&full)
    }

    /// First source holding the artifact: the cache, then each repository.
    fn locate<'a>(
        &'a self,
        cache: &'a ArtifactCache,
        coordinate: &ArtifactCoordinate,
    ) -> Option<&'a dyn Repository> {
        if cache.contains(coordinate) {
            return Some(cache.as_repository());
        }
        self.repositories
            .iter()
            .map(|r| r.as_ref())
            .find(|r| r.contains(coordinate))
    }

    fn materialize(&self, cache: &ArtifactCache, coordinate: &ArtifactCoordinate) -> Result<PathBuf> {
        if cache.contains(coordinate) {
            trace!(artifact = %coordinate, "Artifact already cached");
            return canonical(&cache.artifact_path(coordinate));
        }

        let not_found = || ResolutionError::NotFound(coordinate.to_string());
        let repository = self
            .repositories
            .iter()
            .find(|r| r.contains(coordinate))
            .ok_or_else(not_found)?;

        let bytes = repository.fetch(coordinate)?.ok_or_else(not_found)?;
        let descriptor = repository.descriptor(coordinate)?;
        let checksum = if self.verify_checksums {
            repository.checksum(coordinate)?
        } else {
            None
        };

        debug!(
            artifact = %coordinate,
            repository = repository.id(),
            "Fetching artifact into cache"
        );
        let path = cache.store(coordinate, &bytes, descriptor.as_ref(), checksum.as_deref())?;
        canonical(&path)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| {
        ResolutionError::Cache {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn is_newer(candidate: &str, current: &str) -> bool {
    match (
        candidate.parse::<ArtifactVersion>(),
        current.parse::<ArtifactVersion>(),
    ) {
        (Ok(a), Ok(b)) => a > b,
        _ => candidate > current,
    }
}

/// Outcome of one breadth-first walk.
struct Walk {
    slots: Vec<Slot>,
    selected: HashMap<String, ArtifactCoordinate>,
    /// Versions that beat the selected one under `Highest`, by key
    upgrades: HashMap<String, String>,
}

impl RepositoryResolver {
    /// Walk the graph once. Keys in `pins` are forced to the pinned version
    /// wherever they are reached.
    fn walk(
        &self,
        roots: &[Coordinate],
        cache: &ArtifactCache,
        pins: &HashMap<String, String>,
    ) -> Result<Walk> {
        let mut queue: VecDeque<Pending> = roots
            .iter()
            .map(|root| match root {
                Coordinate::Local(path) => Pending::Local(path.clone()),
                Coordinate::Repository(coordinate) => Pending::Artifact {
                    coordinate: coordinate.clone(),
                    exclusions: Arc::new(BTreeSet::new()),
                },
            })
            .collect();

        let mut slots = Vec::new();
        let mut selected: HashMap<String, ArtifactCoordinate> = HashMap::new();
        let mut upgrades: HashMap<String, String> = HashMap::new();

        while let Some(pending) = queue.pop_front() {
            let (mut coordinate, exclusions) = match pending {
                Pending::Local(path) => {
                    slots.push(Slot::Local(self.resolve_local(&path)?));
                    continue;
                }
                Pending::Artifact {
                    coordinate,
                    exclusions,
                } => (coordinate, exclusions),
            };

            let key = coordinate.key();
            if exclusions.contains(&key) {
                trace!(artifact = %coordinate, "Excluded");
                continue;
            }
            if let Some(version) = pins.get(&key) {
                coordinate.version = version.clone();
            }

            match selected.get(&key) {
                Some(existing) if existing.version == coordinate.version => continue,
                Some(existing) => match self.policy {
                    ConflictPolicy::Nearest => {
                        debug!(
                            artifact = %key,
                            kept = %existing.version,
                            ignored = %coordinate.version,
                            "Version conflict settled by nearest"
                        );
                        continue;
                    }
                    ConflictPolicy::Fail => {
                        return Err(ResolutionError::Conflict {
                            artifact: key,
                            versions: vec![existing.version.clone(), coordinate.version.clone()],
                        }
                        .into());
                    }
                    ConflictPolicy::Highest => {
                        let best = upgrades.get(&key).unwrap_or(&existing.version);
                        if is_newer(&coordinate.version, best) {
                            upgrades.insert(key, coordinate.version.clone());
                        }
                        continue;
                    }
                },
                None => {
                    selected.insert(key.clone(), coordinate.clone());
                    slots.push(Slot::Artifact(key));
                }
            }

            let repository = self
                .locate(cache, &coordinate)
                .ok_or_else(|| ResolutionError::NotFound(coordinate.to_string()))?;

            if let Some(descriptor) = repository.descriptor(&coordinate)? {
                let exclusions = if descriptor.exclusions.is_empty() {
                    exclusions
                } else {
                    let mut merged = (*exclusions).clone();
                    merged.extend(descriptor.exclusions.iter().cloned());
                    Arc::new(merged)
                };

                for dependency in &descriptor.dependencies {
                    queue.push_back(Pending::Artifact {
                        coordinate: dependency.parse()?,
                        exclusions: exclusions.clone(),
                    });
                }
            }
        }

        Ok(Walk {
            slots,
            selected,
            upgrades,
        })
    }
}

impl DependencyResolver for RepositoryResolver {
    fn resolve(&self, coordinates: &[String], cache_dir: &Path) -> Result<Classpath> {
        let cache = ArtifactCache::new(cache_dir);
        let roots = coordinates
            .iter()
            .map(|raw| raw.parse::<Coordinate>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Under `Highest` a walk that meets a newer version pins it and
        // walks again, so the subtree of the losing version is never kept.
        // A pinned key never conflicts again, so every pass pins a new key.
        let mut pins: HashMap<String, String> = HashMap::new();
        let walk = loop {
            let walk = self.walk(&roots, &cache, &pins)?;
            if walk.upgrades.is_empty() {
                break walk;
            }
            for (key, version) in walk.upgrades {
                debug!(artifact = %key, selected = %version, "Version conflict settled by highest");
                pins.insert(key, version);
            }
        };

        let mut paths = Vec::with_capacity(walk.slots.len());
        for slot in walk.slots {
            match slot {
                Slot::Local(path) => paths.push(path),
                Slot::Artifact(key) => {
                    let coordinate = walk
                        .selected
                        .get(&key)
                        .ok_or_else(|| ResolutionError::NotFound(key.clone()))?;
                    paths.push(self.materialize(&cache, coordinate)?);
                }
            }
        }

        let classpath = Classpath::new(paths);
        info!(
            coordinates = coordinates.len(),
            artifacts = classpath.len(),
            policy = %self.policy,
            "Resolved classpath"
        );
        Ok(classpath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!("Highest".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Highest));
        assert!("newest".parse::<ConflictPolicy>().is_err());
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Nearest);
        assert_eq!(
            serde_json::to_string(&ConflictPolicy::Fail).unwrap(),
            "\"fail\""
        );
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.10", "1.9"));
        assert!(!is_newer("1.0-SNAPSHOT", "1.0"));
        assert!(is_newer("b", "a"));
    }
}
