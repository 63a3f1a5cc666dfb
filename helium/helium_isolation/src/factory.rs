//! Environment factory.
//!
//! Environments are cached by [`EnvironmentKey`]: the artifact coordinates
//! a package asked for together with the classpath they resolved to, so two
//! packages naming different artifacts never share an environment even when
//! their classpaths coincide. Every user of an environment holds
//! an [`EnvironmentLease`]; dropping the last lease tears the environment
//! down and evicts it from the cache, without touching other environments.
//!
//! Each key has its own slot with its own lock, so building one
//! environment never blocks lookups of another.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use helium_core::error::Result;
use helium_core::id::EnvironmentId;
use helium_core::types::Classpath;

use crate::environment::IsolationEnvironment;
use crate::loader::ArtifactLoader;

/// Cache key of an isolation environment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnvironmentKey {
    artifact: String,
    classpath: Classpath,
}

impl EnvironmentKey {
    /// Key for the environment of `artifact`, resolved to `classpath`.
    pub fn new(artifact: impl Into<String>, classpath: Classpath) -> Self {
        Self {
            artifact: artifact.into(),
            classpath,
        }
    }

    /// The requested artifact coordinates.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// The resolved classpath.
    pub fn classpath(&self) -> &Classpath {
        &self.classpath
    }
}

/// A bare classpath keys an environment by its files alone.
impl From<&Classpath> for EnvironmentKey {
    fn from(classpath: &Classpath) -> Self {
        Self::new(classpath.to_string(), classpath.clone())
    }
}

impl From<&EnvironmentKey> for EnvironmentKey {
    fn from(key: &EnvironmentKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for EnvironmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.artifact, self.classpath)
    }
}

#[derive(Default)]
struct SlotState {
    environment: Option<Arc<IsolationEnvironment>>,
    leases: usize,
    /// Set once the slot has been evicted; holders must look the key up again.
    retired: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

struct FactoryInner {
    loaders: Vec<Arc<dyn ArtifactLoader>>,
    slots: DashMap<EnvironmentKey, Arc<Slot>>,
}

impl FactoryInner {
    fn evict(&self, key: &EnvironmentKey, slot: &Arc<Slot>) {
        self.slots
            .remove_if(key, |_, current| Arc::ptr_eq(current, slot));
    }

    fn release(&self, key: &EnvironmentKey, slot: &Arc<Slot>) {
        let mut state = slot.state.lock();
        if state.leases == 0 {
            warn!(key = %key, "Environment lease released twice");
            return;
        }

        state.leases -= 1;
        if state.leases > 0 {
            return;
        }

        state.retired = true;
        if let Some(environment) = state.environment.take() {
            environment.release();
        }
        self.evict(key, slot);
    }
}

/// Builds and caches isolation environments.
#[derive(Clone)]
pub struct EnvironmentFactory {
    inner: Arc<FactoryInner>,
}

impl EnvironmentFactory {
    /// Create a factory that builds environments with `loaders`.
    pub fn new(loaders: Vec<Arc<dyn ArtifactLoader>>) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                loaders,
                slots: DashMap::new(),
            }),
        }
    }

    /// Get the environment for `key`, building it if needed.
    ///
    /// `key` is an [`EnvironmentKey`] or a bare `&Classpath`.
    ///
    /// # Returns
    ///
    /// * `Ok(EnvironmentLease)` - A lease keeping the environment alive.
    /// * `Err` - If the environment could not be built; nothing is cached.
    pub fn get_or_create(&self, key: impl Into<EnvironmentKey>) -> Result<EnvironmentLease> {
        let key = key.into();
        loop {
            let slot = self
                .inner
                .slots
                .entry(key.clone())
                .or_default()
                .clone();

            let mut state = slot.state.lock();
            if state.retired {
                continue;
            }

            let environment = if let Some(environment) = state.environment.clone() {
                debug!(environment = %environment.id(), "Reusing isolation environment");
                environment
            } else {
                match IsolationEnvironment::build(key.classpath.clone(), &self.inner.loaders) {
                    Ok(environment) => {
                        let environment = Arc::new(environment);
                        state.environment = Some(environment.clone());
                        environment
                    }
                    Err(e) => {
                        if state.leases == 0 {
                            state.retired = true;
                            self.inner.evict(&key, &slot);
                        }
                        return Err(e);
                    }
                }
            };

            state.leases += 1;
            drop(state);

            return Ok(EnvironmentLease {
                environment,
                key,
                slot,
                factory: self.inner.clone(),
            });
        }
    }

    /// The cached environment for `key`, if any.
    pub fn get(&self, key: impl Into<EnvironmentKey>) -> Option<Arc<IsolationEnvironment>> {
        let slot = self.slot(&key.into())?;
        let environment = slot.state.lock().environment.clone();
        environment
    }

    /// Whether an environment for `key` is cached.
    pub fn contains(&self, key: impl Into<EnvironmentKey>) -> bool {
        self.get(key).is_some()
    }

    /// Number of live leases on the environment for `key`.
    pub fn lease_count(&self, key: impl Into<EnvironmentKey>) -> usize {
        self.slot(&key.into())
            .map_or(0, |slot| slot.state.lock().leases)
    }

    /// Number of cached environments.
    pub fn cached_count(&self) -> usize {
        // Slot locks are never taken while a map shard is locked.
        let slots: Vec<Arc<Slot>> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        slots
            .iter()
            .filter(|slot| slot.state.lock().environment.is_some())
            .count()
    }

    fn slot(&self, key: &EnvironmentKey) -> Option<Arc<Slot>> {
        let slot = self.inner.slots.get(key)?;
        Some(slot.value().clone())
    }
}

/// Shared ownership of a cached environment.
///
/// Cloning takes another lease; the environment is torn down when the last
/// lease is dropped.
pub struct EnvironmentLease {
    environment: Arc<IsolationEnvironment>,
    key: EnvironmentKey,
    slot: Arc<Slot>,
    factory: Arc<FactoryInner>,
}

impl EnvironmentLease {
    /// The leased environment.
    pub fn environment(&self) -> &Arc<IsolationEnvironment> {
        &self.environment
    }

    /// Identity of the leased environment.
    pub fn environment_id(&self) -> EnvironmentId {
        self.environment.id()
    }

    /// Cache key of the leased environment.
    pub fn key(&self) -> &EnvironmentKey {
        &self.key
    }
}

impl Deref for EnvironmentLease {
    type Target = IsolationEnvironment;

    fn deref(&self) -> &Self::Target {
        &self.environment
    }
}

impl Clone for EnvironmentLease {
    fn clone(&self) -> Self {
        self.slot.state.lock().leases += 1;
        Self {
            environment: self.environment.clone(),
            key: self.key.clone(),
            slot: self.slot.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl Drop for EnvironmentLease {
    fn drop(&mut self) {
        self.factory.release(&self.key, &self.slot);
    }
}

impl std::fmt::Debug for EnvironmentLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentLease")
            .field("environment", &self.environment.id())
            .finish()
    }
}
