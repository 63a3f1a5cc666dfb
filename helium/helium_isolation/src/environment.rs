//! Isolation environments.
//!
//! An environment is the symbol scope of one classpath: the entry points
//! defined by the artifacts on that classpath and nothing else. Class names
//! are resolved against this table only, so two environments never see
//! each other's classes even when their classpaths overlap.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use helium_core::error::{ApplicationError, IsolationError, Result};
use helium_core::id::EnvironmentId;
use helium_core::traits::Application;
use helium_core::types::{ApplicationContext, Classpath};

use crate::entry::{check_class_name, EntryPoint};
use crate::loader::ArtifactLoader;

/// A classpath-scoped table of entry points.
pub struct IsolationEnvironment {
    id: EnvironmentId,
    classpath: Classpath,
    entries: RwLock<HashMap<String, EntryPoint>>,
    released: AtomicBool,
}

impl IsolationEnvironment {
    /// Build an environment from a classpath.
    ///
    /// Each artifact is handed to the first loader that recognises it;
    /// artifacts no loader recognises contribute no classes. When two
    /// artifacts define the same class, the one earlier on the classpath
    /// wins.
    ///
    /// # Arguments
    ///
    /// * `classpath` - The resolved classpath.
    /// * `loaders` - Loaders to try, in order.
    ///
    /// # Returns
    ///
    /// * `Ok(IsolationEnvironment)` - The populated environment.
    /// * `Err` - If an artifact fails to load or defines a reserved class.
    pub fn build(classpath: Classpath, loaders: &[Arc<dyn ArtifactLoader>]) -> Result<Self> {
        let id = EnvironmentId::new();
        let mut entries: HashMap<String, EntryPoint> = HashMap::new();

        for artifact in classpath.iter() {
            let Some(loader) = loaders.iter().find(|l| l.recognizes(artifact)) else {
                trace!(environment = %id, artifact = %artifact.display(), "No loader for artifact");
                continue;
            };

            for entry in loader.load(artifact)? {
                check_class_name(entry.class_name(), artifact)?;

                if let Some(existing) = entries.get(entry.class_name()) {
                    debug!(
                        environment = %id,
                        class = entry.class_name(),
                        kept = %existing.artifact().display(),
                        shadowed = %artifact.display(),
                        "Duplicate class on classpath"
                    );
                    continue;
                }
                entries.insert(entry.class_name().to_string(), entry);
            }
        }

        debug!(
            environment = %id,
            artifacts = classpath.len(),
            classes = entries.len(),
            "Built isolation environment"
        );

        Ok(Self {
            id,
            classpath,
            entries: RwLock::new(entries),
            released: AtomicBool::new(false),
        })
    }

    /// Environment identity.
    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    /// The classpath this environment was built from.
    pub fn classpath(&self) -> &Classpath {
        &self.classpath
    }

    /// Whether the class is defined here.
    pub fn defines(&self, class_name: &str) -> bool {
        self.entries.read().contains_key(class_name)
    }

    /// Names of every class defined here, sorted.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether the environment has been torn down.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Instantiate a class defined in this environment.
    ///
    /// # Returns
    ///
    /// * `Ok(Box<dyn Application>)` - The new instance.
    /// * `Err(ApplicationError::PackageNotFound)` - If the class is not defined.
    /// * `Err(ApplicationError::Instantiation)` - If the constructor fails or panics.
    /// * `Err(IsolationError::Released)` - If the environment was torn down.
    pub fn instantiate(
        &self,
        class_name: &str,
        context: &ApplicationContext,
    ) -> Result<Box<dyn Application>> {
        if self.is_released() {
            return Err(IsolationError::Released(self.id).into());
        }

        let entry = self
            .entries
            .read()
            .get(class_name)
            .cloned()
            .ok_or_else(|| ApplicationError::PackageNotFound {
                class_name: class_name.to_string(),
                environment: self.id,
            })?;

        let instantiation_error = |reason: String| ApplicationError::Instantiation {
            class_name: class_name.to_string(),
            reason,
        };

        match catch_unwind(AssertUnwindSafe(|| entry.construct(context))) {
            Ok(Ok(app)) => {
                trace!(environment = %self.id, class = class_name, "Instantiated class");
                Ok(app)
            }
            Ok(Err(e)) => Err(instantiation_error(format!("{:#}", e)).into()),
            Err(panic) => Err(instantiation_error(panic_message(&*panic)).into()),
        }
    }

    /// Tear the environment down, dropping every loaded-code handle.
    ///
    /// Returns `false` if it was already released.
    pub(crate) fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.entries.write().clear();
        debug!(environment = %self.id, "Released isolation environment");
        true
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

impl std::fmt::Debug for IsolationEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationEnvironment")
            .field("id", &self.id)
            .field("classpath", &self.classpath)
            .field("released", &self.is_released())
            .finish()
    }
}
