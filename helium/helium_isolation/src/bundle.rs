//! In-process application bundles.
//!
//! Applications compiled into the host binary are published as bundles in
//! a [`BundleCatalog`], keyed by the file name of the artifact that stands
//! for them on the classpath. Resolving the artifact puts the bundle's
//! entry points in scope; a bundle whose artifact is not on an
//! environment's classpath stays invisible to it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use helium_core::error::Result;
use helium_core::traits::{Application, ApplicationConstructor};
use helium_core::types::ApplicationContext;

use crate::entry::EntryPoint;
use crate::loader::ArtifactLoader;

/// Entry points shipped together under one artifact name.
#[derive(Clone, Default)]
pub struct Bundle {
    applications: Vec<(String, Arc<ApplicationConstructor>)>,
}

impl Bundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an application class.
    pub fn with_application<F>(mut self, class_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ApplicationContext) -> anyhow::Result<Box<dyn Application>> + Send + Sync + 'static,
    {
        self.applications
            .push((class_name.into(), Arc::new(constructor)));
        self
    }

    /// Class names in the bundle.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.applications.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.class_names()).finish()
    }
}

/// Catalog of bundles, keyed by artifact file name.
#[derive(Default)]
pub struct BundleCatalog {
    bundles: RwLock<HashMap<String, Bundle>>,
}

impl BundleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a bundle under an artifact file name, replacing any previous one.
    pub fn register(&self, artifact_name: impl Into<String>, bundle: Bundle) {
        let artifact_name = artifact_name.into();
        debug!(artifact = %artifact_name, classes = ?bundle, "Registered bundle");
        self.bundles.write().insert(artifact_name, bundle);
    }

    /// Withdraw a bundle. Environments already built keep their entry points.
    pub fn unregister(&self, artifact_name: &str) -> Option<Bundle> {
        self.bundles.write().remove(artifact_name)
    }

    /// Number of published bundles.
    pub fn len(&self) -> usize {
        self.bundles.read().len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.bundles.read().is_empty()
    }
}

fn file_name(artifact: &Path) -> Option<String> {
    artifact
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

impl ArtifactLoader for BundleCatalog {
    fn name(&self) -> &str {
        "bundle"
    }

    fn recognizes(&self, artifact: &Path) -> bool {
        file_name(artifact).is_some_and(|name| self.bundles.read().contains_key(&name))
    }

    fn load(&self, artifact: &Path) -> Result<Vec<EntryPoint>> {
        let bundles = self.bundles.read();
        let entries = file_name(artifact)
            .and_then(|name| bundles.get(&name))
            .map(|bundle| {
                bundle
                    .applications
                    .iter()
                    .map(|(class_name, constructor)| {
                        EntryPoint::new(class_name.clone(), artifact, constructor.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }
}
