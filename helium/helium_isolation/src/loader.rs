//! Artifact loaders.
//!
//! An artifact loader knows one way of turning an artifact file into entry
//! points. Environments try their loaders in order; the first loader that
//! recognises an artifact handles it.

use std::path::Path;

use helium_core::error::Result;

use crate::entry::EntryPoint;

/// Turns artifacts into entry points.
pub trait ArtifactLoader: Send + Sync {
    /// Loader name, for diagnostics.
    fn name(&self) -> &str;

    /// Whether this loader handles the artifact.
    fn recognizes(&self, artifact: &Path) -> bool;

    /// Load the entry points the artifact defines.
    ///
    /// # Arguments
    ///
    /// * `artifact` - Canonical path of a classpath entry this loader
    ///   recognised.
    ///
    /// # Returns
    ///
    /// * `Ok(entries)` - The entry points, in definition order.
    /// * `Err(Error::Isolation(_))` - If the artifact cannot be loaded or
    ///   reaches outside its scope.
    fn load(&self, artifact: &Path) -> Result<Vec<EntryPoint>>;
}
