//! Entry points.
//!
//! An entry point pairs an application class name with the constructor
//! that builds instances of it. Environments hold a table of entry points
//! collected from their classpath; instantiation is a table lookup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use helium_core::error::{IsolationError, Result};
use helium_core::traits::{Application, ApplicationConstructor};
use helium_core::types::ApplicationContext;

/// Namespace reserved for host-level symbols.
pub const RESERVED_NAMESPACE: &str = "helium.";

/// A named application constructor contributed by one artifact.
#[derive(Clone)]
pub struct EntryPoint {
    class_name: String,
    artifact: PathBuf,
    constructor: Arc<ApplicationConstructor>,
}

impl EntryPoint {
    /// Create an entry point.
    pub fn new(
        class_name: impl Into<String>,
        artifact: impl Into<PathBuf>,
        constructor: Arc<ApplicationConstructor>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            artifact: artifact.into(),
            constructor,
        }
    }

    /// Fully qualified class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Artifact that defined the entry point.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Build a new application instance.
    pub fn construct(&self, context: &ApplicationContext) -> anyhow::Result<Box<dyn Application>> {
        (self.constructor)(context)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("class_name", &self.class_name)
            .field("artifact", &self.artifact)
            .finish()
    }
}

/// Reject class names a package may not define.
pub fn check_class_name(class_name: &str, artifact: &Path) -> Result<()> {
    if class_name.is_empty() {
        return Err(IsolationError::SymbolVisibility(format!(
            "{} defines an entry point with an empty name",
            artifact.display()
        ))
        .into());
    }

    if class_name.starts_with(RESERVED_NAMESPACE) {
        return Err(IsolationError::SymbolVisibility(format!(
            "{} may not define '{}' in the host namespace",
            artifact.display(),
            class_name
        ))
        .into());
    }

    Ok(())
}
