//! # Helium Runtime
//!
//! `helium_runtime` loads applications described by package descriptors
//! and drives their lifecycle.
//!
//! Key concepts:
//!
//! 1. **Loader Config**: Where artifacts are resolved from and cached, and
//!    how long a load may take.
//!
//! 2. **Application Loader**: Resolves a package's artifact, leases the
//!    isolation environment for the resulting classpath and instantiates
//!    the entry point inside it.
//!
//! 3. **Application Handle**: The uniform `run` / `unload` adapter around
//!    one loaded instance.
//!
//! 4. **Application Registry**: The loaded instances of one loader, keyed
//!    by instance id.

pub mod config;
pub mod handle;
pub mod loader;
pub mod registry;

#[cfg(test)]
mod testing;

pub use config::{LoaderConfig, RepositoryConfig};
pub use handle::ApplicationHandle;
pub use loader::ApplicationLoader;
pub use registry::ApplicationRegistry;
