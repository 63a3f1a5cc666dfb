//! # Helium Isolation
//!
//! `helium_isolation` turns a resolved classpath into an isolated
//! environment in which application classes can be instantiated.
//!
//! Key concepts:
//!
//! 1. **Entry Point**: A class name bound to a constructor.
//!
//! 2. **Artifact Loader**: A way of reading entry points out of a
//!    classpath artifact. Two are provided: in-process bundles and
//!    WebAssembly modules.
//!
//! 3. **Isolation Environment**: The entry points of one classpath and
//!    nothing else. Host-level names cannot be defined by packages.
//!
//! 4. **Environment Factory**: A cache of environments keyed by artifact and classpath,
//!    handing out reference-counted leases.

pub mod bundle;
pub mod entry;
pub mod environment;
pub mod factory;
pub mod loader;
pub mod wasm;

pub use bundle::{Bundle, BundleCatalog};
pub use entry::{EntryPoint, RESERVED_NAMESPACE};
pub use environment::IsolationEnvironment;
pub use factory::{EnvironmentFactory, EnvironmentKey, EnvironmentLease};
pub use loader::ArtifactLoader;
pub use wasm::{WasmArtifactLoader, WasmEngine};
