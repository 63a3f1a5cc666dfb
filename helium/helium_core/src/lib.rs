//! # Helium Core
//!
//! `helium_core` provides the shared building blocks of the Helium
//! application host: the error hierarchy, identifiers, the data model
//! describing packages, classpaths, contexts and resources, and the
//! [`Application`](traits::Application) trait every loaded application
//! implements.
//!
//! The host turns a declarative [`PackageDescriptor`] into a running,
//! isolated, revocable application instance in three steps:
//!
//! 1. **Resolution**: the artifact coordinates are resolved to an ordered
//!    [`Classpath`] of local files (`helium_resolver`).
//! 2. **Isolation**: the classpath is turned into an isolation environment
//!    whose symbols are scoped to that classpath (`helium_isolation`).
//! 3. **Lifecycle**: the entry point is instantiated inside the environment,
//!    wrapped in a uniform adapter and registered by instance id
//!    (`helium_runtime`).
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Helium components
//! - **id**: Strongly-typed identifier types
//! - **traits**: The application interface
//! - **types**: Data structures used throughout the system
//! - **utils**: Logging and version helpers

pub mod error;
pub mod id;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{ApplicationError, Error, IsolationError, ResolutionError, Result};
pub use id::{AppInstanceId, EnvironmentId};
pub use traits::{Application, ApplicationConstructor};
pub use types::{
    ApplicationContext, ApplicationState, BufferedOutput, Classpath, LocalResourcePool,
    OutputSink, PackageDescriptor, PackageType, RequiredResources, Resource, ResourceId,
    ResourcePool, ResourceSet,
};
pub use utils::{ArtifactVersion, LogLevel};
