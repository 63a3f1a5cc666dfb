//! Core data types for the Helium host.
//!
//! This module defines the data model shared by the resolver, the isolation
//! layer and the loader: package descriptors, classpaths, per-instance
//! contexts, resources and output sinks.

pub mod classpath;
pub mod context;
pub mod output;
pub mod package;
pub mod resource;
pub mod state;

pub use classpath::Classpath;
pub use context::ApplicationContext;
pub use output::{BufferedOutput, OutputSink};
pub use package::{PackageDescriptor, PackageType, RequiredResources, ResourceRequirement};
pub use resource::{LocalResourcePool, Resource, ResourceId, ResourcePool, ResourceSet};
pub use state::ApplicationState;
