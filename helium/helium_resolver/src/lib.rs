//! # Helium Resolver
//!
//! Dependency resolution for the Helium application host. A package's
//! artifact coordinates are resolved, together with their transitive
//! dependencies, into an ordered [`Classpath`](helium_core::Classpath) of
//! local files, fetching anything missing into a local cache.
//!
//! Key components:
//!
//! - **coordinate**: Parsing of `group:artifact:version[:ext]` and local paths
//! - **repository**: The `Repository` trait and a directory-backed repository
//! - **cache**: Atomic, checksum-verified writes into the local cache
//! - **resolver**: Breadth-first transitive resolution with conflict policies

pub mod cache;
pub mod coordinate;
pub mod repository;
pub mod resolver;

pub use cache::ArtifactCache;
pub use coordinate::{ArtifactCoordinate, Coordinate};
pub use repository::{DependencyDescriptor, FileSystemRepository, Repository};
pub use resolver::{ConflictPolicy, DependencyResolver, RepositoryResolver};
