//! Error types for the Helium application host.
//!
//! This module defines the error hierarchy shared by every Helium crate.
//! Errors are organized by subsystem: dependency resolution, isolation
//! environments, and application lifecycle. The root error type, `Error`,
//! wraps each subsystem error so callers can match at whatever depth
//! they need.

use crate::id::{AppInstanceId, EnvironmentId};
use thiserror::Error;

/// Root error type for the Helium host.
#[derive(Debug, Error)]
pub enum Error {
    /// Dependency resolution errors
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Isolation environment errors
    #[error("Isolation error: {0}")]
    Isolation(#[from] IsolationError),

    /// Application lifecycle errors
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// A bounded operation did not finish in time
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised while turning artifact coordinates into a classpath.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The coordinate string could not be parsed
    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),

    /// No configured repository provides the artifact
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Two versions of one artifact were reached and the policy refused to pick
    #[error("Version conflict for {artifact}: {versions:?}")]
    Conflict {
        /// `group:artifact` key of the conflicting artifact
        artifact: String,

        /// Versions that were requested
        versions: Vec<String>,
    },

    /// Downloaded content did not match its published checksum
    #[error("Checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Coordinate of the artifact
        artifact: String,

        /// Published checksum
        expected: String,

        /// Computed checksum
        actual: String,
    },

    /// A dependency descriptor could not be read
    #[error("Invalid dependency descriptor for {artifact}: {reason}")]
    InvalidDescriptor {
        /// Coordinate of the artifact
        artifact: String,

        /// What was wrong with it
        reason: String,
    },

    /// Reading or writing the local artifact cache failed
    #[error("Cache I/O failed for {path}: {reason}")]
    Cache {
        /// Path that failed
        path: String,

        /// Underlying failure
        reason: String,
    },
}

/// Errors raised while building or using an isolation environment.
#[derive(Debug, Error)]
pub enum IsolationError {
    /// The environment could not be built from its classpath
    #[error("Failed to construct environment: {0}")]
    ConstructionFailed(String),

    /// An artifact tried to see or define a symbol outside its scope
    #[error("Symbol visibility violation: {0}")]
    SymbolVisibility(String),

    /// A guest module could not be compiled
    #[error("Failed to compile module {artifact}: {reason}")]
    CompilationFailed {
        /// Artifact holding the module
        artifact: String,

        /// Compiler message
        reason: String,
    },

    /// The environment was already torn down
    #[error("Environment {0} has been released")]
    Released(EnvironmentId),
}

/// Errors related to loading and driving applications.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The entry-point class is not defined in the environment
    #[error("Entry point '{class_name}' not found in environment {environment}")]
    PackageNotFound {
        /// Requested entry-point name
        class_name: String,

        /// Environment that was searched
        environment: EnvironmentId,
    },

    /// The entry-point constructor failed
    #[error("Failed to instantiate '{class_name}': {reason}")]
    Instantiation {
        /// Entry-point name
        class_name: String,

        /// Constructor failure
        reason: String,
    },

    /// No loaded instance has this id
    #[error("Unknown application instance: {0}")]
    UnknownInstance(AppInstanceId),

    /// Application code failed during `run`
    #[error("Application {instance} failed: {message}")]
    Runtime {
        /// Instance that failed
        instance: AppInstanceId,

        /// Failure reported by the application
        message: String,
    },

    /// `run` was called after `unload`
    #[error("Application instance {0} has been unloaded")]
    InstanceUnloaded(AppInstanceId),

    /// An instance with this id is already loaded
    #[error("Application instance {0} is already loaded")]
    DuplicateInstance(AppInstanceId),

    /// The package kind cannot be instantiated by the loader
    #[error("Can't instantiate {0} package using the application loader")]
    UnsupportedPackageType(String),

    /// The package descriptor is missing required fields
    #[error("Invalid package descriptor: {0}")]
    InvalidDescriptor(String),

    /// None of the required resource sets is available
    #[error("Required resources for {0} are not available")]
    MissingResources(AppInstanceId),
}

/// Result type used throughout the Helium host.
pub type Result<T> = std::result::Result<T, Error>;
