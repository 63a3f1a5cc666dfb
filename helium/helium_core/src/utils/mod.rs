//! Utility types used throughout the host.

pub mod logging;
pub mod version;

pub use logging::LogLevel;
pub use version::{ArtifactVersion, VersionParseError};
