//! Core traits that define the Helium host interfaces.
//!
//! Collaborator interfaces that belong to the data model (resource pools,
//! output sinks) live next to their types in [`crate::types`].

pub mod application;

pub use application::{Application, ApplicationConstructor};
