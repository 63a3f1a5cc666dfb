//! Application trait definitions.
//!
//! Every pluggable application, however it was loaded, is driven through
//! the [`Application`] trait. Isolation backends produce boxed
//! `Application`s from an entry-point name; the host wraps them in a
//! lifecycle adapter and never sees the concrete type.

use crate::types::{ApplicationContext, ResourceSet};

/// A pluggable application bound to one paragraph.
///
/// # Examples
///
/// ```
/// use helium_core::traits::Application;
/// use helium_core::types::{ApplicationContext, ResourceSet};
///
/// struct Echo {
///     context: ApplicationContext,
/// }
///
/// impl Application for Echo {
///     fn run(&mut self, resources: &ResourceSet) -> anyhow::Result<()> {
///         self.context.println(&format!("{} resources", resources.len()));
///         Ok(())
///     }
/// }
/// ```
pub trait Application: Send {
    /// Execute the application once.
    ///
    /// # Arguments
    ///
    /// * `resources` - The resource set selected from the session pool for
    ///   this run.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the run completed.
    /// * `Err` if the application failed. The host reports the failure and
    ///   keeps the instance runnable.
    fn run(&mut self, resources: &ResourceSet) -> anyhow::Result<()>;

    /// Release whatever the application holds. Called at most once.
    fn unload(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Constructor registered for an entry-point name.
///
/// Receives the instance context, which is the only capability surface the
/// application gets.
pub type ApplicationConstructor =
    dyn Fn(&ApplicationContext) -> anyhow::Result<Box<dyn Application>> + Send + Sync;
