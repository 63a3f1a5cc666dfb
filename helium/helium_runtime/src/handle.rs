//! Application handles.
//!
//! An [`ApplicationHandle`] is the uniform lifecycle adapter around one
//! loaded application instance. It owns the raw instance and a lease on
//! the isolation environment the instance was created in, and drives the
//! state machine:
//!
//! ```text
//! CREATED --run()--> RUNNING --returns--> CREATED
//! any state --unload()--> UNLOADED
//! ```
//!
//! Errors raised by application code never escape `run` as panics; they are
//! reported as [`ApplicationError::Runtime`] and the instance stays
//! runnable. An unload requested while a run is in progress takes effect
//! as soon as that run returns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{info, trace, warn};

use helium_core::error::{ApplicationError, Result};
use helium_core::id::{AppInstanceId, EnvironmentId};
use helium_core::traits::Application;
use helium_core::types::{ApplicationContext, ApplicationState, PackageDescriptor, ResourceSet};
use helium_isolation::environment::panic_message;
use helium_isolation::EnvironmentLease;

/// Handle to a loaded application instance
pub struct ApplicationHandle {
    /// Package the instance was loaded from
    package: PackageDescriptor,

    /// Context the instance is bound to
    context: ApplicationContext,

    /// Environment the instance was created in
    environment_id: EnvironmentId,

    /// The raw instance; held for the duration of a run
    application: Mutex<Box<dyn Application>>,

    /// Lease keeping the environment alive until the instance is finalized
    lease: Mutex<Option<EnvironmentLease>>,

    /// Current `ApplicationState`, as a byte
    state: AtomicU8,

    /// Set by the first `unload` call
    unload_requested: AtomicBool,

    /// Set once the unload hook ran and the lease was dropped
    finalized: AtomicBool,

    /// Number of runs that reached application code
    run_count: AtomicUsize,
}

impl ApplicationHandle {
    /// Wrap a freshly instantiated application.
    pub fn new(
        package: PackageDescriptor,
        context: ApplicationContext,
        application: Box<dyn Application>,
        lease: EnvironmentLease,
    ) -> Self {
        Self {
            package,
            context,
            environment_id: lease.environment_id(),
            application: Mutex::new(application),
            lease: Mutex::new(Some(lease)),
            state: AtomicU8::new(ApplicationState::Created.as_u8()),
            unload_requested: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        }
    }

    /// Instance id.
    pub fn app_instance_id(&self) -> &AppInstanceId {
        self.context.app_instance_id()
    }

    /// Package the instance was loaded from.
    pub fn package(&self) -> &PackageDescriptor {
        &self.package
    }

    /// Context the instance is bound to.
    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    /// Environment the instance was created in.
    pub fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ApplicationState {
        ApplicationState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of runs that reached application code.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }

    /// Whether `unload` has been called.
    pub fn is_unloaded(&self) -> bool {
        self.unload_requested.load(Ordering::SeqCst)
    }

    /// Whether the unload hook ran and the environment lease was dropped.
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    /// Run the application once.
    ///
    /// The resources handed to the application are the first alternative of
    /// the package's required resources that the context's pool satisfies,
    /// looking only at resources visible to the context's note and
    /// paragraph.
    ///
    /// # Errors
    ///
    /// * `ApplicationError::InstanceUnloaded` - If `unload` was called.
    /// * `ApplicationError::Runtime` - If the application failed or panicked,
    ///   or if another run of this instance is in progress.
    /// * `ApplicationError::MissingResources` - If no alternative is satisfied.
    pub fn run(&self) -> Result<()> {
        let id = self.app_instance_id();

        if self.is_unloaded() || !self.state().allows_run() {
            return Err(ApplicationError::InstanceUnloaded(id.clone()).into());
        }

        let result = match self.application.try_lock() {
            Some(mut application) => self.run_locked(&mut **application),
            None => Err(ApplicationError::Runtime {
                instance: id.clone(),
                message: "instance is already running".to_string(),
            }
            .into()),
        };

        self.finalize_if_requested();
        result
    }

    fn run_locked(&self, application: &mut dyn Application) -> Result<()> {
        let id = self.app_instance_id();

        // An unload may have landed between the first check and the lock.
        if !self.transition(ApplicationState::Created, ApplicationState::Running) {
            return Err(ApplicationError::InstanceUnloaded(id.clone()).into());
        }

        let resources = self.select_resources();
        let Some(resources) = resources else {
            self.transition(ApplicationState::Running, ApplicationState::Created);
            return Err(ApplicationError::MissingResources(id.clone()).into());
        };

        let count = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(instance = %id, run = count, resources = resources.len(), "Running application");

        let outcome = catch_unwind(AssertUnwindSafe(|| application.run(&resources)));
        self.transition(ApplicationState::Running, ApplicationState::Created);

        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => panic_message(&*panic),
        };

        warn!(instance = %id, "Application run failed: {}", message);
        Err(ApplicationError::Runtime {
            instance: id.clone(),
            message,
        }
        .into())
    }

    fn select_resources(&self) -> Option<ResourceSet> {
        let required = self.package.required_resources();
        self.context
            .resource_pool()
            .all()
            .filter_by_note_id(self.context.note_id())
            .filter_by_paragraph_id(self.context.paragraph_id())
            .select(&required)
    }

    /// Unload the instance.
    ///
    /// Only the first call has an effect; it returns `true`. If a run is in
    /// progress the unload hook and the environment release are performed
    /// by that run once the application returns.
    pub fn unload(&self) -> bool {
        if self.unload_requested.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.state
            .store(ApplicationState::Unloaded.as_u8(), Ordering::SeqCst);
        info!(instance = %self.app_instance_id(), "Unloading application");

        self.finalize_if_requested();
        true
    }

    /// Finalize if an unload is pending and nobody is inside the instance.
    ///
    /// Called after every release of the instance lock, so whichever thread
    /// holds the lock last performs the finalization.
    fn finalize_if_requested(&self) {
        if !self.is_unloaded() || self.is_finalized() {
            return;
        }

        if let Some(mut application) = self.application.try_lock() {
            self.finalize(&mut **application);
        }
    }

    fn finalize(&self, application: &mut dyn Application) {
        if self.finalized.swap(true, Ordering::SeqCst) {
            return;
        }

        let id = self.app_instance_id();
        match catch_unwind(AssertUnwindSafe(|| application.unload())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(instance = %id, "Unload hook failed: {:#}", e),
            Err(panic) => warn!(instance = %id, "Unload hook {}", panic_message(&*panic)),
        }

        let lease = self.lease.lock().take();
        drop(lease);
        info!(instance = %id, environment = %self.environment_id, "Unloaded application");
    }

    fn transition(&self, from: ApplicationState, to: ApplicationState) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl std::fmt::Debug for ApplicationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationHandle")
            .field("app_instance_id", self.app_instance_id())
            .field("class_name", &self.package.class_name)
            .field("environment_id", &self.environment_id)
            .field("state", &self.state())
            .field("run_count", &self.run_count())
            .finish()
    }
}
