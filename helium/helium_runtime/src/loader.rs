//! Application loader.
//!
//! The loader turns a package descriptor and a context into a running
//! application instance: it resolves the package's artifact to a
//! classpath, leases the isolation environment for that classpath,
//! instantiates the entry point inside it, and registers the resulting
//! handle under the context's instance id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use helium_core::error::{ApplicationError, Error, Result};
use helium_core::id::AppInstanceId;
use helium_core::types::{ApplicationContext, Classpath, PackageDescriptor, PackageType};
use helium_isolation::{
    ArtifactLoader, BundleCatalog, EnvironmentFactory, EnvironmentKey, WasmArtifactLoader,
};
use helium_resolver::DependencyResolver;

use crate::config::LoaderConfig;
use crate::handle::ApplicationHandle;
use crate::registry::ApplicationRegistry;

struct LoaderInner {
    config: LoaderConfig,
    resolver: Arc<dyn DependencyResolver>,
    factory: EnvironmentFactory,
    registry: Arc<ApplicationRegistry>,
    /// Resolved classpaths by artifact string, kept while their
    /// environment is cached
    classpaths: DashMap<String, Classpath>,
}

/// Loads, tracks and unloads application instances
#[derive(Clone)]
pub struct ApplicationLoader {
    inner: Arc<LoaderInner>,
}

impl ApplicationLoader {
    /// Create a loader from its parts.
    pub fn new(
        config: LoaderConfig,
        resolver: Arc<dyn DependencyResolver>,
        factory: EnvironmentFactory,
        registry: Arc<ApplicationRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                config,
                resolver,
                factory,
                registry,
                classpaths: DashMap::new(),
            }),
        }
    }

    /// Create a loader that resolves through the configured repositories
    /// and loads in-process bundles from `catalog` and WebAssembly modules.
    pub fn from_config(config: LoaderConfig, catalog: Arc<BundleCatalog>) -> Result<Self> {
        config.validate()?;

        let wasm = Arc::new(WasmArtifactLoader::new()?);
        let loaders = vec![
            catalog as Arc<dyn ArtifactLoader>,
            wasm as Arc<dyn ArtifactLoader>,
        ];
        let resolver = Arc::new(config.resolver());

        Ok(Self::new(
            config,
            resolver,
            EnvironmentFactory::new(loaders),
            Arc::new(ApplicationRegistry::new()),
        ))
    }

    /// Loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// The registry this loader records instances in.
    pub fn registry(&self) -> &Arc<ApplicationRegistry> {
        &self.inner.registry
    }

    /// The environment factory this loader leases from.
    pub fn factory(&self) -> &EnvironmentFactory {
        &self.inner.factory
    }

    /// Load an application.
    ///
    /// Resolution, environment construction and instantiation run on the
    /// blocking pool and are bounded by the configured load timeout. On
    /// failure nothing is registered, and an environment built for this
    /// load is released unless another instance holds it.
    ///
    /// # Arguments
    ///
    /// * `package` - The package to load. Must be an `APPLICATION` package.
    /// * `context` - The context the instance is bound to.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<ApplicationHandle>)` - The registered handle, in state `CREATED`.
    /// * `Err(Error)` - If the package is rejected or any load step fails.
    pub async fn load(
        &self,
        package: PackageDescriptor,
        context: ApplicationContext,
    ) -> Result<Arc<ApplicationHandle>> {
        if package.package_type != PackageType::Application {
            return Err(
                ApplicationError::UnsupportedPackageType(package.package_type.to_string()).into(),
            );
        }
        package.validate()?;

        let id = context.app_instance_id().clone();
        if id.is_empty() {
            return Err(ApplicationError::InvalidDescriptor(
                "application instance id cannot be empty".to_string(),
            )
            .into());
        }
        if self.inner.registry.contains(&id) {
            return Err(ApplicationError::DuplicateInstance(id).into());
        }

        info!(
            instance = %id,
            package = %package.name,
            artifact = %package.artifact,
            class = %package.class_name,
            "Loading application"
        );

        let inner = Arc::clone(&self.inner);
        let class_name = package.class_name.clone();
        let work = task::spawn_blocking(move || inner.instantiate(package, context));

        let limit = self.inner.config.load_timeout();
        let handle = match timeout(limit, work).await {
            Ok(Ok(Ok(handle))) => handle,
            Ok(Ok(Err(e))) => {
                self.inner.prune_classpaths();
                return Err(e);
            }
            Ok(Err(join_error)) => {
                self.inner.prune_classpaths();
                return Err(ApplicationError::Instantiation {
                    class_name,
                    reason: join_error.to_string(),
                }
                .into())
            }
            Err(_) => {
                let millis = self.inner.config.load_timeout_ms;
                warn!(instance = %id, "Load timed out after {}ms", millis);
                return Err(Error::Timeout(millis));
            }
        };

        let handle = Arc::new(handle);
        if let Err(e) = self.inner.registry.register(Arc::clone(&handle)) {
            handle.unload();
            return Err(e);
        }

        info!(
            instance = %id,
            environment = %handle.environment_id(),
            "Loaded application"
        );
        Ok(handle)
    }

    /// Unload an application instance.
    ///
    /// The instance leaves the registry immediately. Its unload hook runs
    /// and its environment lease is dropped now, or when its current run
    /// returns. Memoized classpaths whose environment is gone are dropped.
    pub fn unload(&self, id: &AppInstanceId) -> Result<()> {
        let handle = self
            .inner
            .registry
            .unregister(id)
            .ok_or_else(|| ApplicationError::UnknownInstance(id.clone()))?;

        handle.unload();
        self.inner.prune_classpaths();
        Ok(())
    }

    /// Get a loaded application instance.
    pub fn get(&self, id: &AppInstanceId) -> Result<Arc<ApplicationHandle>> {
        self.inner
            .registry
            .get(id)
            .filter(|handle| !handle.is_unloaded())
            .ok_or_else(|| ApplicationError::UnknownInstance(id.clone()).into())
    }

    /// Ids of the loaded application instances, sorted.
    pub fn list(&self) -> Vec<AppInstanceId> {
        self.inner.registry.ids()
    }

    /// Unload every instance. Returns how many were unloaded.
    pub fn shutdown(&self) -> usize {
        let ids = self.list();
        let mut unloaded = 0;

        for id in &ids {
            // Instances unloaded concurrently are simply skipped.
            if self.unload(id).is_ok() {
                unloaded += 1;
            }
        }

        info!("Shut down application loader, unloaded {} instances", unloaded);
        unloaded
    }

    /// Forget memoized classpaths, forcing the next load of every artifact
    /// to resolve again.
    pub fn clear_resolution_cache(&self) {
        self.inner.classpaths.clear();
    }
}

impl LoaderInner {
    /// Resolve the package's artifact and key its environment.
    fn environment_key(&self, package: &PackageDescriptor) -> Result<EnvironmentKey> {
        let artifact = package.coordinates().join(",");

        let memoized = self.classpaths.get(&artifact).map(|c| c.value().clone());
        if let Some(classpath) = memoized {
            debug!(artifact = %artifact, "Classpath cache hit");
            return Ok(EnvironmentKey::new(artifact, classpath));
        }

        let classpath = self
            .resolver
            .resolve(&package.coordinates(), &self.config.cache_directory)?;
        self.classpaths.insert(artifact.clone(), classpath.clone());
        Ok(EnvironmentKey::new(artifact, classpath))
    }

    /// Drop memoized classpaths whose environment is no longer cached.
    fn prune_classpaths(&self) {
        self.classpaths.retain(|artifact, classpath| {
            self.factory
                .contains(EnvironmentKey::new(artifact.clone(), classpath.clone()))
        });
    }

    fn instantiate(
        &self,
        package: PackageDescriptor,
        context: ApplicationContext,
    ) -> Result<ApplicationHandle> {
        let key = self.environment_key(&package)?;
        let lease = self.factory.get_or_create(key)?;
        let application = lease.instantiate(&package.class_name, &context)?;

        Ok(ApplicationHandle::new(package, context, application, lease))
    }
}

impl std::fmt::Debug for ApplicationLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationLoader")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}
