//! Integration tests for the application loader.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use helium_core::error::{ApplicationError, Error, ResolutionError};
use helium_core::id::AppInstanceId;
use helium_core::traits::Application;
use helium_core::types::{
    ApplicationContext, ApplicationState, BufferedOutput, Classpath, LocalResourcePool,
    PackageDescriptor, PackageType, ResourceSet,
};
use helium_isolation::{ArtifactLoader, Bundle, BundleCatalog, EnvironmentFactory};
use helium_resolver::DependencyResolver;
use helium_runtime::{ApplicationLoader, ApplicationRegistry, LoaderConfig};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Counts its runs and unloads, like a paragraph-bound app would count
/// renders.
struct MockApplication1 {
    runs: Arc<AtomicUsize>,
    unloads: Arc<AtomicUsize>,
}

impl Application for MockApplication1 {
    fn run(&mut self, _resources: &ResourceSet) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unload(&mut self) -> anyhow::Result<()> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Fixture {
    _dir: TempDir,
    loader: ApplicationLoader,
    runs: Arc<AtomicUsize>,
    unloads: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut LoaderConfig)) -> Self {
        init_tracing();
        let dir = TempDir::new().unwrap();
        for artifact in ["artifact1", "artifact2", "shared.jar", "broken.jar"] {
            fs::write(dir.path().join(artifact), artifact).unwrap();
        }

        let runs = Arc::new(AtomicUsize::new(0));
        let unloads = Arc::new(AtomicUsize::new(0));
        let mock = {
            let runs = runs.clone();
            let unloads = unloads.clone();
            move |_ctx: &ApplicationContext| -> anyhow::Result<Box<dyn Application>> {
                Ok(Box::new(MockApplication1 {
                    runs: runs.clone(),
                    unloads: unloads.clone(),
                }))
            }
        };

        let catalog = Arc::new(BundleCatalog::new());
        catalog.register(
            "artifact1",
            Bundle::new().with_application("MockApplication1", mock.clone()),
        );
        catalog.register(
            "artifact2",
            Bundle::new().with_application("MockApplication1", mock),
        );
        catalog.register(
            "broken.jar",
            Bundle::new().with_application(
                "org.example.Broken",
                |_ctx: &ApplicationContext| -> anyhow::Result<Box<dyn Application>> {
                    anyhow::bail!("no database configured")
                },
            ),
        );

        let mut config = LoaderConfig {
            cache_directory: dir.path().join("local-repo"),
            local_root: dir.path().to_path_buf(),
            ..LoaderConfig::default()
        };
        adjust(&mut config);

        let loader = ApplicationLoader::from_config(config, catalog).unwrap();
        Self {
            _dir: dir,
            loader,
            runs,
            unloads,
        }
    }
}

fn package(artifact: &str) -> PackageDescriptor {
    PackageDescriptor::new(
        PackageType::Application,
        "name1",
        "desc1",
        artifact,
        "MockApplication1",
        vec![vec![]],
        "license",
        "icon",
    )
}

fn context(instance: &str) -> ApplicationContext {
    ApplicationContext::new(
        "note1",
        "paragraph1",
        instance,
        Arc::new(LocalResourcePool::new("pool1")),
        Arc::new(BufferedOutput::new()),
    )
}

#[tokio::test]
async fn test_load_and_unload_mock_application() {
    let fixture = Fixture::new();

    let handle = fixture
        .loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap();

    assert!(!handle.is_unloaded());
    assert_eq!(handle.state(), ApplicationState::Created);
    assert_eq!(handle.run_count(), 0);
    assert_eq!(fixture.runs.load(Ordering::SeqCst), 0);
    assert_eq!(handle.app_instance_id().as_str(), "app1");
    assert_eq!(handle.context().note_id(), "note1");

    fixture.loader.unload(handle.app_instance_id()).unwrap();

    assert!(handle.is_unloaded());
    assert_eq!(handle.state(), ApplicationState::Unloaded);
    assert_eq!(handle.run_count(), 0);
    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 1);
    assert!(fixture.loader.registry().is_empty());
    assert_eq!(fixture.loader.factory().cached_count(), 0);
}

#[tokio::test]
async fn test_run_after_unload_fails() {
    let fixture = Fixture::new();
    let handle = fixture
        .loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap();

    for _ in 0..3 {
        handle.run().unwrap();
    }
    assert_eq!(handle.run_count(), 3);

    fixture.loader.unload(handle.app_instance_id()).unwrap();
    assert!(handle.is_unloaded());
    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 1);

    let err = handle.run().unwrap_err();
    assert!(matches!(
        err,
        Error::Application(ApplicationError::InstanceUnloaded(_))
    ));
    assert_eq!(fixture.runs.load(Ordering::SeqCst), 3);

    // a second unload through the handle is a no-op
    assert!(!handle.unload());
    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_same_artifact_shares_environment() {
    let fixture = Fixture::new();

    let first = fixture
        .loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap();
    let second = fixture
        .loader
        .load(package("artifact1"), context("app2"))
        .await
        .unwrap();

    assert_eq!(fixture.loader.registry().len(), 2);
    assert_eq!(first.environment_id(), second.environment_id());
    assert_eq!(fixture.loader.factory().cached_count(), 1);

    fixture.loader.unload(first.app_instance_id()).unwrap();
    assert_eq!(fixture.loader.factory().cached_count(), 1);
    second.run().unwrap();

    fixture.loader.unload(second.app_instance_id()).unwrap();
    assert_eq!(fixture.loader.factory().cached_count(), 0);
}

#[tokio::test]
async fn test_distinct_artifacts_never_share_environment() {
    let fixture = Fixture::new();

    let first = fixture
        .loader
        .load(package("artifact1, shared.jar"), context("app1"))
        .await
        .unwrap();
    let second = fixture
        .loader
        .load(package("artifact2, shared.jar"), context("app2"))
        .await
        .unwrap();

    assert_ne!(first.environment_id(), second.environment_id());
    assert_eq!(fixture.loader.factory().cached_count(), 2);
}

#[tokio::test]
async fn test_distinct_artifacts_with_identical_classpath() {
    let fixture = Fixture::new();

    let mut environments = Vec::new();
    for (instance, artifact) in [
        ("app1", "artifact1"),
        ("app2", "artifact1, artifact1"),
        ("app3", "./artifact1"),
    ] {
        let handle = fixture
            .loader
            .load(package(artifact), context(instance))
            .await
            .unwrap();
        environments.push(handle.environment_id());
    }

    assert_ne!(environments[0], environments[1]);
    assert_ne!(environments[0], environments[2]);
    assert_ne!(environments[1], environments[2]);
    assert_eq!(fixture.loader.factory().cached_count(), 3);

    // the same coordinates still share
    let again = fixture
        .loader
        .load(package(" artifact1 "), context("app4"))
        .await
        .unwrap();
    assert_eq!(again.environment_id(), environments[0]);
    assert_eq!(fixture.loader.factory().cached_count(), 3);
}

#[tokio::test]
async fn test_unknown_instance() {
    let fixture = Fixture::new();
    fixture
        .loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap();

    let err = fixture.loader.unload(&"missing".into()).unwrap_err();
    assert!(matches!(
        err,
        Error::Application(ApplicationError::UnknownInstance(_))
    ));
    assert_eq!(fixture.loader.list(), vec![AppInstanceId::from("app1")]);

    fixture.loader.unload(&"app1".into()).unwrap();
    assert!(matches!(
        fixture.loader.get(&"app1".into()),
        Err(Error::Application(ApplicationError::UnknownInstance(_)))
    ));
    assert!(matches!(
        fixture.loader.unload(&"app1".into()),
        Err(Error::Application(ApplicationError::UnknownInstance(_)))
    ));
}

#[tokio::test]
async fn test_runs_do_not_change_unload_outcome() {
    let fixture = Fixture::new();

    let idle = fixture
        .loader
        .load(package("artifact1"), context("idle"))
        .await
        .unwrap();
    let busy = fixture
        .loader
        .load(package("artifact1"), context("busy"))
        .await
        .unwrap();
    for _ in 0..10 {
        busy.run().unwrap();
    }

    fixture.loader.unload(idle.app_instance_id()).unwrap();
    fixture.loader.unload(busy.app_instance_id()).unwrap();

    for handle in [&idle, &busy] {
        assert!(handle.is_unloaded());
        assert!(handle.is_finalized());
        assert_eq!(handle.state(), ApplicationState::Unloaded);
    }
    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.loader.factory().cached_count(), 0);
}

#[tokio::test]
async fn test_nonexistent_artifact() {
    let fixture = Fixture::new();

    let err = fixture
        .loader
        .load(package("does-not-exist.jar"), context("app1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Resolution(ResolutionError::NotFound(_))
    ));
    assert!(fixture.loader.registry().is_empty());
    assert_eq!(fixture.loader.factory().cached_count(), 0);

    let err = fixture
        .loader
        .load(package("org.example:missing:1.0"), context("app1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Resolution(_)));
    assert!(fixture.loader.registry().is_empty());
}

#[tokio::test]
async fn test_load_failures_release_environment() {
    let fixture = Fixture::new();

    let mut missing_class = package("artifact1");
    missing_class.class_name = "org.example.Missing".to_string();
    let err = fixture
        .loader
        .load(missing_class, context("app1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Application(ApplicationError::PackageNotFound { .. })
    ));
    assert_eq!(fixture.loader.factory().cached_count(), 0);

    let mut broken = package("broken.jar");
    broken.class_name = "org.example.Broken".to_string();
    let err = fixture
        .loader
        .load(broken, context("app1"))
        .await
        .unwrap_err();
    match err {
        Error::Application(ApplicationError::Instantiation { class_name, reason }) => {
            assert_eq!(class_name, "org.example.Broken");
            assert!(reason.contains("no database configured"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fixture.loader.factory().cached_count(), 0);
    assert!(fixture.loader.registry().is_empty());
}

#[tokio::test]
async fn test_failed_load_keeps_shared_environment() {
    let fixture = Fixture::new();
    let handle = fixture
        .loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap();

    let mut missing_class = package("artifact1");
    missing_class.class_name = "org.example.Missing".to_string();
    assert!(fixture
        .loader
        .load(missing_class, context("app2"))
        .await
        .is_err());

    assert_eq!(fixture.loader.factory().cached_count(), 1);
    handle.run().unwrap();
}

#[tokio::test]
async fn test_rejected_packages() {
    let fixture = Fixture::new();

    let mut spell = package("artifact1");
    spell.package_type = PackageType::Spell;
    let err = fixture
        .loader
        .load(spell, context("app1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Application(ApplicationError::UnsupportedPackageType(_))
    ));

    let err = fixture
        .loader
        .load(package(""), context("app1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Application(ApplicationError::InvalidDescriptor(_))
    ));

    fixture
        .loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap();
    let err = fixture
        .loader
        .load(package("artifact2"), context("app1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Application(ApplicationError::DuplicateInstance(_))
    ));
    assert_eq!(fixture.loader.registry().len(), 1);
    assert_eq!(fixture.loader.factory().cached_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_loads_share_one_environment() {
    let fixture = Fixture::new();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let loader = fixture.loader.clone();
        tasks.push(tokio::spawn(async move {
            loader
                .load(package("artifact1"), context(&format!("app{}", i)))
                .await
        }));
    }

    let mut environments = Vec::new();
    for task in tasks {
        let handle = task.await.unwrap().unwrap();
        environments.push(handle.environment_id());
    }

    environments.dedup();
    assert_eq!(environments.len(), 1);
    assert_eq!(fixture.loader.registry().len(), 8);

    assert_eq!(fixture.loader.shutdown(), 8);
    assert!(fixture.loader.list().is_empty());
    assert_eq!(fixture.loader.factory().cached_count(), 0);
    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 8);
}

/// Resolver that never finishes in time.
struct SlowResolver;

impl DependencyResolver for SlowResolver {
    fn resolve(&self, _coordinates: &[String], _cache_dir: &Path) -> helium_core::Result<Classpath> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(Classpath::new(["/slow/artifact1"]))
    }
}

#[tokio::test]
async fn test_load_timeout() {
    init_tracing();
    let config = LoaderConfig {
        load_timeout_ms: 50,
        ..LoaderConfig::default()
    };
    let registry = Arc::new(ApplicationRegistry::new());
    let factory = EnvironmentFactory::new(vec![
        Arc::new(BundleCatalog::new()) as Arc<dyn ArtifactLoader>
    ]);
    let loader = ApplicationLoader::new(config, Arc::new(SlowResolver), factory, registry.clone());

    let err = loader
        .load(package("artifact1"), context("app1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(50)));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_classpath_is_resolved_once_per_artifact() {
    struct CountingResolver {
        calls: AtomicUsize,
        root: std::path::PathBuf,
    }

    impl DependencyResolver for CountingResolver {
        fn resolve(
            &self,
            coordinates: &[String],
            _cache_dir: &Path,
        ) -> helium_core::Result<Classpath> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Classpath::new(coordinates.iter().map(|c| self.root.join(c))))
        }
    }

    init_tracing();
    let catalog = Arc::new(BundleCatalog::new());
    catalog.register(
        "artifact1",
        Bundle::new().with_application(
            "MockApplication1",
            |_ctx: &ApplicationContext| -> anyhow::Result<Box<dyn Application>> {
                Ok(Box::new(MockApplication1 {
                    runs: Arc::default(),
                    unloads: Arc::default(),
                }))
            },
        ),
    );

    let resolver = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
        root: "/virtual".into(),
    });
    let loader = ApplicationLoader::new(
        LoaderConfig::default(),
        resolver.clone(),
        EnvironmentFactory::new(vec![catalog as Arc<dyn ArtifactLoader>]),
        Arc::new(ApplicationRegistry::new()),
    );

    loader.load(package("artifact1"), context("app1")).await.unwrap();
    loader.load(package("artifact1"), context("app2")).await.unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

    loader.clear_resolution_cache();
    loader.load(package("artifact1"), context("app3")).await.unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);

    // the classpath is kept while any instance holds the environment
    loader.unload(&"app1".into()).unwrap();
    loader.unload(&"app2".into()).unwrap();
    loader.load(package("artifact1"), context("app4")).await.unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);

    // and dropped once the environment is released
    loader.unload(&"app3".into()).unwrap();
    loader.unload(&"app4".into()).unwrap();
    assert_eq!(loader.factory().cached_count(), 0);
    loader.load(package("artifact1"), context("app5")).await.unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
}
