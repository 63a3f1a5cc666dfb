//! Fixtures shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;

use helium_core::traits::Application;
use helium_core::types::{
    ApplicationContext, BufferedOutput, Classpath, LocalResourcePool, PackageDescriptor,
    ResourceSet,
};
use helium_isolation::{ArtifactLoader, Bundle, BundleCatalog, EnvironmentFactory};

use crate::handle::ApplicationHandle;

enum Mode {
    Succeed,
    FailEveryOther,
    Panic,
    Block {
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    },
}

struct RecorderState {
    mode: Mode,
    runs: AtomicUsize,
    unloads: AtomicUsize,
    last_resources: Mutex<Vec<String>>,
}

/// Application whose behaviour and call counts are observable from tests.
#[derive(Clone)]
pub(crate) struct Recorder {
    state: Arc<RecorderState>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::with_mode(Mode::Succeed)
    }
}

impl Recorder {
    fn with_mode(mode: Mode) -> Self {
        Self {
            state: Arc::new(RecorderState {
                mode,
                runs: AtomicUsize::new(0),
                unloads: AtomicUsize::new(0),
                last_resources: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn failing_every_other() -> Self {
        Self::with_mode(Mode::FailEveryOther)
    }

    pub(crate) fn panicking() -> Self {
        Self::with_mode(Mode::Panic)
    }

    /// Signals `entered` when a run starts, then waits on `release`.
    pub(crate) fn blocking(entered: Sender<()>, release: Receiver<()>) -> Self {
        Self::with_mode(Mode::Block {
            entered: Mutex::new(entered),
            release: Mutex::new(release),
        })
    }

    pub(crate) fn runs(&self) -> usize {
        self.state.runs.load(Ordering::SeqCst)
    }

    pub(crate) fn unloads(&self) -> usize {
        self.state.unloads.load(Ordering::SeqCst)
    }

    pub(crate) fn last_resources(&self) -> Vec<String> {
        self.state.last_resources.lock().clone()
    }

    pub(crate) fn constructor(
        &self,
    ) -> impl Fn(&ApplicationContext) -> anyhow::Result<Box<dyn Application>> + Send + Sync + 'static
    {
        let recorder = self.clone();
        move |_ctx: &ApplicationContext| -> anyhow::Result<Box<dyn Application>> {
            Ok(Box::new(recorder.clone()))
        }
    }
}

impl Application for Recorder {
    fn run(&mut self, resources: &ResourceSet) -> anyhow::Result<()> {
        let run = self.state.runs.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.last_resources.lock() = resources.iter().map(|r| r.id.name.clone()).collect();

        match &self.state.mode {
            Mode::Succeed => Ok(()),
            Mode::FailEveryOther if run % 2 == 1 => anyhow::bail!("odd run {}", run),
            Mode::FailEveryOther => Ok(()),
            Mode::Panic => panic!("recorder exploded"),
            Mode::Block { entered, release } => {
                let _ = entered.lock().send(());
                let _ = release.lock().recv();
                Ok(())
            }
        }
    }

    fn unload(&mut self) -> anyhow::Result<()> {
        self.state.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn handle_for<F>(
    instance: &str,
    constructor: F,
) -> (ApplicationHandle, EnvironmentFactory, Classpath)
where
    F: Fn(&ApplicationContext) -> anyhow::Result<Box<dyn Application>> + Send + Sync + 'static,
{
    handle_with_config(instance, constructor, Vec::new())
}

pub(crate) fn handle_with_config<F>(
    instance: &str,
    constructor: F,
    config: Vec<Vec<String>>,
) -> (ApplicationHandle, EnvironmentFactory, Classpath)
where
    F: Fn(&ApplicationContext) -> anyhow::Result<Box<dyn Application>> + Send + Sync + 'static,
{
    let catalog = Arc::new(BundleCatalog::new());
    catalog.register(
        "recorder.jar",
        Bundle::new().with_application("org.example.Recorder", constructor),
    );

    let factory = EnvironmentFactory::new(vec![catalog as Arc<dyn ArtifactLoader>]);
    let classpath = Classpath::new(["/virtual/recorder.jar"]);
    let lease = factory.get_or_create(&classpath).unwrap();

    let package = PackageDescriptor::application("recorder", "recorder.jar", "org.example.Recorder")
        .with_config(config);
    let context = ApplicationContext::new(
        "note1",
        "paragraph1",
        instance,
        Arc::new(LocalResourcePool::new("pool1")),
        Arc::new(BufferedOutput::new()),
    );
    let application = lease.instantiate("org.example.Recorder", &context).unwrap();

    let handle = ApplicationHandle::new(package, context, application, lease);
    (handle, factory, classpath)
}
