use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use helium_core::types::{ApplicationContext, BufferedOutput, LocalResourcePool, PackageDescriptor};
use helium_isolation::BundleCatalog;
use helium_runtime::ApplicationLoader;

/// Options of the `run` command
pub struct RunOptions {
    pub package: PathBuf,
    pub note: String,
    pub paragraph: String,
    pub instance: Option<String>,
    pub times: usize,
    pub config: Option<PathBuf>,
    pub local_root: Option<PathBuf>,
}

/// Load the package, run it `times` times, print its output and unload it.
pub async fn run(options: RunOptions) -> anyhow::Result<()> {
    let mut config = super::load_config(options.config.as_deref()).await?;
    if let Some(local_root) = options.local_root {
        config.local_root = local_root;
    }

    let content = tokio::fs::read_to_string(&options.package)
        .await
        .with_context(|| format!("Failed to read package {}", options.package.display()))?;
    let package: PackageDescriptor = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse package {}", options.package.display()))?;

    let instance = options
        .instance
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let output = Arc::new(BufferedOutput::new());
    let context = ApplicationContext::new(
        options.note,
        options.paragraph,
        instance,
        Arc::new(LocalResourcePool::new("cli")),
        output.clone(),
    );

    let loader = ApplicationLoader::from_config(config, Arc::new(BundleCatalog::new()))
        .context("Failed to create application loader")?;
    let handle = loader
        .load(package, context)
        .await
        .context("Failed to load application")?;
    info!(instance = %handle.app_instance_id(), "Application loaded");

    let mut outcome = Ok(());
    for _ in 0..options.times {
        if let Err(e) = handle.run() {
            outcome = Err(e).context("Application run failed");
            break;
        }
    }

    loader.unload(handle.app_instance_id())?;
    print!("{}", output.contents());
    outcome
}
