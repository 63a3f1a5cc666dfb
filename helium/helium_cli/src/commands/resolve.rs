use std::path::Path;

use anyhow::Context;
use helium_core::types::PackageDescriptor;
use helium_resolver::DependencyResolver;

/// Resolve `artifact` and print one classpath entry per line.
pub async fn resolve(artifact: &str, config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config).await?;
    let coordinates = PackageDescriptor::application("cli", artifact, "").coordinates();
    if coordinates.is_empty() {
        anyhow::bail!("No artifact coordinates given");
    }

    let resolver = config.resolver();
    let cache_directory = config.cache_directory.clone();
    let classpath = tokio::task::spawn_blocking(move || {
        resolver.resolve(&coordinates, &cache_directory)
    })
    .await
    .context("Resolver task failed")?
    .with_context(|| format!("Failed to resolve '{}'", artifact))?;

    for entry in classpath.iter() {
        println!("{}", entry.display());
    }
    Ok(())
}
