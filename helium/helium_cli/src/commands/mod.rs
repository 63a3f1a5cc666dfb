pub mod resolve;
pub mod run;

use std::path::Path;

use anyhow::Context;
use helium_runtime::LoaderConfig;

/// Load the loader configuration, falling back to the defaults.
pub async fn load_config(path: Option<&Path>) -> anyhow::Result<LoaderConfig> {
    LoaderConfig::load(path)
        .await
        .context("Failed to load loader configuration")
}
