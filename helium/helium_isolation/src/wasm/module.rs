//! WebAssembly artifacts.
//!
//! A module defines application class `C` by exporting a function named
//! `C#run`, and optionally `C#unload`. Both take no parameters and return
//! nothing; a trap is reported as an application failure.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use wasmtime::{ExternType, Module, Store, TypedFunc};

use helium_core::error::{IsolationError, Result};
use helium_core::traits::Application;
use helium_core::types::{ApplicationContext, ResourceSet};

use crate::entry::EntryPoint;
use crate::loader::ArtifactLoader;
use crate::wasm::engine::WasmEngine;
use crate::wasm::hostcall::HostState;

/// Export suffix of the run hook.
pub const RUN_SUFFIX: &str = "#run";

/// Export suffix of the unload hook.
pub const UNLOAD_SUFFIX: &str = "#unload";

/// Loads `.wasm` and `.wat` artifacts.
#[derive(Clone)]
pub struct WasmArtifactLoader {
    engine: Arc<WasmEngine>,
}

impl WasmArtifactLoader {
    /// Create a loader with its own engine.
    pub fn new() -> Result<Self> {
        Ok(Self::with_engine(Arc::new(WasmEngine::new()?)))
    }

    /// Create a loader sharing an engine.
    pub fn with_engine(engine: Arc<WasmEngine>) -> Self {
        Self { engine }
    }
}

fn is_unit_func(ty: &ExternType) -> bool {
    matches!(ty, ExternType::Func(f) if f.params().len() == 0 && f.results().len() == 0)
}

impl ArtifactLoader for WasmArtifactLoader {
    fn name(&self) -> &str {
        "wasm"
    }

    fn recognizes(&self, artifact: &Path) -> bool {
        matches!(
            artifact.extension().and_then(|e| e.to_str()),
            Some("wasm") | Some("wat")
        )
    }

    fn load(&self, artifact: &Path) -> Result<Vec<EntryPoint>> {
        let module = Arc::new(self.engine.compile_file(artifact)?);

        let mut entries = Vec::new();
        for export in module.exports() {
            let Some(class_name) = export.name().strip_suffix(RUN_SUFFIX) else {
                continue;
            };

            if !is_unit_func(&export.ty()) {
                return Err(IsolationError::CompilationFailed {
                    artifact: artifact.display().to_string(),
                    reason: format!("'{}' must be a function of no arguments", export.name()),
                }
                .into());
            }

            let unload_export = format!("{}{}", class_name, UNLOAD_SUFFIX);
            let has_unload = module
                .get_export(&unload_export)
                .is_some_and(|ty| is_unit_func(&ty));

            let class = WasmClass {
                engine: self.engine.clone(),
                module: module.clone(),
                run_export: export.name().to_string(),
                unload_export: has_unload.then_some(unload_export),
            };
            entries.push(EntryPoint::new(
                class_name,
                artifact,
                Arc::new(move |ctx: &ApplicationContext| class.instantiate(ctx)),
            ));
        }

        debug!(
            artifact = %artifact.display(),
            classes = entries.len(),
            "Loaded WebAssembly module"
        );
        Ok(entries)
    }
}

/// A compiled class: the module plus the exports that drive it.
struct WasmClass {
    engine: Arc<WasmEngine>,
    module: Arc<Module>,
    run_export: String,
    unload_export: Option<String>,
}

impl WasmClass {
    fn instantiate(&self, ctx: &ApplicationContext) -> anyhow::Result<Box<dyn Application>> {
        let state = HostState::new(ctx.app_instance_id().as_str(), ctx.output().clone());
        let (mut store, instance) = self.engine.instantiate(&self.module, state)?;

        let run = instance.get_typed_func::<(), ()>(&mut store, &self.run_export)?;
        let unload = match &self.unload_export {
            Some(name) => Some(instance.get_typed_func::<(), ()>(&mut store, name)?),
            None => None,
        };

        Ok(Box::new(WasmApplication { store, run, unload }))
    }
}

/// An application instance living in its own store.
pub struct WasmApplication {
    store: Store<HostState>,
    run: TypedFunc<(), ()>,
    unload: Option<TypedFunc<(), ()>>,
}

impl Application for WasmApplication {
    fn run(&mut self, _resources: &ResourceSet) -> anyhow::Result<()> {
        self.run.call(&mut self.store, ())
    }

    fn unload(&mut self) -> anyhow::Result<()> {
        match self.unload.take() {
            Some(unload) => unload.call(&mut self.store, ()),
            None => Ok(()),
        }
    }
}
