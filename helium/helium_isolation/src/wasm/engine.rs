//! WebAssembly engine.
//!
//! One engine compiles every guest module of the host and links them all
//! against the same host functions. Instances never share a store.

use std::path::Path;

use tracing::{debug, trace};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store};

use helium_core::error::{IsolationError, Result};

use crate::wasm::hostcall::{check_imports, link_host_functions, HostState};

/// A WebAssembly engine with the host functions pre-linked.
#[derive(Clone)]
pub struct WasmEngine {
    /// The wasmtime engine.
    engine: Engine,

    /// Linker holding the host-shared interface.
    linker: Linker<HostState>,
}

impl WasmEngine {
    /// Create a new WebAssembly engine.
    pub fn new() -> Result<Self> {
        let mut config = Config::new();
        config.wasm_multi_value(true);

        let engine = Engine::new(&config)
            .map_err(|e| IsolationError::ConstructionFailed(e.to_string()))?;

        let mut linker = Linker::new(&engine);
        link_host_functions(&mut linker)
            .map_err(|e| IsolationError::ConstructionFailed(e.to_string()))?;

        debug!("Created WebAssembly engine");

        Ok(Self { engine, linker })
    }

    /// Compile a module from a `.wasm` or `.wat` file.
    ///
    /// # Returns
    ///
    /// * `Ok(Module)` - The compiled module, its imports checked.
    /// * `Err(IsolationError::CompilationFailed)` - If the file cannot be
    ///   read or compiled.
    /// * `Err(IsolationError::SymbolVisibility)` - If the module imports
    ///   anything outside the host interface.
    pub fn compile_file(&self, artifact: &Path) -> Result<Module> {
        trace!(artifact = %artifact.display(), "Compiling WebAssembly module");

        let compile_error = |reason: String| IsolationError::CompilationFailed {
            artifact: artifact.display().to_string(),
            reason,
        };

        let bytes = std::fs::read(artifact).map_err(|e| compile_error(e.to_string()))?;
        let module = Module::new(&self.engine, &bytes).map_err(|e| compile_error(e.to_string()))?;

        check_imports(&module, artifact)?;
        Ok(module)
    }

    /// Instantiate a module in a fresh store.
    pub fn instantiate(
        &self,
        module: &Module,
        state: HostState,
    ) -> anyhow::Result<(Store<HostState>, Instance)> {
        let mut store = Store::new(&self.engine, state);
        let instance = self.linker.instantiate(&mut store, module)?;
        Ok((store, instance))
    }

    /// Get the underlying Wasmtime engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
