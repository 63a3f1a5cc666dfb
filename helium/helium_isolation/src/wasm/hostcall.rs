//! Host calls.
//!
//! Guest modules may import exactly the functions in [`HOST_FUNCTIONS`]
//! from the `host` module. Anything else would let a package reach symbols
//! outside its classpath, so [`check_imports`] rejects the module before it
//! joins an environment.

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::trace;
use wasmtime::{Caller, ExternType, Linker, Module, ValType};

use helium_core::error::{IsolationError, Result};
use helium_core::types::OutputSink;
use helium_core::utils::LogLevel;

/// Module name of the host-shared interface.
pub const HOST_MODULE: &str = "host";

/// Host functions and their parameter counts. All parameters are `i32`
/// and none return a value.
pub const HOST_FUNCTIONS: &[(&str, usize)] = &[("output_write", 2), ("log", 3)];

/// Per-instance state reachable from host calls.
pub struct HostState {
    /// Instance the store belongs to.
    pub instance_id: String,

    /// Paragraph output of the instance.
    pub output: Arc<dyn OutputSink>,
}

impl HostState {
    /// Create host state for one instance.
    pub fn new(instance_id: impl Into<String>, output: Arc<dyn OutputSink>) -> Self {
        Self {
            instance_id: instance_id.into(),
            output,
        }
    }
}

/// Check every import of `module` against the host whitelist.
pub fn check_imports(module: &Module, artifact: &Path) -> Result<()> {
    for import in module.imports() {
        let allowed = import.module() == HOST_MODULE
            && HOST_FUNCTIONS.iter().any(|(name, arity)| {
                *name == import.name()
                    && matches!(import.ty(), ExternType::Func(ref ty)
                        if ty.params().len() == *arity
                            && ty.params().all(|p| matches!(p, ValType::I32))
                            && ty.results().len() == 0)
            });

        if !allowed {
            return Err(IsolationError::SymbolVisibility(format!(
                "{} imports '{}::{}', which is not a host-shared interface",
                artifact.display(),
                import.module(),
                import.name()
            ))
            .into());
        }
    }
    Ok(())
}

/// Read `len` bytes at `ptr` from the caller's exported memory as UTF-8.
fn read_guest_str(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> anyhow::Result<String> {
    let memory = caller
        .get_export("memory")
        .and_then(|export| export.into_memory())
        .ok_or_else(|| anyhow!("module does not export its memory"))?;

    let start = usize::try_from(ptr).map_err(|_| anyhow!("negative pointer {}", ptr))?;
    let len = usize::try_from(len).map_err(|_| anyhow!("negative length {}", len))?;
    let bytes = memory
        .data(&*caller)
        .get(start..start.saturating_add(len))
        .ok_or_else(|| anyhow!("out of bounds memory access at {}+{}", start, len))?;

    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Define the host functions in `linker`.
pub fn link_host_functions(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        HOST_MODULE,
        "output_write",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
            let text = read_guest_str(&mut caller, ptr, len)?;
            trace!(instance = %caller.data().instance_id, bytes = text.len(), "Guest output");
            caller.data().output.write(&text);
            Ok(())
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "log",
        |mut caller: Caller<'_, HostState>, level: i32, ptr: i32, len: i32| -> anyhow::Result<()> {
            let message = read_guest_str(&mut caller, ptr, len)?;
            LogLevel::from_guest(level).emit(&caller.data().instance_id, &message);
            Ok(())
        },
    )?;

    Ok(())
}
