//! WebAssembly isolation.
//!
//! Guest modules compiled with `wasmtime`. A module sees only its own
//! memory and the host-shared interface.

pub mod engine;
pub mod hostcall;
pub mod module;

pub use engine::WasmEngine;
pub use hostcall::{HostState, HOST_FUNCTIONS, HOST_MODULE};
pub use module::{WasmApplication, WasmArtifactLoader};
