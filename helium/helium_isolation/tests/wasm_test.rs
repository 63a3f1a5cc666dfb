//! WebAssembly artifact tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use helium_core::error::{Error, IsolationError};
use helium_core::types::{ApplicationContext, BufferedOutput, Classpath, LocalResourcePool, ResourceSet};
use helium_isolation::*;
use tempfile::TempDir;

const COUNTER_WAT: &str = r#"
(module
  (import "host" "output_write" (func $write (param i32 i32)))
  (import "host" "log" (func $log (param i32 i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "hello")
  (func (export "org.example.Counter#run")
    (i32.store8 (i32.const 32)
      (i32.add (i32.load8_u (i32.const 32)) (i32.const 1)))
    (i32.store8 (i32.const 33)
      (i32.add (i32.load8_u (i32.const 32)) (i32.const 48)))
    (call $write (i32.const 33) (i32.const 1))
    (call $log (i32.const 2) (i32.const 0) (i32.const 5)))
  (func (export "org.example.Counter#unload")
    (call $write (i32.const 0) (i32.const 5)))
  (func (export "org.example.Boom#run")
    unreachable))
"#;

const ESCAPING_WAT: &str = r#"
(module
  (import "env" "system" (func (param i32)))
  (func (export "org.example.Escape#run")))
"#;

fn write_module(dir: &TempDir, name: &str, wat: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, wat).unwrap();
    path
}

fn context(instance: &str) -> (ApplicationContext, Arc<BufferedOutput>) {
    let output = Arc::new(BufferedOutput::new());
    let ctx = ApplicationContext::new(
        "note1",
        "paragraph1",
        instance,
        Arc::new(LocalResourcePool::new("pool")),
        output.clone(),
    );
    (ctx, output)
}

fn factory() -> EnvironmentFactory {
    let loader = WasmArtifactLoader::new().unwrap();
    EnvironmentFactory::new(vec![Arc::new(loader) as Arc<dyn ArtifactLoader>])
}

#[test]
fn test_wasm_classes_run_in_separate_stores() {
    let dir = TempDir::new().unwrap();
    let module = write_module(&dir, "counter.wat", COUNTER_WAT);
    let factory = factory();
    let lease = factory.get_or_create(&Classpath::new([module])).unwrap();

    assert_eq!(
        lease.class_names(),
        vec!["org.example.Boom", "org.example.Counter"]
    );

    let (ctx_a, out_a) = context("a");
    let (ctx_b, out_b) = context("b");
    let mut a = lease.instantiate("org.example.Counter", &ctx_a).unwrap();
    let mut b = lease.instantiate("org.example.Counter", &ctx_b).unwrap();

    a.run(&ResourceSet::new()).unwrap();
    a.run(&ResourceSet::new()).unwrap();
    b.run(&ResourceSet::new()).unwrap();
    assert_eq!(out_a.contents(), "12");
    assert_eq!(out_b.contents(), "1");

    a.unload().unwrap();
    assert_eq!(out_a.contents(), "12hello");
}

#[test]
fn test_wasm_trap_is_an_error() {
    let dir = TempDir::new().unwrap();
    let module = write_module(&dir, "counter.wat", COUNTER_WAT);
    let lease = factory().get_or_create(&Classpath::new([module])).unwrap();

    let (ctx, _) = context("boom");
    let mut boom = lease.instantiate("org.example.Boom", &ctx).unwrap();
    assert!(boom.run(&ResourceSet::new()).is_err());
    // Without an unload export, unloading is a no-op.
    assert!(boom.unload().is_ok());
}

#[test]
fn test_imports_outside_host_interface_are_rejected() {
    let dir = TempDir::new().unwrap();
    let module = write_module(&dir, "escape.wat", ESCAPING_WAT);
    let classpath = Classpath::new([module]);
    let factory = factory();

    let err = factory.get_or_create(&classpath).unwrap_err();
    assert!(matches!(
        err,
        Error::Isolation(IsolationError::SymbolVisibility(_))
    ));
    assert_eq!(factory.cached_count(), 0);
}

#[test]
fn test_invalid_module_fails_compilation() {
    let dir = TempDir::new().unwrap();
    let module = write_module(&dir, "broken.wasm", "(module (func");
    let err = factory()
        .get_or_create(&Classpath::new([module]))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Isolation(IsolationError::CompilationFailed { .. })
    ));
}
