#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use extendkit::{CapabilityRegistry, CapabilitySet, FunctionRef, ObjectRef, Value};
use serde_json::Value as Json;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

pub fn compose_inspect() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_compose-inspect"))
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Write `manifest` to a temp file that lives as long as the handle.
pub fn manifest_file(manifest: &Json) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("failed to allocate manifest file")?;
    serde_json::to_writer(&mut file, manifest)?;
    file.flush()?;
    Ok(file)
}

/// Registry with a Number set exposing `double` and an Object set exposing
/// a `describe` method and a `kind` field.
pub fn fixture_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(
        "Number",
        CapabilitySet::new().method("double", |this, _| {
            Ok(Value::from(this.value().as_number().unwrap_or(0.0) * 2.0))
        }),
    );
    registry.register(
        "Object",
        CapabilitySet::new()
            .field("kind", "object")
            .method("describe", |this, _| {
                Ok(Value::from(format!("object {}", this.value().to_display_string())))
            }),
    );
    registry
}

/// A native function returning its receiver.
pub fn receiver_echo() -> Value {
    Value::from(FunctionRef::new("echo", |this, _| Ok(this.clone())))
}

pub fn instance(class: &str) -> ObjectRef {
    ObjectRef::new(class)
}
