//! CLI subcommand implementations.

pub mod freeable;
pub mod gc;
pub mod inspect;
pub mod normalize;
pub mod outgoing;

use anyhow::Context;
use segvm_core::{GcOptions, HeapSnapshot, Vm};
use std::path::Path;

/// Load a snapshot file into a VM.
pub fn load_vm(path: &Path, options: GcOptions) -> anyhow::Result<Vm> {
    let snapshot = HeapSnapshot::load(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    let vm = snapshot
        .into_vm(options)
        .with_context(|| format!("Snapshot {} does not describe a valid heap", path.display()))?;
    Ok(vm)
}
