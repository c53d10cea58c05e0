//! `segvm outgoing`: List the references an object holds.

use super::load_vm;
use crate::output::StyledOutput;
use segvm_core::gc::inspect;
use segvm_core::{Address, GcOptions};
use std::path::Path;

pub fn execute(out: &mut StyledOutput, snapshot: &Path, address: Address) -> anyhow::Result<()> {
    let vm = load_vm(snapshot, GcOptions::default())?;
    let heap = vm.heap();

    for target in inspect::outgoing(heap, address) {
        match heap.kind_of(target) {
            Some(kind) => out.kind(kind),
            None => out.warning(&format!("{:<8}", "missing")),
        }
        out.plain(&format!(" {}", target));
        out.newline();
    }
    Ok(())
}
