//! `segvm normalize`: Print the canonical form of an address.

use super::load_vm;
use crate::output::StyledOutput;
use segvm_core::gc::inspect;
use segvm_core::{Address, GcOptions};
use std::path::Path;

pub fn execute(out: &mut StyledOutput, snapshot: &Path, address: Address) -> anyhow::Result<()> {
    let vm = load_vm(snapshot, GcOptions::default())?;
    let Some(canonical) = inspect::normalize(vm.heap(), address) else {
        anyhow::bail!("No segment {} in snapshot", address.segment);
    };

    out.plain(&format!("{} -> ", address));
    if canonical == address {
        out.bold(&canonical.to_string());
    } else {
        out.success(&canonical.to_string());
    }
    out.newline();
    Ok(())
}
