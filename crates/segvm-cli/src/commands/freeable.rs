//! `segvm freeable`: List the addresses a segment could free.

use super::load_vm;
use crate::output::StyledOutput;
use segvm_core::gc::inspect;
use segvm_core::{GcOptions, SegmentId};
use std::path::Path;

pub fn execute(out: &mut StyledOutput, snapshot: &Path, segment: u16) -> anyhow::Result<()> {
    let vm = load_vm(snapshot, GcOptions::default())?;
    let id = SegmentId(segment);
    let Some(addresses) = inspect::freeable(vm.heap(), id) else {
        anyhow::bail!("No segment {} in snapshot", id);
    };

    for addr in addresses {
        out.plain(&addr.to_string());
        out.newline();
    }
    Ok(())
}
