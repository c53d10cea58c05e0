//! `segvm inspect`: Show segments and execution state.

use super::load_vm;
use crate::output::StyledOutput;
use segvm_core::{FrameKind, GcOptions, Segment, SegmentOps};
use std::path::Path;

pub fn execute(out: &mut StyledOutput, snapshot: &Path) -> anyhow::Result<()> {
    let vm = load_vm(snapshot, GcOptions::default())?;
    let heap = vm.heap();
    let state = vm.state();

    out.bold("Segments");
    out.dim(&format!(" (max id {})", heap.max_segment_id()));
    out.newline();
    for (id, segment) in heap.segments() {
        out.plain(&format!("  {} ", id));
        out.kind(segment.kind());
        out.plain(&format!(" {:>5} live", segment.live_count()));
        if let Segment::Script(script) = segment {
            out.dim(&format!("  script {} ", script.number()));
            if script.lock_count() > 0 {
                out.success(&format!("locked x{}", script.lock_count()));
            } else {
                out.dim("unlocked");
            }
        }
        out.newline();
    }

    out.newline();
    out.bold("State");
    out.newline();
    out.plain(&format!("  acc   {}\n", state.acc));
    out.plain(&format!("  prev  {}\n", state.prev));
    out.plain(&format!(
        "  stack {} base {}\n",
        state.stack_segment, state.stack_base
    ));

    out.newline();
    out.bold("Frames");
    out.dim(" (newest first)");
    out.newline();
    if state.frames().is_empty() {
        out.warning("  (empty call stack)");
        out.newline();
    }
    for (depth, frame) in state.frames().iter().enumerate().rev() {
        out.plain(&format!("  #{:<3}", depth));
        match frame.kind {
            FrameKind::Kernel => out.dim("kernel      "),
            FrameKind::Normal => out.plain("normal      "),
            FrameKind::VarSelector => out.plain("var-select  "),
        }
        out.plain(&format!(
            "sp {:<4} caller {} target {}",
            frame.sp, frame.caller, frame.send_target
        ));
        if let Some(var) = frame.var_pointer {
            out.plain(&format!(" var {}[{}]", var.object, var.index));
        }
        out.newline();
    }
    Ok(())
}
