//! `segvm gc`: Run or plan a collection over a snapshot.

use super::load_vm;
use crate::output::StyledOutput;
use anyhow::Context;
use segvm_core::{GcOptions, GcPlan, GcReport, HeapSnapshot, SegmentKind};
use std::path::{Path, PathBuf};

/// Flags of the `gc` subcommand.
pub struct GcArgs {
    pub dry_run: bool,
    pub json: bool,
    pub dump_heap: bool,
    pub output: Option<PathBuf>,
}

pub fn execute(out: &mut StyledOutput, snapshot: &Path, args: GcArgs) -> anyhow::Result<()> {
    let options = GcOptions {
        dump_heap: args.dump_heap,
        ..GcOptions::default()
    };
    let mut vm = load_vm(snapshot, options)?;

    if args.dry_run {
        let plan = vm.plan().context("Collection failed")?;
        if args.json {
            out.plain(&serde_json::to_string_pretty(&plan)?);
            out.newline();
        } else {
            print_plan(out, &plan);
        }
        return Ok(());
    }

    let report = vm.collect_garbage().context("Collection failed")?;
    if args.json {
        out.plain(&serde_json::to_string_pretty(&report)?);
        out.newline();
    } else {
        print_report(out, &report, vm.stats().last_pause_time);
    }

    if let Some(path) = args.output {
        let json = HeapSnapshot::of_vm(&vm).to_json()?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("wrote collected heap to {}", path.display());
    }
    Ok(())
}

fn print_report(out: &mut StyledOutput, report: &GcReport, pause: std::time::Duration) {
    out.success("Collected");
    out.plain(&format!(
        " {} roots, {} marked, {} reachable",
        report.roots, report.marked, report.reachable
    ));
    out.dim(&format!(" ({:?})", pause));
    out.newline();
    print_counts(out, |kind| report.freed_of(kind));
}

fn print_plan(out: &mut StyledOutput, plan: &GcPlan) {
    out.warning("Dry run");
    out.plain(&format!(
        " {} roots, {} marked, {} reachable",
        plan.roots,
        plan.marked,
        plan.reachable.len()
    ));
    out.newline();

    let counts = plan.freed_by_kind();
    print_counts(out, |kind| counts.get(&kind).copied().unwrap_or(0));

    for obj in &plan.unreachable {
        out.plain("  ");
        out.kind(obj.kind);
        out.plain(&format!(" {}", obj.address));
        out.newline();
    }
}

fn print_counts(out: &mut StyledOutput, freed: impl Fn(SegmentKind) -> usize) {
    for kind in SegmentKind::ALL {
        if kind == SegmentKind::Stack {
            continue;
        }
        out.plain("  freed ");
        out.kind(kind);
        out.bold(&freed(kind).to_string());
        out.newline();
    }
}
