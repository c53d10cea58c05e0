//! Tracing mark-sweep collector
//!
//! This module implements the collection pass over a segmented heap.

use super::report::{FreedObject, GcPlan, GcReport};
use super::roots::RootSet;
use super::worklist::Worklist;
use super::{GcOptions, GcPhase, GcResult};
use crate::address::{Address, SegmentId};
use crate::heap::Heap;
use crate::segment::{SegmentKind, SegmentOps};
use crate::stack::ExecState;
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};

/// Garbage collector statistics
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    /// Total number of completed collections
    pub collections: usize,

    /// Total number of passes aborted by a fatal error
    pub failed_collections: usize,

    /// Total objects freed
    pub objects_freed: usize,

    /// Total pause time across all collections
    pub total_pause_time: Duration,

    /// Last collection duration
    pub last_pause_time: Duration,

    /// Maximum pause time
    pub max_pause_time: Duration,

    /// Raw addresses marked in last collection
    pub last_marked_count: usize,

    /// Canonical addresses reachable in last collection
    pub last_reachable_count: usize,

    /// Objects freed in last collection
    pub last_freed_count: usize,
}

impl GcStats {
    /// Update statistics after a collection
    fn update(&mut self, pause_time: Duration, report: &GcReport) {
        let freed = report.total_freed();
        self.collections += 1;
        self.objects_freed += freed;
        self.total_pause_time += pause_time;
        self.last_pause_time = pause_time;

        if pause_time > self.max_pause_time {
            self.max_pause_time = pause_time;
        }

        self.last_marked_count = report.marked;
        self.last_reachable_count = report.reachable;
        self.last_freed_count = freed;
    }

    /// Average pause time
    pub fn avg_pause_time(&self) -> Duration {
        if self.collections == 0 {
            return Duration::ZERO;
        }
        self.total_pause_time / self.collections as u32
    }
}

/// Result of tracing: everything up to, but excluding, the sweep
struct Traced {
    roots: usize,
    marked: usize,
    reachable: FxHashSet<Address>,
}

/// Stop-the-world collector for a segmented heap
///
/// The collector owns no heap; each pass borrows the heap and execution
/// state it is given. Taking `&mut self` for a pass rules out re-entrancy.
#[derive(Debug, Default)]
pub struct GarbageCollector {
    /// Configuration
    options: GcOptions,

    /// Current phase
    phase: GcPhase,

    /// Statistics
    stats: GcStats,
}

impl GarbageCollector {
    /// Create a collector
    pub fn new(options: GcOptions) -> Self {
        Self {
            options,
            phase: GcPhase::Idle,
            stats: GcStats::default(),
        }
    }

    /// Configuration in use
    pub fn options(&self) -> &GcOptions {
        &self.options
    }

    /// Current phase (always `Idle` between passes)
    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    /// Get GC statistics
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Run a full collection pass
    ///
    /// # Errors
    ///
    /// Returns a [`super::GcError`] if roots cannot be enumerated; in that
    /// case the heap is left untouched.
    pub fn collect(&mut self, heap: &mut Heap, state: &ExecState) -> GcResult<GcReport> {
        debug_assert_eq!(self.phase, GcPhase::Idle, "collector re-entered");
        let start = Instant::now();

        if self.options.dump_heap {
            log::trace!("heap before gc:\n{:?}", heap);
        }

        let traced = match self.trace(heap, state) {
            Ok(traced) => traced,
            Err(err) => {
                self.phase = GcPhase::Idle;
                self.stats.failed_collections += 1;
                log::error!("gc aborted: {}", err);
                return Err(err);
            }
        };

        self.phase = GcPhase::Sweep;
        let mut report = sweep(heap, &traced.reachable);
        report.roots = traced.roots;
        report.marked = traced.marked;
        report.reachable = traced.reachable.len();
        self.phase = GcPhase::Idle;

        let duration = start.elapsed();
        if self.options.track_stats {
            self.stats.update(duration, &report);
        }

        if self.options.dump_heap {
            log::trace!("heap after gc:\n{:?}", heap);
        }
        log::info!("gc: {} in {:?}", report, duration);
        Ok(report)
    }

    /// Trace without sweeping and report what a pass would free
    pub fn plan(&mut self, heap: &Heap, state: &ExecState) -> GcResult<GcPlan> {
        let traced = self.trace(heap, state);
        self.phase = GcPhase::Idle;
        let traced = traced?;

        let mut reachable: Vec<Address> = traced.reachable.iter().copied().collect();
        reachable.sort_unstable();

        let mut unreachable = Vec::new();
        for (id, segment) in heap.segments() {
            let kind = segment.kind();
            for address in segment.deallocatable_addresses(id) {
                if !traced.reachable.contains(&address) {
                    unreachable.push(FreedObject { kind, address });
                }
            }
        }

        Ok(GcPlan {
            roots: traced.roots,
            marked: traced.marked,
            reachable,
            unreachable,
        })
    }

    fn trace(&mut self, heap: &Heap, state: &ExecState) -> GcResult<Traced> {
        self.phase = GcPhase::RootCollection;
        let roots = RootSet::gather(heap, state)?;

        let mut worklist = Worklist::new();
        worklist.push_all(roots.iter());

        self.phase = GcPhase::Mark;
        mark(heap, &mut worklist);
        let marked = worklist.visited_len();

        self.phase = GcPhase::Normalize;
        let reachable = normalize(heap, worklist.into_visited());
        log::debug!(
            "gc: {} roots, {} raw addresses, {} canonical",
            roots.len(),
            marked,
            reachable.len()
        );

        Ok(Traced {
            roots: roots.len(),
            marked,
            reachable,
        })
    }
}

/// Run one pass with a throwaway collector
///
/// This is the context-passing form of [`crate::Vm::collect_garbage`].
pub fn run_gc(heap: &mut Heap, state: &ExecState, options: &GcOptions) -> GcResult<GcReport> {
    GarbageCollector::new(options.clone()).collect(heap, state)
}

/// Drain the worklist, following one hop from every popped address
fn mark(heap: &Heap, worklist: &mut Worklist) {
    while let Some(addr) = worklist.pop() {
        let Some(segment) = heap.get(addr.segment) else {
            log::trace!("gc mark: {} has no segment", addr);
            continue;
        };

        // Stack operands were captured when scanning the active window
        if segment.kind() == SegmentKind::Stack {
            continue;
        }

        worklist.push_all(segment.outgoing_references(addr));
    }
}

/// Map raw visited addresses to canonical object identities
fn normalize(heap: &Heap, visited: FxHashSet<Address>) -> FxHashSet<Address> {
    let mut reachable = FxHashSet::default();
    reachable.reserve(visited.len());
    for addr in visited {
        match heap.get(addr.segment) {
            Some(segment) => {
                reachable.insert(segment.canonicalize(addr));
            }
            None => log::trace!("gc normalize: dropping {} (segment gone)", addr),
        }
    }
    reachable
}

/// Free every deallocatable address that is not reachable
fn sweep(heap: &mut Heap, reachable: &FxHashSet<Address>) -> GcReport {
    let mut report = GcReport::default();
    let max = heap.max_segment_id().0;

    for id in (1..=max).map(SegmentId) {
        let Some(segment) = heap.get_mut(id) else {
            continue;
        };
        let kind = segment.kind();
        for addr in segment.deallocatable_addresses(id) {
            if reachable.contains(&addr) {
                continue;
            }
            log::trace!("gc sweep: freeing {} {}", kind, addr);
            segment.free(addr);
            report.record_free(kind);
        }
    }
    report
}
