//! VM wrapper
//!
//! A [`Vm`] owns everything a collection pass needs:
//! - The segmented heap
//! - The suspended execution state (registers and call stack)
//! - The collector, with its options and accumulated statistics

use crate::defaults::DEFAULT_STACK_SIZE;
use crate::gc::{GarbageCollector, GcOptions, GcPlan, GcReport, GcResult, GcStats};
use crate::heap::Heap;
use crate::stack::ExecState;

/// Heap, execution state and collector of one VM instance
#[derive(Debug)]
pub struct Vm {
    heap: Heap,
    state: ExecState,
    collector: GarbageCollector,
}

impl Vm {
    /// Create a VM with an empty heap and a default-sized operand stack
    pub fn new() -> Self {
        Self::with_options(GcOptions::default())
    }

    /// Create a VM with custom collector options
    pub fn with_options(options: GcOptions) -> Self {
        let (heap, stack) = Heap::with_stack(DEFAULT_STACK_SIZE);
        Self::from_parts(heap, ExecState::new(stack), options)
    }

    /// Assemble a VM from an existing heap and execution state
    pub fn from_parts(heap: Heap, state: ExecState, options: GcOptions) -> Self {
        Self {
            heap,
            state,
            collector: GarbageCollector::new(options),
        }
    }

    /// Get the heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Get the heap mutably
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Get the execution state
    pub fn state(&self) -> &ExecState {
        &self.state
    }

    /// Get the execution state mutably
    pub fn state_mut(&mut self) -> &mut ExecState {
        &mut self.state
    }

    /// Collector options
    pub fn options(&self) -> &GcOptions {
        self.collector.options()
    }

    /// Run a collection now
    ///
    /// # Errors
    ///
    /// Returns a [`crate::GcError`] when the call stack cannot yield an
    /// active frame or the operand stack is unusable. Nothing is freed in
    /// that case.
    pub fn collect_garbage(&mut self) -> GcResult<GcReport> {
        self.collector.collect(&mut self.heap, &self.state)
    }

    /// Report what a collection would free, without freeing it
    pub fn plan(&mut self) -> GcResult<GcPlan> {
        self.collector.plan(&self.heap, &self.state)
    }

    /// Get GC statistics
    pub fn stats(&self) -> &GcStats {
        self.collector.stats()
    }

    /// Split into heap and execution state
    pub fn into_parts(self) -> (Heap, ExecState) {
        (self.heap, self.state)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
