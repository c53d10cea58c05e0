//! Execution state and call frames
//!
//! This module describes the part of the interpreter's state the collector
//! needs to see: the two value registers, where the operand stack lives,
//! and the call stack.
//!
//! # Layout
//!
//! ```text
//! stack segment slots
//! ┌─────────────────────────────────────┐
//! │ ...                                 │  ← sp of the active frame
//! │ operand₁                            │
//! │ operand₀                            │
//! ├─────────────────────────────────────┤  ← stack_base
//! │ (unused)                            │
//! └─────────────────────────────────────┘
//!
//! call stack (oldest first)
//!   [0] Normal       caller / send target
//!   [1] VarSelector  caller / send target / var pointer
//!   [2] Kernel       native call, owns no operands
//! ```

use crate::address::{Address, SegmentId, VarRef};
use serde::{Deserialize, Serialize};

/// What kind of call created a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Method call sent to an object
    Normal,
    /// Call into a native kernel function
    Kernel,
    /// Variable selector access (property read/write)
    VarSelector,
}

/// One entry of the call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecFrame {
    /// Call kind
    pub kind: FrameKind,

    /// Object whose method is executing
    #[serde(default)]
    pub caller: Address,

    /// Object the message was sent to
    #[serde(default)]
    pub send_target: Address,

    /// Variable being accessed (VarSelector frames only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_pointer: Option<VarRef>,

    /// Operand stack pointer (next free slot) for this frame
    pub sp: usize,
}

impl ExecFrame {
    /// Create a method call frame
    pub fn call(caller: Address, send_target: Address, sp: usize) -> Self {
        Self {
            kind: FrameKind::Normal,
            caller,
            send_target,
            var_pointer: None,
            sp,
        }
    }

    /// Create a kernel call frame
    pub fn kernel(sp: usize) -> Self {
        Self {
            kind: FrameKind::Kernel,
            caller: Address::NULL,
            send_target: Address::NULL,
            var_pointer: None,
            sp,
        }
    }

    /// Create a variable selector frame
    pub fn var_selector(caller: Address, send_target: Address, var: VarRef, sp: usize) -> Self {
        Self {
            kind: FrameKind::VarSelector,
            caller,
            send_target,
            var_pointer: Some(var),
            sp,
        }
    }

    /// Whether this frame is a kernel call
    #[inline]
    pub fn is_kernel(&self) -> bool {
        self.kind == FrameKind::Kernel
    }
}

/// Registers and call stack of a suspended VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecState {
    /// Accumulator register
    #[serde(default)]
    pub acc: Address,

    /// Previous-value register
    #[serde(default)]
    pub prev: Address,

    /// Segment holding the operand stack
    pub stack_segment: SegmentId,

    /// First operand slot in the stack segment
    #[serde(default)]
    pub stack_base: usize,

    /// Call stack, oldest first
    #[serde(default)]
    frames: Vec<ExecFrame>,
}

impl ExecState {
    /// Create a state with an empty call stack
    pub fn new(stack_segment: SegmentId) -> Self {
        Self {
            acc: Address::NULL,
            prev: Address::NULL,
            stack_segment,
            stack_base: 0,
            frames: Vec::new(),
        }
    }

    /// Push a frame
    pub fn push_frame(&mut self, frame: ExecFrame) {
        self.frames.push(frame);
    }

    /// Pop the newest frame
    pub fn pop_frame(&mut self) -> Option<ExecFrame> {
        self.frames.pop()
    }

    /// Newest frame
    pub fn top_frame(&self) -> Option<&ExecFrame> {
        self.frames.last()
    }

    /// Newest frame, mutably
    pub fn top_frame_mut(&mut self) -> Option<&mut ExecFrame> {
        self.frames.last_mut()
    }

    /// All frames, oldest first
    pub fn frames(&self) -> &[ExecFrame] {
        &self.frames
    }

    /// Call depth
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constructors() {
        let obj = Address::new(SegmentId(2), 0);
        let frame = ExecFrame::call(obj, obj, 3);
        assert_eq!(frame.kind, FrameKind::Normal);
        assert!(!frame.is_kernel());

        let frame = ExecFrame::kernel(3);
        assert!(frame.is_kernel());
        assert!(frame.caller.is_null());

        let frame = ExecFrame::var_selector(obj, obj, VarRef::new(obj, 1), 4);
        assert_eq!(frame.var_pointer, Some(VarRef::new(obj, 1)));
    }

    #[test]
    fn test_push_pop_frames() {
        let mut state = ExecState::new(SegmentId(1));
        assert!(state.top_frame().is_none());

        state.push_frame(ExecFrame::call(Address::NULL, Address::NULL, 0));
        state.push_frame(ExecFrame::kernel(2));
        assert_eq!(state.depth(), 2);
        assert!(state.top_frame().unwrap().is_kernel());

        state.top_frame_mut().unwrap().sp = 5;
        assert_eq!(state.pop_frame().unwrap().sp, 5);
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn test_state_json_defaults() {
        let state: ExecState = serde_json::from_str(
            r#"{ "stack_segment": 1, "frames": [ { "kind": "kernel", "sp": 0 } ] }"#,
        )
        .unwrap();
        assert!(state.acc.is_null());
        assert_eq!(state.frames()[0].kind, FrameKind::Kernel);
    }
}
