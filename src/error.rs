//! Contract violations raised by the task/socket layer.
//!
//! These are programmer errors in the code assembling a chain. They are
//! surfaced at the call site that detected them and never retried; codelet
//! outcomes travel separately as [`crate::Status`].

use crate::kind::ElementKind;

/// A broken invariant detected while registering, wiring or invoking tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("Task tag {tag} already exists on module '{module}'")]
    DuplicateTaskTag { module: String, tag: usize },

    #[error("No task with tag {tag} on module '{module}'")]
    UnknownTask { module: String, tag: usize },

    #[error("Task '{module}::{task}' has no bound codelet")]
    NoCodelet { module: String, task: String },

    #[error("Task '{module}::{task}' already has a codelet")]
    CodeletAlreadyBound { module: String, task: String },

    #[error("Unsupported element kind '{0}'")]
    UnsupportedKind(String),

    #[error("Socket '{task}::{socket}' must hold at least one element")]
    EmptySocket { task: String, socket: String },

    #[error("Input socket '{task}::{socket}' declared after an output socket")]
    InputAfterOutput { task: String, socket: String },

    #[error("Socket index {index} out of range for task '{task}'")]
    SocketOutOfRange { task: String, index: usize },

    #[error("Frame {frame} out of range for socket '{socket}' ({n_frames} frames)")]
    FrameOutOfRange {
        socket: String,
        frame: usize,
        n_frames: usize,
    },

    #[error("Element kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("Cannot bind '{dst}' to '{src}': {reason}")]
    BindMismatch {
        dst: String,
        src: String,
        reason: &'static str,
    },

    #[error("Cannot bind '{dst}' to '{src}': only an input may alias an output")]
    BindDirection { dst: String, src: String },

    #[error("Module '{module}' needs at least one frame per call")]
    ZeroFrames { module: String },

    #[error("Invalid adaptor configuration: {0}")]
    InvalidConfig(String),

    #[error("Lane {lane} out of range ({n_lanes} lanes)")]
    InvalidLane { lane: usize, n_lanes: usize },

    #[error("No block with id {0} in sequence")]
    UnknownBlock(usize),
}
