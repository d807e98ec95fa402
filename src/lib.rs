//! commchain: task/socket runtime for communication-chain simulation.
//!
//! Blocks ([`Module`]s) expose tasks; tasks read and write typed sockets;
//! chains are built by binding sockets of independent blocks. A chain can run
//! as one [`Sequence`] or be split over threads, with an [`Adaptor`] bridging
//! each cut.

#![forbid(unsafe_code)]

pub mod adaptor;
pub mod blocks;
pub mod error;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod kind;
pub mod module;
pub mod sequence;
pub mod socket;
pub mod task;

pub use adaptor::{
    Adaptor, AdaptorConfig, AdaptorTask, Fan, SlotState, StreamSpec, WaitPolicy,
    DEFAULT_BUFFER_SIZE, MAX_LANES,
};
pub use blocks::{Recorder, Source};
pub use error::ContractViolation;
pub use kind::{Element, ElementKind, FrameData};
pub use module::{bind, Block, Codelet, Module};
pub use sequence::{BlockId, Sequence};
pub use socket::{Binding, Socket, SocketDirection};
pub use task::{Status, Task, TaskTag};
