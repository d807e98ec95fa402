//! Minimal built-in blocks: a deterministic frame source and a frame recorder.
//!
//! Real chains plug in encoders, channels and decoders through [`Module`];
//! these two exist so a chain can be driven and observed without them.

use crate::error::ContractViolation;
use crate::kind::Element;
use crate::module::{Block, Module};
use crate::socket::Socket;
use crate::task::{Status, Task, TaskTag};
use std::any::Any;
use std::marker::PhantomData;

/// Emits `T::from_index(k)` for a running counter `k`, one element per slot.
pub struct Source<T: Element> {
    module: Module<usize>,
    _kind: PhantomData<T>,
}

impl<T: Element> Source<T> {
    /// Tag of the generating task.
    pub const GENERATE: TaskTag = TaskTag(0);

    /// Source emitting `n_elmts` elements per frame.
    pub fn new(n_elmts: usize, n_frames: usize) -> Result<Self, ContractViolation> {
        let mut module = Module::new("Source", n_frames, 0usize)?;
        let t = module.create_task("generate", Self::GENERATE)?;
        module.create_socket_out(t, "out", T::KIND, n_elmts)?;
        module.create_codelet(t, |next: &mut usize, task: &mut Task| {
            let start = *next;
            let written = task.outputs()[0].write(|out: &mut [T]| {
                for (i, v) in out.iter_mut().enumerate() {
                    *v = T::from_index(start + i);
                }
                out.len()
            });
            match written {
                Ok(n) => {
                    *next += n;
                    Status::Success
                }
                Err(e) => {
                    tracing::error!("source write failed: {}", e);
                    Status::Failure
                }
            }
        })?;
        Ok(Self {
            module,
            _kind: PhantomData,
        })
    }

    /// Values produced by call number `call` (0-based) of a source emitting
    /// `len` elements per call.
    pub fn expected(call: usize, len: usize) -> Vec<T> {
        (call * len..(call + 1) * len).map(T::from_index).collect()
    }

    /// The single output socket.
    pub fn output(&self) -> Result<&Socket, ContractViolation> {
        self.module.task(Self::GENERATE)?.socket(0)
    }
}

/// Records a copy of its input on every call.
pub struct Recorder<T: Element> {
    module: Module<Vec<Vec<T>>>,
}

impl<T: Element> Recorder<T> {
    /// Tag of the recording task.
    pub const RECORD: TaskTag = TaskTag(0);

    /// Recorder reading `n_elmts` elements per frame.
    pub fn new(n_elmts: usize, n_frames: usize) -> Result<Self, ContractViolation> {
        let mut module = Module::new("Recorder", n_frames, Vec::new())?;
        let t = module.create_task("record", Self::RECORD)?;
        module.create_socket_in(t, "in", T::KIND, n_elmts)?;
        module.create_codelet(t, |history: &mut Vec<Vec<T>>, task: &mut Task| {
            match task.inputs()[0].read(|v: &[T]| v.to_vec()) {
                Ok(values) => {
                    history.push(values);
                    Status::Success
                }
                Err(e) => {
                    tracing::error!("recorder read failed: {}", e);
                    Status::Failure
                }
            }
        })?;
        Ok(Self { module })
    }

    /// One entry per call, in call order.
    pub fn history(&self) -> &[Vec<T>] {
        self.module.state()
    }

    /// The single input socket, for binding.
    pub fn input_mut(&mut self) -> Result<&mut Socket, ContractViolation> {
        self.module.task_mut(Self::RECORD)?.socket_mut(0)
    }
}

macro_rules! delegate_block {
    ($ty:ident) => {
        impl<T: Element> Block for $ty<T> {
            fn name(&self) -> &str {
                self.module.name()
            }

            fn n_frames(&self) -> usize {
                self.module.n_frames()
            }

            fn tasks(&self) -> &[Task] {
                self.module.tasks()
            }

            fn tasks_mut(&mut self) -> &mut [Task] {
                self.module.tasks_mut()
            }

            fn exec(&mut self, tag: TaskTag) -> Result<Status, ContractViolation> {
                self.module.exec(tag)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

delegate_block!(Source);
delegate_block!(Recorder);
