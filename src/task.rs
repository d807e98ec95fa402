//! Tasks: invokable units of work with ordered sockets.
#![warn(missing_docs)]

use crate::error::ContractViolation;
use crate::kind::ElementKind;
use crate::socket::{Socket, SocketDirection};
use crate::with_element_kind;

/// Numeric tag identifying a task within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskTag(pub usize);

/// Outcome reported by a codelet. The core never interprets it.
///
/// Codes 0 and 1 belong to `Success` and `Failure`. Build a status from a raw
/// code with [`Status::from_code`] so that `Other` never carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Code 0.
    #[default]
    Success,
    /// Code 1.
    Failure,
    /// Caller-defined code other than 0 and 1.
    Other(i32),
}

impl Status {
    /// Status for a raw code. 0 and 1 map to `Success` and `Failure`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Success,
            1 => Status::Failure,
            other => Status::Other(other),
        }
    }

    /// Raw code of this status.
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
            Status::Other(code) => code,
        }
    }

    /// True for `Success` and for `Other(0)`.
    pub fn is_success(self) -> bool {
        self.code() == 0
    }
}

/// A named unit of work: input sockets followed by output sockets.
#[derive(Debug)]
pub struct Task {
    name: String,
    tag: TaskTag,
    n_frames: usize,
    sockets: Vec<Socket>,
    n_inputs: usize,
    debug: bool,
    debug_limit: Option<usize>,
    n_calls: u64,
    last_status: Option<Status>,
}

impl Task {
    pub(crate) fn new(name: String, tag: TaskTag, n_frames: usize) -> Self {
        Self {
            name,
            tag,
            n_frames,
            sockets: Vec::new(),
            n_inputs: 0,
            debug: false,
            debug_limit: None,
            n_calls: 0,
            last_status: None,
        }
    }

    /// Task name, unique within its module by convention only.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag the task was created with.
    pub fn tag(&self) -> TaskTag {
        self.tag
    }

    /// Frames carried per call, shared with the owning module.
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// All sockets, inputs first.
    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    /// Input sockets, in creation order.
    pub fn inputs(&self) -> &[Socket] {
        &self.sockets[..self.n_inputs]
    }

    /// Output sockets, in creation order.
    pub fn outputs(&self) -> &[Socket] {
        &self.sockets[self.n_inputs..]
    }

    /// Socket at `index`, counting inputs first.
    pub fn socket(&self, index: usize) -> Result<&Socket, ContractViolation> {
        self.sockets
            .get(index)
            .ok_or_else(|| ContractViolation::SocketOutOfRange {
                task: self.name.clone(),
                index,
            })
    }

    /// Mutable socket at `index`, for binding.
    pub fn socket_mut(&mut self, index: usize) -> Result<&mut Socket, ContractViolation> {
        let task = self.name.clone();
        self.sockets
            .get_mut(index)
            .ok_or(ContractViolation::SocketOutOfRange { task, index })
    }

    /// First socket with the given name.
    pub fn socket_by_name(&self, name: &str) -> Option<&Socket> {
        self.sockets.iter().find(|s| s.name() == name)
    }

    /// Number of completed invocations.
    pub fn n_calls(&self) -> u64 {
        self.n_calls
    }

    /// Status of the most recent call, `None` before the first.
    pub fn last_status(&self) -> Option<Status> {
        self.last_status
    }

    /// Log socket contents after every invocation.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Cap the number of elements dumped per socket in debug mode.
    pub fn set_debug_limit(&mut self, limit: Option<usize>) {
        self.debug_limit = limit;
    }

    pub(crate) fn push_socket(
        &mut self,
        name: String,
        direction: SocketDirection,
        kind: ElementKind,
        n_elmts: usize,
    ) -> Result<usize, ContractViolation> {
        if n_elmts == 0 {
            return Err(ContractViolation::EmptySocket {
                task: self.name.clone(),
                socket: name,
            });
        }
        if direction == SocketDirection::In && self.n_inputs != self.sockets.len() {
            return Err(ContractViolation::InputAfterOutput {
                task: self.name.clone(),
                socket: name,
            });
        }
        self.sockets
            .push(Socket::new(name, direction, kind, n_elmts, self.n_frames));
        if direction == SocketDirection::In {
            self.n_inputs += 1;
        }
        Ok(self.sockets.len() - 1)
    }

    pub(crate) fn record(&mut self, status: Status) {
        self.n_calls += 1;
        self.last_status = Some(status);
        tracing::trace!(task = %self.name, call = self.n_calls, code = status.code(), "task executed");
        if self.debug {
            self.dump();
        }
    }

    fn dump(&self) {
        let limit = self.debug_limit;
        for socket in &self.sockets {
            let rendered = with_element_kind!(socket.kind(), T => {
                socket.read(|values: &[T]| {
                    let shown = limit.map_or(values.len(), |l| l.min(values.len()));
                    format!("{:?}", &values[..shown])
                })
            });
            match rendered {
                Ok(values) => tracing::debug!(
                    task = %self.name,
                    socket = %socket.name(),
                    kind = %socket.kind(),
                    "{}",
                    values
                ),
                Err(e) => tracing::error!(task = %self.name, socket = %socket.name(), "dump failed: {}", e),
            }
        }
    }
}
