//! Sockets: typed, sized data ports attached to a task.

#![warn(missing_docs)]

use crate::error::ContractViolation;
use crate::invariant_ppt::{assert_invariant, SOCKET_BIND_GEOMETRY};
use crate::kind::{Element, ElementKind, FrameData};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Buffer shared between a socket and every socket aliasing it.
pub(crate) type SharedBuffer = Arc<Mutex<FrameData>>;

/// Whether a socket is read or written by its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketDirection {
    /// Read by the codelet.
    In,
    /// Written by the codelet.
    Out,
}

/// Where a socket's data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// The socket allocated its own buffer.
    Owned,
    /// The socket uses the buffer of another socket, named here.
    Aliased(String),
}

/// A typed data port.
///
/// Kind, element count and frame count never change after creation; binding
/// only swaps which buffer the socket reads or writes.
#[derive(Debug)]
pub struct Socket {
    name: String,
    direction: SocketDirection,
    kind: ElementKind,
    n_elmts: usize,
    n_frames: usize,
    binding: Binding,
    buffer: SharedBuffer,
}

impl Socket {
    pub(crate) fn new(
        name: String,
        direction: SocketDirection,
        kind: ElementKind,
        n_elmts: usize,
        n_frames: usize,
    ) -> Self {
        let buffer = Arc::new(Mutex::new(FrameData::zeroed(kind, n_elmts * n_frames)));
        Self {
            name,
            direction,
            kind,
            n_elmts,
            n_frames,
            binding: Binding::Owned,
            buffer,
        }
    }

    /// Socket name, unique within its task.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input or output.
    pub fn direction(&self) -> SocketDirection {
        self.direction
    }

    /// Element kind.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Elements per frame.
    pub fn n_elmts(&self) -> usize {
        self.n_elmts
    }

    /// Frames per task call.
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Total elements across all frames.
    pub fn len(&self) -> usize {
        self.n_elmts * self.n_frames
    }

    /// Never true for a socket created through a module.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of the whole buffer.
    pub fn n_bytes(&self) -> usize {
        self.len() * self.kind.size()
    }

    /// Where the data currently lives.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// True once bound to another socket.
    pub fn is_aliasing(&self) -> bool {
        matches!(self.binding, Binding::Aliased(_))
    }

    pub(crate) fn buffer(&self) -> SharedBuffer {
        Arc::clone(&self.buffer)
    }

    /// Whole-buffer access. Callers must keep the kind and length intact.
    pub(crate) fn lock(&self) -> MutexGuard<'_, FrameData> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` over the socket's elements.
    pub fn read<T: Element, R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R, ContractViolation> {
        let guard = self.lock();
        Ok(f(guard.as_slice::<T>()?))
    }

    /// Run `f` over the socket's elements, mutably.
    pub fn write<T: Element, R>(
        &self,
        f: impl FnOnce(&mut [T]) -> R,
    ) -> Result<R, ContractViolation> {
        let mut guard = self.lock();
        Ok(f(guard.as_mut_slice::<T>()?))
    }

    /// Elements of frame `frame` only.
    pub fn read_frame<T: Element, R>(
        &self,
        frame: usize,
        f: impl FnOnce(&[T]) -> R,
    ) -> Result<R, ContractViolation> {
        if frame >= self.n_frames {
            return Err(ContractViolation::FrameOutOfRange {
                socket: self.name.clone(),
                frame,
                n_frames: self.n_frames,
            });
        }
        let n = self.n_elmts;
        self.read(|all: &[T]| f(&all[frame * n..(frame + 1) * n]))
    }

    /// Overwrite the contents with `data`, which must match the socket's kind
    /// and length.
    pub fn load(&self, data: &FrameData) -> Result<(), ContractViolation> {
        self.lock().copy_from(data)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> FrameData {
        self.lock().clone()
    }

    /// Make this input socket use the buffer of output socket `src`.
    pub fn bind(&mut self, src: &Socket) -> Result<(), ContractViolation> {
        if self.direction != SocketDirection::In || src.direction != SocketDirection::Out {
            return Err(ContractViolation::BindDirection {
                dst: self.name.clone(),
                src: src.name.clone(),
            });
        }
        let reason = if self.kind != src.kind {
            Some("element kinds differ")
        } else if self.n_elmts != src.n_elmts {
            Some("element counts differ")
        } else if self.n_frames != src.n_frames {
            Some("frame counts differ")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ContractViolation::BindMismatch {
                dst: self.name.clone(),
                src: src.name.clone(),
                reason,
            });
        }

        self.buffer = src.buffer();
        self.binding = Binding::Aliased(src.name.clone());
        assert_invariant(
            SOCKET_BIND_GEOMETRY,
            self.lock().len() == self.len(),
            "Bound buffer matches socket geometry",
            Some("Socket::bind"),
        );
        tracing::debug!(dst = %self.name, src = %src.name, "socket bound");
        Ok(())
    }

    /// Drop any alias and go back to a private zeroed buffer.
    pub fn unbind(&mut self) {
        if self.is_aliasing() {
            self.buffer = Arc::new(Mutex::new(FrameData::zeroed(self.kind, self.len())));
            self.binding = Binding::Owned;
        }
    }
}
