//! Modules: named collections of tasks, and the `Block` capability trait.

use crate::error::ContractViolation;
use crate::invariant_ppt::{assert_invariant, SOCKET_BUFFER_SIZED};
use crate::kind::ElementKind;
use crate::socket::SocketDirection;
use crate::task::{Status, Task, TaskTag};
use std::any::Any;

/// Function executed when a task is invoked. It sees the module's private
/// state and the task's sockets, nothing else.
pub type Codelet<S> = Box<dyn FnMut(&mut S, &mut Task) -> Status + Send>;

/// Object-safe view of a block, used by runners and chain builders.
pub trait Block: Send + 'static {
    /// Full block name.
    fn name(&self) -> &str;
    /// Frames processed per task call.
    fn n_frames(&self) -> usize;
    /// Tasks in registration order.
    fn tasks(&self) -> &[Task];
    /// Mutable tasks, for wiring sockets.
    fn tasks_mut(&mut self) -> &mut [Task];
    /// Invoke the task tagged `tag` once.
    fn exec(&mut self, tag: TaskTag) -> Result<Status, ContractViolation>;
    /// Hook for [`crate::Sequence::block_as`].
    fn as_any(&self) -> &dyn Any;

    /// Task tagged `tag`.
    fn task(&self, tag: TaskTag) -> Result<&Task, ContractViolation> {
        self.tasks()
            .iter()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| ContractViolation::UnknownTask {
                module: self.name().to_string(),
                tag: tag.0,
            })
    }

    /// Task tagged `tag`, mutably.
    fn task_mut(&mut self, tag: TaskTag) -> Result<&mut Task, ContractViolation> {
        let module = self.name().to_string();
        self.tasks_mut()
            .iter_mut()
            .find(|t| t.tag() == tag)
            .ok_or(ContractViolation::UnknownTask { module, tag: tag.0 })
    }
}

/// Generic module: tasks, their codelets, and private state `S`.
pub struct Module<S> {
    name: String,
    short_name: String,
    n_frames: usize,
    tasks: Vec<Task>,
    codelets: Vec<Option<Codelet<S>>>,
    state: S,
}

impl<S> std::fmt::Debug for Module<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("n_frames", &self.n_frames)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl<S: Send + 'static> Module<S> {
    /// Create an empty module processing `n_frames` frames per call.
    pub fn new(name: &str, n_frames: usize, state: S) -> Result<Self, ContractViolation> {
        if n_frames == 0 {
            return Err(ContractViolation::ZeroFrames {
                module: name.to_string(),
            });
        }
        tracing::debug!(module = name, n_frames, "module created");
        Ok(Self {
            name: name.to_string(),
            short_name: name.to_string(),
            n_frames,
            tasks: Vec::new(),
            codelets: Vec::new(),
            state,
        })
    }

    /// Display name shared by all variants of a block.
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Override the display name.
    pub fn set_short_name(&mut self, short_name: &str) {
        self.short_name = short_name.to_string();
    }

    /// Private state handed to every codelet.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable private state.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Register a task. Tags are unique per module.
    pub fn create_task(&mut self, name: &str, tag: TaskTag) -> Result<TaskTag, ContractViolation> {
        if self.tasks.iter().any(|t| t.tag() == tag) {
            return Err(ContractViolation::DuplicateTaskTag {
                module: self.name.clone(),
                tag: tag.0,
            });
        }
        self.tasks.push(Task::new(name.to_string(), tag, self.n_frames));
        self.codelets.push(None);
        Ok(tag)
    }

    /// Append an input socket to `task`; returns its index.
    pub fn create_socket_in(
        &mut self,
        task: TaskTag,
        name: &str,
        kind: ElementKind,
        n_elmts: usize,
    ) -> Result<usize, ContractViolation> {
        self.add_socket(task, name, SocketDirection::In, kind, n_elmts)
    }

    /// Append an output socket to `task`; returns its index.
    pub fn create_socket_out(
        &mut self,
        task: TaskTag,
        name: &str,
        kind: ElementKind,
        n_elmts: usize,
    ) -> Result<usize, ContractViolation> {
        self.add_socket(task, name, SocketDirection::Out, kind, n_elmts)
    }

    fn add_socket(
        &mut self,
        task: TaskTag,
        name: &str,
        direction: SocketDirection,
        kind: ElementKind,
        n_elmts: usize,
    ) -> Result<usize, ContractViolation> {
        let n_frames = self.n_frames;
        let t = self.task_mut(task)?;
        let index = t.push_socket(name.to_string(), direction, kind, n_elmts)?;
        let socket = t.socket(index)?;
        let data = socket.lock();
        assert_invariant(
            SOCKET_BUFFER_SIZED,
            data.kind() == kind && data.len() == n_elmts * n_frames,
            "Socket buffer holds n_elmts * n_frames elements of its kind",
            Some("Module::add_socket"),
        );
        Ok(index)
    }

    /// Bind the codelet run by `task`. A task takes exactly one codelet.
    pub fn create_codelet<F>(&mut self, task: TaskTag, codelet: F) -> Result<(), ContractViolation>
    where
        F: FnMut(&mut S, &mut Task) -> Status + Send + 'static,
    {
        let idx = self.index_of(task)?;
        if self.codelets[idx].is_some() {
            return Err(ContractViolation::CodeletAlreadyBound {
                module: self.name.clone(),
                task: self.tasks[idx].name().to_string(),
            });
        }
        self.codelets[idx] = Some(Box::new(codelet));
        Ok(())
    }

    fn index_of(&self, tag: TaskTag) -> Result<usize, ContractViolation> {
        self.tasks
            .iter()
            .position(|t| t.tag() == tag)
            .ok_or_else(|| ContractViolation::UnknownTask {
                module: self.name.clone(),
                tag: tag.0,
            })
    }
}

impl<S: Send + 'static> Block for Module<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_frames(&self) -> usize {
        self.n_frames
    }

    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    fn exec(&mut self, tag: TaskTag) -> Result<Status, ContractViolation> {
        let idx = self.index_of(tag)?;
        let Self {
            name,
            tasks,
            codelets,
            state,
            ..
        } = self;
        let task = &mut tasks[idx];
        let codelet = codelets[idx]
            .as_mut()
            .ok_or_else(|| ContractViolation::NoCodelet {
                module: name.clone(),
                task: task.name().to_string(),
            })?;
        let status = codelet(state, task);
        task.record(status);
        Ok(status)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wire socket `dst` of `dst_block`'s task `dst_tag` to alias output socket
/// `src` of `src_block`'s task `src_tag`.
pub fn bind(
    dst_block: &mut dyn Block,
    dst_tag: TaskTag,
    dst: usize,
    src_block: &dyn Block,
    src_tag: TaskTag,
    src: usize,
) -> Result<(), ContractViolation> {
    let source = src_block.task(src_tag)?.socket(src)?;
    dst_block.task_mut(dst_tag)?.socket_mut(dst)?.bind(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubler() -> Module<u32> {
        let mut m = Module::new("Doubler", 2, 0u32).unwrap();
        let t = m.create_task("double", TaskTag(0)).unwrap();
        m.create_socket_in(t, "x", ElementKind::I32, 3).unwrap();
        m.create_socket_out(t, "y", ElementKind::I32, 3).unwrap();
        m.create_codelet(t, |calls: &mut u32, task: &mut Task| {
            *calls += 1;
            let input = match task.inputs()[0].read(|v: &[i32]| v.to_vec()) {
                Ok(v) => v,
                Err(_) => return Status::Failure,
            };
            match task.outputs()[0].write(|out: &mut [i32]| {
                for (o, i) in out.iter_mut().zip(&input) {
                    *o = 2 * i;
                }
            }) {
                Ok(()) => Status::Success,
                Err(_) => Status::Failure,
            }
        })
        .unwrap();
        m
    }

    #[test]
    fn exec_runs_codelet_over_sockets() {
        let mut m = doubler();
        m.task(TaskTag(0))
            .unwrap()
            .socket(0)
            .unwrap()
            .write(|v: &mut [i32]| v.copy_from_slice(&[1, 2, 3, 4, 5, 6]))
            .unwrap();
        assert_eq!(m.exec(TaskTag(0)), Ok(Status::Success));
        let out = m.task(TaskTag(0)).unwrap().socket(1).unwrap().snapshot();
        assert_eq!(out.as_slice::<i32>().unwrap(), &[2, 4, 6, 8, 10, 12]);
        assert_eq!(*m.state(), 1);
        assert_eq!(m.task(TaskTag(0)).unwrap().n_calls(), 1);
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut m = doubler();
        assert_eq!(
            m.create_task("again", TaskTag(0)),
            Err(ContractViolation::DuplicateTaskTag {
                module: "Doubler".to_string(),
                tag: 0,
            })
        );
    }

    #[test]
    fn missing_codelet_is_rejected() {
        let mut m = Module::new("Bare", 1, ()).unwrap();
        let t = m.create_task("noop", TaskTag(3)).unwrap();
        assert!(matches!(
            m.exec(t),
            Err(ContractViolation::NoCodelet { .. })
        ));
        assert!(matches!(
            m.exec(TaskTag(4)),
            Err(ContractViolation::UnknownTask { tag: 4, .. })
        ));
    }

    #[test]
    fn second_codelet_is_rejected() {
        let mut m = doubler();
        assert!(matches!(
            m.create_codelet(TaskTag(0), |_: &mut u32, _: &mut Task| Status::Success),
            Err(ContractViolation::CodeletAlreadyBound { .. })
        ));
    }

    #[test]
    fn zero_frames_is_rejected() {
        assert!(matches!(
            Module::new("Empty", 0, ()),
            Err(ContractViolation::ZeroFrames { .. })
        ));
    }

    #[test]
    fn bind_chains_two_modules() {
        let mut first = doubler();
        let mut second = doubler();
        bind(&mut second, TaskTag(0), 0, &first, TaskTag(0), 1).unwrap();
        first
            .task(TaskTag(0))
            .unwrap()
            .socket(0)
            .unwrap()
            .write(|v: &mut [i32]| v.fill(1))
            .unwrap();
        first.exec(TaskTag(0)).unwrap();
        second.exec(TaskTag(0)).unwrap();
        let out = second.task(TaskTag(0)).unwrap().socket(1).unwrap().snapshot();
        assert_eq!(out.as_slice::<i32>().unwrap(), &[4; 6]);
    }
}
