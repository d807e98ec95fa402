//! Sequence: an ordered list of task invocations run by one thread.
//!
//! A chain split across threads is one sequence per thread, with rate
//! adaptors bridging them. The sequence never spawns threads itself.

use crate::error::ContractViolation;
use crate::invariant_ppt::{assert_invariant, SEQUENCE_STEP_VALID};
use crate::module::Block;
use crate::task::{Status, TaskTag};

/// Index of a block owned by a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Blocks plus the order in which their tasks run.
#[derive(Default)]
pub struct Sequence {
    blocks: Vec<Box<dyn Block>>,
    steps: Vec<(BlockId, TaskTag)>,
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.blocks.iter().map(|b| b.name()).collect();
        f.debug_struct("Sequence")
            .field("blocks", &names)
            .field("steps", &self.steps)
            .finish()
    }
}

impl Sequence {
    /// Empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a block.
    pub fn add_block(&mut self, block: impl Block) -> BlockId {
        self.blocks.push(Box::new(block));
        BlockId(self.blocks.len() - 1)
    }

    /// Append a step. The block must own a task tagged `tag`.
    pub fn add_step(&mut self, block: BlockId, tag: TaskTag) -> Result<(), ContractViolation> {
        self.block(block)?.task(tag)?;
        self.steps.push((block, tag));
        assert_invariant(
            SEQUENCE_STEP_VALID,
            self.steps.iter().all(|(b, _)| b.0 < self.blocks.len()),
            "Steps only reference owned blocks",
            Some("add_step"),
        );
        Ok(())
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[(BlockId, TaskTag)] {
        &self.steps
    }

    /// Block registered under `id`.
    pub fn block(&self, id: BlockId) -> Result<&dyn Block, ContractViolation> {
        self.blocks
            .get(id.0)
            .map(|b| &**b)
            .ok_or(ContractViolation::UnknownBlock(id.0))
    }

    /// Mutable block registered under `id`.
    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut dyn Block, ContractViolation> {
        match self.blocks.get_mut(id.0) {
            Some(b) => Ok(&mut **b),
            None => Err(ContractViolation::UnknownBlock(id.0)),
        }
    }

    /// Downcast a block back to its concrete type.
    pub fn block_as<B: Block>(&self, id: BlockId) -> Option<&B> {
        self.blocks.get(id.0)?.as_any().downcast_ref::<B>()
    }

    /// Run every step once, in order. Stops at the first non-success status
    /// and returns it.
    pub fn exec_once(&mut self) -> Result<Status, ContractViolation> {
        for &(id, tag) in &self.steps {
            let block = self
                .blocks
                .get_mut(id.0)
                .ok_or(ContractViolation::UnknownBlock(id.0))?;
            let status = block.exec(tag)?;
            if !status.is_success() {
                tracing::debug!(block = block.name(), tag = tag.0, code = status.code(), "sequence stopped");
                return Ok(status);
            }
        }
        Ok(Status::Success)
    }

    /// Run the whole sequence `n` times, stopping early on a non-success status.
    pub fn exec(&mut self, n: usize) -> Result<Status, ContractViolation> {
        for _ in 0..n {
            let status = self.exec_once()?;
            if !status.is_success() {
                return Ok(status);
            }
        }
        Ok(Status::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Recorder, Source};
    use crate::module::{bind, Module};
    use crate::task::Task;

    #[test]
    fn steps_run_in_order() {
        let src = Source::<i32>::new(4, 1).unwrap();
        let mut recorder = Recorder::<i32>::new(4, 1).unwrap();
        bind(&mut recorder, Recorder::<i32>::RECORD, 0, &src, Source::<i32>::GENERATE, 0).unwrap();

        let mut seq = Sequence::new();
        let s = seq.add_block(src);
        let p = seq.add_block(recorder);
        seq.add_step(s, Source::<i32>::GENERATE).unwrap();
        seq.add_step(p, Recorder::<i32>::RECORD).unwrap();
        assert_eq!(seq.exec(3), Ok(Status::Success));

        let recorder = seq.block_as::<Recorder<i32>>(p).unwrap();
        assert_eq!(recorder.history().len(), 3);
        assert_eq!(recorder.history()[2], Source::<i32>::expected(2, 4));
        assert!(seq.block_as::<Source<f32>>(s).is_none());
    }

    #[test]
    fn invalid_steps_are_rejected() {
        let mut seq = Sequence::new();
        let s = seq.add_block(Source::<i8>::new(1, 1).unwrap());
        assert!(matches!(
            seq.add_step(s, TaskTag(9)),
            Err(ContractViolation::UnknownTask { tag: 9, .. })
        ));
        assert_eq!(
            seq.add_step(BlockId(4), TaskTag(0)),
            Err(ContractViolation::UnknownBlock(4))
        );
    }

    #[test]
    fn failure_status_stops_the_sequence() {
        let mut failing = Module::new("Failing", 1, 0u32).unwrap();
        let t = failing.create_task("fail", TaskTag(0)).unwrap();
        failing
            .create_codelet(t, |_: &mut u32, _: &mut Task| Status::Other(42))
            .unwrap();

        let mut seq = Sequence::new();
        let f = seq.add_block(failing);
        let s = seq.add_block(Source::<i8>::new(1, 1).unwrap());
        seq.add_step(f, t).unwrap();
        seq.add_step(s, Source::<i8>::GENERATE).unwrap();
        assert_eq!(seq.exec(5), Ok(Status::Other(42)));
        let source = seq.block(s).unwrap();
        assert_eq!(source.task(Source::<i8>::GENERATE).unwrap().n_calls(), 0);
        assert_eq!(seq.block(f).unwrap().task(t).unwrap().n_calls(), 1);
    }
}
