//! Rate adaptor: bridges a stage producing one batch per call to stages
//! consuming at another cadence, possibly on other threads.
//!
//! An adaptor owns one ring of slots per lane and exposes two tasks, `push`
//! and `pull`. With [`Fan::OneToN`] the push side round-robins over the lanes
//! and lane handle *i* pulls from ring *i*; [`Fan::NToOne`] is the dual. Each
//! ring is single-producer single-consumer: the k-th pull on a ring sees the
//! k-th push to it.
//!
//! In no-copy mode the adaptor never copies elements. It swaps storage
//! between the socket and the slot, so the slot owns what was produced and
//! the socket (plus anything aliasing it) gets the slot's spare buffer.
//!
//! Task and socket names follow the fan: `push_1`/`pull_n` for one-to-n,
//! `push_n`/`pull_1` for n-to-one, with sockets `in1..` and `out1..`.

#![warn(missing_docs)]

mod ring;

pub use ring::{SlotState, WaitPolicy};

use crate::error::ContractViolation;
use crate::invariant_ppt::{
    assert_invariant, ADAPTOR_SOCKETS_MATCH_SLOTS, LANE_SHARES_RINGS, RING_RESET_EMPTY,
    RING_SLOTS_SIZED,
};
use crate::kind::{ElementKind, FrameData};
use crate::module::{Block, Module};
use crate::socket::Socket;
use crate::task::{Status, Task, TaskTag};
use ring::Ring;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default ring capacity, in slots.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Upper bound on lanes per adaptor.
pub const MAX_LANES: usize = 1000;

/// Which side of the adaptor has several lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fan {
    /// One pusher feeds `n_lanes` pullers.
    #[default]
    OneToN,
    /// `n_lanes` pushers feed one puller.
    NToOne,
}

/// Tasks exposed by an adaptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptorTask {
    /// Producer side: moves the input sockets into the next free slot.
    Push = 0,
    /// Consumer side: moves the next filled slot into the output sockets.
    Pull = 1,
}

impl AdaptorTask {
    /// Tag of this task on every adaptor.
    pub const fn tag(self) -> TaskTag {
        TaskTag(self as usize)
    }
}

impl From<AdaptorTask> for TaskTag {
    fn from(task: AdaptorTask) -> Self {
        task.tag()
    }
}

/// Kind and per-frame element count of one logical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    /// Element kind of the stream.
    pub kind: ElementKind,
    /// Elements per frame.
    pub n_elmts: usize,
}

/// Construction parameters; fixed for the adaptor's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptorConfig {
    /// Which side has several lanes.
    pub fan: Fan,
    /// One entry per socket pair.
    pub streams: Vec<StreamSpec>,
    /// Slots per ring.
    pub buffer_size: usize,
    /// Spin instead of sleeping while waiting for a slot.
    pub active_waiting: bool,
    /// Frames per push/pull call.
    pub n_frames: usize,
    /// Swap storage instead of copying on push.
    pub no_copy_push: bool,
    /// Swap storage instead of copying on pull.
    pub no_copy_pull: bool,
    /// Rings on the fanned side.
    pub n_lanes: usize,
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            fan: Fan::OneToN,
            streams: Vec::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            active_waiting: false,
            n_frames: 1,
            no_copy_push: false,
            no_copy_pull: false,
            n_lanes: 1,
        }
    }
}

impl AdaptorConfig {
    /// `n_sockets` streams of the same kind and size.
    pub fn uniform(fan: Fan, n_sockets: usize, kind: ElementKind, n_elmts: usize) -> Self {
        Self {
            fan,
            streams: vec![StreamSpec { kind, n_elmts }; n_sockets],
            ..Self::default()
        }
    }

    /// One stream per `(kind, n_elmts)` pair.
    pub fn streams(fan: Fan, streams: Vec<(ElementKind, usize)>) -> Self {
        Self {
            fan,
            streams: streams
                .into_iter()
                .map(|(kind, n_elmts)| StreamSpec { kind, n_elmts })
                .collect(),
            ..Self::default()
        }
    }

    /// Set the ring capacity.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Choose spinning (`true`) or blocking (`false`) waits.
    pub fn with_active_waiting(mut self, active_waiting: bool) -> Self {
        self.active_waiting = active_waiting;
        self
    }

    /// Set the frames per call.
    pub fn with_n_frames(mut self, n_frames: usize) -> Self {
        self.n_frames = n_frames;
        self
    }

    /// Enable storage swapping on push.
    pub fn with_no_copy_push(mut self, no_copy: bool) -> Self {
        self.no_copy_push = no_copy;
        self
    }

    /// Enable storage swapping on pull.
    pub fn with_no_copy_pull(mut self, no_copy: bool) -> Self {
        self.no_copy_pull = no_copy;
        self
    }

    /// Set the number of lanes.
    pub fn with_n_lanes(mut self, n_lanes: usize) -> Self {
        self.n_lanes = n_lanes;
        self
    }

    /// Number of streams, hence of sockets per task.
    pub fn n_sockets(&self) -> usize {
        self.streams.len()
    }

    /// Waiting policy implied by `active_waiting`.
    pub fn wait_policy(&self) -> WaitPolicy {
        if self.active_waiting {
            WaitPolicy::Active
        } else {
            WaitPolicy::Passive
        }
    }

    /// Reject configurations no adaptor can be built from.
    pub fn validate(&self) -> Result<(), ContractViolation> {
        let problem = if self.streams.is_empty() {
            Some("at least one stream is required".to_string())
        } else if let Some(s) = self.streams.iter().position(|s| s.n_elmts == 0) {
            Some(format!("stream {} has no elements", s))
        } else if self.buffer_size == 0 {
            Some("buffer_size must be at least 1".to_string())
        } else if self.n_frames == 0 {
            Some("n_frames must be at least 1".to_string())
        } else if self.n_lanes == 0 || self.n_lanes > MAX_LANES {
            Some(format!("n_lanes must be within 1..={}", MAX_LANES))
        } else {
            None
        };
        match problem {
            Some(p) => Err(ContractViolation::InvalidConfig(p)),
            None => Ok(()),
        }
    }
}

/// State shared by every lane handle of one adaptor.
struct Shared {
    config: AdaptorConfig,
    rings: Vec<Ring>,
    /// Next lane served by the round-robin side.
    turn: AtomicUsize,
}

impl Shared {
    fn next_turn(&self) {
        let n = self.rings.len();
        let t = self.turn.load(Ordering::Acquire);
        self.turn.store((t + 1) % n, Ordering::Release);
    }
}

/// Private state of one adaptor handle.
pub struct AdaptorState {
    shared: Arc<Shared>,
    lane: usize,
}

impl AdaptorState {
    fn push_lane(&self) -> usize {
        match self.shared.config.fan {
            Fan::OneToN => self.shared.turn.load(Ordering::Acquire),
            Fan::NToOne => self.lane,
        }
    }

    fn pull_lane(&self) -> usize {
        match self.shared.config.fan {
            Fan::OneToN => self.lane,
            Fan::NToOne => self.shared.turn.load(Ordering::Acquire),
        }
    }

    fn push(&mut self, task: &mut Task) -> Status {
        let lane = self.push_lane();
        let no_copy = self.shared.config.no_copy_push;
        let (pos, result) =
            self.shared.rings[lane].push_with(|slot| fill_slot(task.inputs(), slot, no_copy));
        if self.shared.config.fan == Fan::OneToN {
            self.shared.next_turn();
        }
        tracing::trace!(lane, pos, no_copy, "adaptor push");
        status_of(result, "push")
    }

    fn pull(&mut self, task: &mut Task) -> Status {
        let lane = self.pull_lane();
        let no_copy = self.shared.config.no_copy_pull;
        let (pos, result) =
            self.shared.rings[lane].pull_with(|slot| drain_slot(slot, task.outputs(), no_copy));
        if self.shared.config.fan == Fan::NToOne {
            self.shared.next_turn();
        }
        tracing::trace!(lane, pos, no_copy, "adaptor pull");
        status_of(result, "pull")
    }
}

fn status_of(result: Result<(), ContractViolation>, side: &str) -> Status {
    match result {
        Ok(()) => Status::Success,
        Err(e) => {
            tracing::error!(side, "adaptor slot transfer failed: {}", e);
            Status::Failure
        }
    }
}

/// Every socket buffer must match its slot before any stream is touched, so
/// a failed transfer leaves both sides as they were.
fn check_geometry(sockets: &[Socket], slot: &[FrameData]) -> Result<(), ContractViolation> {
    for (socket, frame) in sockets.iter().zip(slot) {
        let data = socket.lock();
        if data.kind() != frame.kind() {
            return Err(ContractViolation::KindMismatch {
                expected: frame.kind(),
                found: data.kind(),
            });
        }
        if data.len() != frame.len() {
            return Err(ContractViolation::BindMismatch {
                dst: "slot".to_string(),
                src: socket.name().to_string(),
                reason: "element counts differ",
            });
        }
    }
    Ok(())
}

fn fill_slot(inputs: &[Socket], slot: &mut [FrameData], no_copy: bool) -> Result<(), ContractViolation> {
    check_geometry(inputs, slot)?;
    for (socket, frame) in inputs.iter().zip(slot.iter_mut()) {
        let mut data = socket.lock();
        if no_copy {
            std::mem::swap(&mut *data, frame);
        } else {
            frame.copy_from(&data)?;
        }
    }
    Ok(())
}

fn drain_slot(slot: &mut [FrameData], outputs: &[Socket], no_copy: bool) -> Result<(), ContractViolation> {
    check_geometry(outputs, slot)?;
    for (frame, socket) in slot.iter_mut().zip(outputs) {
        let mut data = socket.lock();
        if no_copy {
            std::mem::swap(&mut *data, frame);
        } else {
            data.copy_from(frame)?;
        }
    }
    Ok(())
}

/// One handle on a rate adaptor. Extra lane handles come from [`Adaptor::lane`].
pub struct Adaptor {
    module: Module<AdaptorState>,
}

impl std::fmt::Debug for Adaptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adaptor")
            .field("lane", &self.lane_id())
            .field("config", self.config())
            .finish()
    }
}

impl Adaptor {
    /// Allocate the rings and return the handle for lane 0.
    pub fn new(config: AdaptorConfig) -> Result<Self, ContractViolation> {
        config.validate()?;

        let geometry: Vec<(ElementKind, usize)> = config
            .streams
            .iter()
            .map(|s| (s.kind, s.n_elmts * config.n_frames))
            .collect();
        let policy = config.wait_policy();
        let rings: Vec<Ring> = (0..config.n_lanes)
            .map(|_| Ring::new(config.buffer_size, &geometry, policy))
            .collect();
        assert_invariant(
            RING_SLOTS_SIZED,
            rings
                .iter()
                .all(|r| r.capacity() == config.buffer_size && r.slots_match(&geometry)),
            "Every slot holds one n_elmts * n_frames buffer per stream",
            Some("Adaptor::new"),
        );

        tracing::debug!(
            fan = ?config.fan,
            n_sockets = config.n_sockets(),
            buffer_size = config.buffer_size,
            n_lanes = config.n_lanes,
            active_waiting = config.active_waiting,
            no_copy_push = config.no_copy_push,
            no_copy_pull = config.no_copy_pull,
            "adaptor created"
        );

        let shared = Arc::new(Shared {
            config,
            rings,
            turn: AtomicUsize::new(0),
        });
        Self::with_lane(shared, 0)
    }

    fn with_lane(shared: Arc<Shared>, lane: usize) -> Result<Self, ContractViolation> {
        let config = shared.config.clone();
        let (name, push_name, pull_name) = match config.fan {
            Fan::OneToN => ("Adaptor_1_to_n", "push_1", "pull_n"),
            Fan::NToOne => ("Adaptor_n_to_1", "push_n", "pull_1"),
        };
        let mut module = Module::new(name, config.n_frames, AdaptorState { shared, lane })?;
        module.set_short_name("Adaptor");

        let push = module.create_task(push_name, AdaptorTask::Push.tag())?;
        for (s, stream) in config.streams.iter().enumerate() {
            module.create_socket_in(push, &format!("in{}", s + 1), stream.kind, stream.n_elmts)?;
        }
        module.create_codelet(push, |state: &mut AdaptorState, task: &mut Task| state.push(task))?;

        let pull = module.create_task(pull_name, AdaptorTask::Pull.tag())?;
        for (s, stream) in config.streams.iter().enumerate() {
            module.create_socket_out(pull, &format!("out{}", s + 1), stream.kind, stream.n_elmts)?;
        }
        module.create_codelet(pull, |state: &mut AdaptorState, task: &mut Task| state.pull(task))?;

        let adaptor = Self { module };
        let slot_geometry: Vec<(ElementKind, usize)> = config
            .streams
            .iter()
            .map(|s| (s.kind, s.n_elmts * config.n_frames))
            .collect();
        assert_invariant(
            ADAPTOR_SOCKETS_MATCH_SLOTS,
            adaptor.sockets_match(AdaptorTask::Push, &slot_geometry)
                && adaptor.sockets_match(AdaptorTask::Pull, &slot_geometry),
            "Push and pull sockets match the slot buffers",
            Some("Adaptor::with_lane"),
        );
        Ok(adaptor)
    }

    fn sockets_match(&self, task: AdaptorTask, slot_geometry: &[(ElementKind, usize)]) -> bool {
        self.module.task(task.tag()).is_ok_and(|t| {
            t.sockets().len() == slot_geometry.len()
                && t.sockets().iter().zip(slot_geometry).all(|(socket, &(kind, len))| {
                    let data = socket.lock();
                    socket.kind() == kind && data.kind() == kind && data.len() == len
                })
        })
    }

    /// A new handle on lane `lane`, sharing this adaptor's rings.
    pub fn lane(&self, lane: usize) -> Result<Self, ContractViolation> {
        let n_lanes = self.n_lanes();
        if lane >= n_lanes {
            return Err(ContractViolation::InvalidLane { lane, n_lanes });
        }
        let shared = Arc::clone(&self.module.state().shared);
        let handle = Self::with_lane(shared, lane)?;
        assert_invariant(
            LANE_SHARES_RINGS,
            Arc::ptr_eq(&handle.module.state().shared, &self.module.state().shared),
            "Lane handles share one set of rings",
            Some("Adaptor::lane"),
        );
        Ok(handle)
    }

    /// Construction parameters, shared by every lane handle.
    pub fn config(&self) -> &AdaptorConfig {
        &self.module.state().shared.config
    }

    /// Lane served by this handle.
    pub fn lane_id(&self) -> usize {
        self.module.state().lane
    }

    /// Number of rings.
    pub fn n_lanes(&self) -> usize {
        self.module.state().shared.rings.len()
    }

    /// Slots per ring.
    pub fn capacity(&self) -> usize {
        self.config().buffer_size
    }

    /// Name without the fan suffix.
    pub fn short_name(&self) -> &str {
        self.module.short_name()
    }

    fn ring(&self, lane: usize) -> Result<&Ring, ContractViolation> {
        let rings = &self.module.state().shared.rings;
        rings.get(lane).ok_or(ContractViolation::InvalidLane {
            lane,
            n_lanes: rings.len(),
        })
    }

    /// Slots of `lane` holding data not yet pulled.
    pub fn n_filled(&self, lane: usize) -> Result<usize, ContractViolation> {
        Ok(self.ring(lane)?.n_filled())
    }

    /// Every slot of `lane` is waiting to be pulled.
    pub fn is_full(&self, lane: usize) -> Result<bool, ContractViolation> {
        let ring = self.ring(lane)?;
        Ok(ring.n_filled() == ring.capacity())
    }

    /// Nothing in `lane` is waiting to be pulled.
    pub fn is_empty(&self, lane: usize) -> Result<bool, ContractViolation> {
        Ok(self.ring(lane)?.n_filled() == 0)
    }

    /// State of slot `index` in `lane`.
    pub fn slot_state(&self, lane: usize, index: usize) -> Result<Option<SlotState>, ContractViolation> {
        Ok(self.ring(lane)?.slot_state(index))
    }

    /// Total pushes and pulls performed on `lane`.
    pub fn cursors(&self, lane: usize) -> Result<(usize, usize), ContractViolation> {
        let ring = self.ring(lane)?;
        Ok((ring.filled_total(), ring.drained_total()))
    }

    /// Wait until everything pushed to `lane` has been pulled.
    pub fn wait_drained(&self, lane: usize) -> Result<(), ContractViolation> {
        self.ring(lane)?.wait_drained();
        Ok(())
    }

    /// Empty every ring and rewind the cursors. No push or pull may be in
    /// flight on any lane handle.
    pub fn reset(&mut self) {
        let shared = &self.module.state().shared;
        for ring in &shared.rings {
            ring.reset();
        }
        shared.turn.store(0, Ordering::Release);
        assert_invariant(
            RING_RESET_EMPTY,
            shared.rings.iter().all(|r| r.n_filled() == 0),
            "Reset leaves every ring empty",
            Some("Adaptor::reset"),
        );
        tracing::debug!(lane = self.lane_id(), "adaptor reset");
    }

    /// Run the push task once.
    pub fn push(&mut self) -> Result<Status, ContractViolation> {
        self.module.exec(AdaptorTask::Push.tag())
    }

    /// Run the pull task once.
    pub fn pull(&mut self) -> Result<Status, ContractViolation> {
        self.module.exec(AdaptorTask::Pull.tag())
    }

    /// Input socket `s` of the push task.
    pub fn input(&self, s: usize) -> Result<&Socket, ContractViolation> {
        self.module.task(AdaptorTask::Push.tag())?.socket(s)
    }

    /// Output socket `s` of the pull task.
    pub fn output(&self, s: usize) -> Result<&Socket, ContractViolation> {
        self.module.task(AdaptorTask::Pull.tag())?.socket(s)
    }
}

impl Block for Adaptor {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_config(capacity: usize) -> AdaptorConfig {
        AdaptorConfig::uniform(Fan::OneToN, 1, ElementKind::F32, 2)
            .with_buffer_size(capacity)
            .with_n_frames(3)
    }

    fn set_input(a: &Adaptor, values: &[f32]) {
        a.input(0)
            .unwrap()
            .write(|v: &mut [f32]| v.copy_from_slice(values))
            .unwrap();
    }

    fn get_output(a: &Adaptor) -> Vec<f32> {
        a.output(0).unwrap().read(|v: &[f32]| v.to_vec()).unwrap()
    }

    #[test]
    fn tasks_and_sockets_follow_config() {
        let a = Adaptor::new(AdaptorConfig::streams(
            Fan::NToOne,
            vec![(ElementKind::I8, 4), (ElementKind::F64, 2)],
        ))
        .unwrap();
        assert_eq!(a.name(), "Adaptor_n_to_1");
        assert_eq!(a.short_name(), "Adaptor");
        let push = a.task(AdaptorTask::Push.tag()).unwrap();
        let pull = a.task(AdaptorTask::Pull.tag()).unwrap();
        assert_eq!(push.inputs().len(), 2);
        assert_eq!(push.outputs().len(), 0);
        assert_eq!(pull.outputs().len(), 2);
        assert_eq!(push.socket(1).unwrap().kind(), ElementKind::F64);
        assert_eq!(push.name(), "push_n");
        assert_eq!(pull.name(), "pull_1");
        assert_eq!(push.socket(0).unwrap().name(), "in1");
        assert_eq!(pull.socket_by_name("out1").unwrap().n_elmts(), 4);
        assert!(pull.socket_by_name("out0").is_none());
        assert_eq!(a.capacity(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = AdaptorConfig::uniform(Fan::OneToN, 1, ElementKind::I32, 4);
        assert!(Adaptor::new(AdaptorConfig::default()).is_err());
        assert!(Adaptor::new(base.clone().with_buffer_size(0)).is_err());
        assert!(Adaptor::new(base.clone().with_n_frames(0)).is_err());
        assert!(Adaptor::new(base.clone().with_n_lanes(0)).is_err());
        assert!(Adaptor::new(base.clone().with_n_lanes(MAX_LANES + 1)).is_err());
        assert!(Adaptor::new(AdaptorConfig::uniform(Fan::OneToN, 1, ElementKind::I32, 0)).is_err());
        assert!(Adaptor::new(base).is_ok());
    }

    #[test]
    fn copy_push_then_pull_preserves_order() {
        let mut a = Adaptor::new(f32_config(4)).unwrap();
        for k in 0..3 {
            let v: Vec<f32> = (0..6).map(|i| (k * 10 + i) as f32).collect();
            set_input(&a, &v);
            assert_eq!(a.push(), Ok(Status::Success));
        }
        assert_eq!(a.n_filled(0), Ok(3));
        for k in 0..3 {
            assert_eq!(a.pull(), Ok(Status::Success));
            let expected: Vec<f32> = (0..6).map(|i| (k * 10 + i) as f32).collect();
            assert_eq!(get_output(&a), expected);
        }
        assert_eq!(a.is_empty(0), Ok(true));
    }

    #[test]
    fn no_copy_swaps_storage_instead_of_copying() {
        let mut a = Adaptor::new(f32_config(2).with_no_copy_push(true).with_no_copy_pull(true)).unwrap();
        set_input(&a, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        a.push().unwrap();
        // the producer's buffer moved into the ring; the socket holds a spare
        assert_eq!(
            a.input(0).unwrap().read(|v: &[f32]| v.to_vec()).unwrap(),
            vec![0.0; 6]
        );
        a.pull().unwrap();
        assert_eq!(get_output(&a), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn failed_push_does_not_publish_the_slot() {
        for no_copy in [false, true] {
            let mut a =
                Adaptor::new(f32_config(2).with_no_copy_push(no_copy).with_no_copy_pull(no_copy)).unwrap();
            set_input(&a, &[1.0; 6]);
            a.push().unwrap();
            a.pull().unwrap();

            *a.input(0).unwrap().lock() = FrameData::F64(vec![9.0; 5]);
            assert_eq!(a.push(), Ok(Status::Failure));
            assert_eq!(a.n_filled(0), Ok(0));
            assert_eq!(a.cursors(0), Ok((1, 1)));
            assert_eq!(a.slot_state(0, 1), Ok(Some(SlotState::Empty)));
            // the bad buffer was not swapped into the ring
            assert_eq!(a.input(0).unwrap().snapshot(), FrameData::F64(vec![9.0; 5]));

            *a.input(0).unwrap().lock() = FrameData::zeroed(ElementKind::F32, 6);
            set_input(&a, &[2.0; 6]);
            assert_eq!(a.push(), Ok(Status::Success));
            assert_eq!(a.pull(), Ok(Status::Success));
            assert_eq!(get_output(&a), vec![2.0; 6]);
        }
    }

    #[test]
    fn failed_pull_keeps_the_slot_for_a_retry() {
        let mut a = Adaptor::new(f32_config(2)).unwrap();
        set_input(&a, &[3.0; 6]);
        a.push().unwrap();

        *a.output(0).unwrap().lock() = FrameData::I8(vec![0; 6]);
        assert_eq!(a.pull(), Ok(Status::Failure));
        assert_eq!(a.n_filled(0), Ok(1));
        assert_eq!(a.slot_state(0, 0), Ok(Some(SlotState::Filled)));

        *a.output(0).unwrap().lock() = FrameData::zeroed(ElementKind::F32, 6);
        assert_eq!(a.pull(), Ok(Status::Success));
        assert_eq!(get_output(&a), vec![3.0; 6]);
        assert_eq!(a.is_empty(0), Ok(true));
    }

    #[test]
    fn full_ring_reports_full() {
        let mut a = Adaptor::new(f32_config(2)).unwrap();
        a.push().unwrap();
        a.push().unwrap();
        assert_eq!(a.is_full(0), Ok(true));
        assert_eq!(a.slot_state(0, 1), Ok(Some(SlotState::Filled)));
        a.pull().unwrap();
        assert_eq!(a.is_full(0), Ok(false));
        assert_eq!(a.cursors(0), Ok((2, 1)));
    }

    #[test]
    fn reset_empties_rings() {
        let mut a = Adaptor::new(f32_config(3)).unwrap();
        a.push().unwrap();
        a.push().unwrap();
        a.reset();
        assert_eq!(a.n_filled(0), Ok(0));
        assert_eq!(a.cursors(0), Ok((0, 0)));
    }

    #[test]
    fn lane_out_of_range_is_rejected() {
        let a = Adaptor::new(f32_config(2).with_n_lanes(2)).unwrap();
        assert!(a.lane(1).is_ok());
        assert_eq!(
            a.lane(2).unwrap_err(),
            ContractViolation::InvalidLane { lane: 2, n_lanes: 2 }
        );
        assert!(a.n_filled(5).is_err());
    }

    #[test]
    fn one_to_n_round_robins_lanes() {
        let mut a = Adaptor::new(f32_config(4).with_n_lanes(2)).unwrap();
        let mut b = a.lane(1).unwrap();
        for k in 0..4 {
            set_input(&a, &[k as f32; 6]);
            a.push().unwrap();
        }
        assert_eq!(a.n_filled(0), Ok(2));
        assert_eq!(a.n_filled(1), Ok(2));
        a.pull().unwrap();
        assert_eq!(get_output(&a), vec![0.0; 6]);
        b.pull().unwrap();
        assert_eq!(get_output(&b), vec![1.0; 6]);
        a.pull().unwrap();
        assert_eq!(get_output(&a), vec![2.0; 6]);
        b.pull().unwrap();
        assert_eq!(get_output(&b), vec![3.0; 6]);
    }

    #[test]
    fn n_to_one_round_robins_lanes() {
        let cfg = AdaptorConfig::uniform(Fan::NToOne, 1, ElementKind::I64, 1)
            .with_buffer_size(4)
            .with_n_lanes(3);
        let mut lanes: Vec<Adaptor> = vec![Adaptor::new(cfg).unwrap()];
        for l in 1..3 {
            let handle = lanes[0].lane(l).unwrap();
            lanes.push(handle);
        }
        for (l, handle) in lanes.iter_mut().enumerate() {
            handle
                .input(0)
                .unwrap()
                .write(|v: &mut [i64]| v[0] = 100 + l as i64)
                .unwrap();
            handle.push().unwrap();
        }
        let mut got = Vec::new();
        for _ in 0..3 {
            lanes[0].pull().unwrap();
            got.push(lanes[0].output(0).unwrap().read(|v: &[i64]| v[0]).unwrap());
        }
        assert_eq!(got, vec![100, 101, 102]);
    }
}
