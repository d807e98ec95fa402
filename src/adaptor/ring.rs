//! Bounded ring of buffer slots shared by one pusher and one puller.
//!
//! Each slot is its own cell: an atomic state, a mutex over the stream
//! buffers and a condvar. A slot is only ever claimed by the side whose turn
//! it is (push on `Empty`, pull on `Filled`), so the two sides never contend
//! for the same slot data. The cursors are monotonic counters; the slot index
//! is `counter % capacity`.

use crate::kind::{ElementKind, FrameData};
use std::hint;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Free for the next push.
    Empty = 0,
    /// Claimed by a push in progress.
    Writing = 1,
    /// Holds a batch waiting to be pulled.
    Filled = 2,
    /// Claimed by a pull in progress.
    Reading = 3,
}

impl SlotState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SlotState::Empty,
            1 => SlotState::Writing,
            2 => SlotState::Filled,
            _ => SlotState::Reading,
        }
    }
}

/// How a side waits for its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Spin on the slot state.
    Active,
    /// Sleep on the slot condvar.
    Passive,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Slot {
    state: AtomicU8,
    data: Mutex<Vec<FrameData>>,
    ready: Condvar,
}

impl Slot {
    fn new(streams: &[(ElementKind, usize)]) -> Self {
        Self {
            state: AtomicU8::new(SlotState::Empty as u8),
            data: Mutex::new(
                streams
                    .iter()
                    .map(|&(kind, len)| FrameData::zeroed(kind, len))
                    .collect(),
            ),
            ready: Condvar::new(),
        }
    }

    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Wait for `from`, then take the slot data and mark it `to`.
    fn claim(&self, from: SlotState, to: SlotState, policy: WaitPolicy) -> MutexGuard<'_, Vec<FrameData>> {
        let guard = match policy {
            WaitPolicy::Active => {
                while self.state.load(Ordering::Acquire) != from as u8 {
                    hint::spin_loop();
                }
                lock(&self.data)
            }
            WaitPolicy::Passive => {
                let guard = lock(&self.data);
                self.ready
                    .wait_while(guard, |_| self.state.load(Ordering::Acquire) != from as u8)
                    .unwrap_or_else(PoisonError::into_inner)
            }
        };
        self.state.store(to as u8, Ordering::Release);
        guard
    }

    /// Publish `to` while still holding the data, then wake waiters.
    fn release(&self, guard: MutexGuard<'_, Vec<FrameData>>, to: SlotState, policy: WaitPolicy) {
        self.state.store(to as u8, Ordering::Release);
        drop(guard);
        if policy == WaitPolicy::Passive {
            self.ready.notify_all();
        }
    }
}

/// Fixed-capacity SPSC ring of slots, each holding one buffer per stream.
pub(crate) struct Ring {
    slots: Box<[Slot]>,
    fill: AtomicUsize,
    drain: AtomicUsize,
    cursor: Mutex<()>,
    moved: Condvar,
    policy: WaitPolicy,
}

impl Ring {
    /// `streams` lists the kind and total element count of each stream.
    pub(crate) fn new(capacity: usize, streams: &[(ElementKind, usize)], policy: WaitPolicy) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::new(streams)).collect(),
            fill: AtomicUsize::new(0),
            drain: AtomicUsize::new(0),
            cursor: Mutex::new(()),
            moved: Condvar::new(),
            policy,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of pushes so far.
    pub(crate) fn filled_total(&self) -> usize {
        self.fill.load(Ordering::Acquire)
    }

    /// Number of pulls so far.
    pub(crate) fn drained_total(&self) -> usize {
        self.drain.load(Ordering::Acquire)
    }

    /// Slots currently holding data not yet pulled.
    pub(crate) fn n_filled(&self) -> usize {
        // drain first: fill only grows, so this never underflows.
        let drain = self.drain.load(Ordering::Acquire);
        let fill = self.fill.load(Ordering::Acquire);
        fill.saturating_sub(drain)
    }

    pub(crate) fn slot_state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(Slot::state)
    }

    /// Wait for the next slot in fill order to be empty, let `f` write the
    /// stream buffers, then hand the slot to the puller.
    ///
    /// If `f` fails the slot goes back to `Empty` and the fill cursor stays
    /// put, so the puller never sees a half-written slot. Returns the fill
    /// position used and `f`'s result.
    pub(crate) fn push_with<R, E>(
        &self,
        f: impl FnOnce(&mut [FrameData]) -> Result<R, E>,
    ) -> (usize, Result<R, E>) {
        let pos = self.fill.load(Ordering::Acquire);
        let slot = &self.slots[pos % self.slots.len()];
        let mut data = slot.claim(SlotState::Empty, SlotState::Writing, self.policy);
        let out = f(&mut data);
        if out.is_ok() {
            // cursor moves before the slot turns Filled, so drain can never pass fill
            self.advance(&self.fill);
            slot.release(data, SlotState::Filled, self.policy);
        } else {
            slot.release(data, SlotState::Empty, self.policy);
        }
        (pos, out)
    }

    /// Wait for the next slot in drain order to be filled, let `f` read the
    /// stream buffers, then hand the slot back to the pusher.
    ///
    /// If `f` fails the slot stays `Filled` and the next pull retries it.
    pub(crate) fn pull_with<R, E>(
        &self,
        f: impl FnOnce(&mut [FrameData]) -> Result<R, E>,
    ) -> (usize, Result<R, E>) {
        let pos = self.drain.load(Ordering::Acquire);
        let slot = &self.slots[pos % self.slots.len()];
        let mut data = slot.claim(SlotState::Filled, SlotState::Reading, self.policy);
        let out = f(&mut data);
        if out.is_ok() {
            // cursor moves before the slot turns Empty, so fill never laps drain
            self.advance(&self.drain);
            slot.release(data, SlotState::Empty, self.policy);
        } else {
            slot.release(data, SlotState::Filled, self.policy);
        }
        (pos, out)
    }

    /// True if every slot holds one buffer per stream of the given kind and
    /// length.
    pub(crate) fn slots_match(&self, streams: &[(ElementKind, usize)]) -> bool {
        self.slots.iter().all(|slot| {
            let data = lock(&slot.data);
            data.len() == streams.len()
                && data
                    .iter()
                    .zip(streams)
                    .all(|(frame, &(kind, len))| frame.kind() == kind && frame.len() == len)
        })
    }

    fn advance(&self, cursor: &AtomicUsize) {
        let _serial = lock(&self.cursor);
        cursor.fetch_add(1, Ordering::AcqRel);
        debug_assert!(
            self.fill.load(Ordering::Acquire) - self.drain.load(Ordering::Acquire) <= self.slots.len(),
            "fill cursor lapped drain cursor"
        );
        if self.policy == WaitPolicy::Passive {
            self.moved.notify_all();
        }
    }

    /// Block until every pushed slot has been pulled.
    pub(crate) fn wait_drained(&self) {
        let drained = || self.drain.load(Ordering::Acquire) == self.fill.load(Ordering::Acquire);
        match self.policy {
            WaitPolicy::Active => {
                while !drained() {
                    hint::spin_loop();
                }
            }
            WaitPolicy::Passive => {
                let guard = lock(&self.cursor);
                let _guard = self
                    .moved
                    .wait_while(guard, |_| !drained())
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    /// Mark every slot empty and rewind both cursors. No push or pull may be
    /// in flight.
    pub(crate) fn reset(&self) {
        let _serial = lock(&self.cursor);
        for slot in self.slots.iter() {
            let data = lock(&slot.data);
            slot.release(data, SlotState::Empty, self.policy);
        }
        self.fill.store(0, Ordering::Release);
        self.drain.store(0, Ordering::Release);
    }
}
