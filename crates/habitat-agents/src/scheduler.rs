//! Per-agent scheduled continuations.
//!
//! Timed waits ("pause one second before pickup") are entries in a queue
//! keyed by due time. The tick cycle pops whatever is due and hands it to
//! the owner. Every entry records who owns it, so switching behaviors can
//! cancel exactly the old variant's pending work.

use std::collections::BTreeMap;
use std::time::Duration;

use habitat_types::BehaviorKind;

/// Simulation time in whole milliseconds since start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: Self = Self(0);

    /// Milliseconds since start.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Seconds since start.
    pub fn as_secs_f64(self) -> f64 {
        Duration::from_millis(self.0).as_secs_f64()
    }

    /// This instant plus `delay`, saturating at the end of time.
    pub fn saturating_add(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Time elapsed since `earlier` (zero if `earlier` is later).
    pub const fn since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl core::fmt::Display for SimTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Convert configured seconds into a [`Duration`]; invalid values become zero.
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Who a continuation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContinuationOwner {
    /// A behavior variant; cancelled when the variant is disabled.
    Behavior(BehaviorKind),
    /// The agent itself; survives behavior switches.
    Manager,
}

/// What should happen when a continuation comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContinuationKind {
    /// Gather: stuck check and wander retarget.
    GatherRetarget,
    /// `BuildWall`: the pause at the habitat is over.
    HabitatWaitElapsed,
    /// `BuildWall`: the pause at the build site is over.
    BuildSiteWaitElapsed,
    /// `MoveBlock`: the pause before pickup is over.
    PickupWaitElapsed,
    /// `MoveBlock`: the pause after pickup is over.
    AfterPickupWaitElapsed,
    /// Agent: exhaustion update.
    ExhaustionTick,
    /// Agent: deposit carried food at the habitat.
    HabitatDeposit,
    /// Agent: a hostile stayed gone for the buffer delay.
    EnemyDepartureConfirmed,
    /// Agent: periodic reasoning request.
    ReasoningTimeout,
}

/// A pending continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    /// Owner.
    pub owner: ContinuationOwner,
    /// Action.
    pub kind: ContinuationKind,
}

/// Handle for cancelling a single continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContinuationHandle(u64);

/// A priority queue of continuations keyed by `(due, sequence)`.
///
/// The sequence number keeps entries with the same due time in scheduling
/// order.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BTreeMap<(SimTime, u64), Continuation>,
    next_seq: u64,
}

impl Scheduler {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `kind` for `owner` to run `delay` after `now`.
    pub fn schedule(
        &mut self,
        now: SimTime,
        delay: Duration,
        owner: ContinuationOwner,
        kind: ContinuationKind,
    ) -> ContinuationHandle {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.queue
            .insert((now.saturating_add(delay), seq), Continuation { owner, kind });
        ContinuationHandle(seq)
    }

    /// Cancel one continuation. Returns `false` if it already ran or was
    /// cancelled.
    pub fn cancel(&mut self, handle: ContinuationHandle) -> bool {
        let key = self.queue.keys().find(|(_, seq)| *seq == handle.0).copied();
        key.is_some_and(|k| self.queue.remove(&k).is_some())
    }

    /// Cancel everything `owner` scheduled. Returns how many were dropped.
    pub fn cancel_owned_by(&mut self, owner: ContinuationOwner) -> usize {
        let before = self.queue.len();
        self.queue.retain(|_, c| c.owner != owner);
        before.saturating_sub(self.queue.len())
    }

    /// Cancel every pending continuation of one kind.
    pub fn cancel_kind(&mut self, kind: ContinuationKind) -> usize {
        let before = self.queue.len();
        self.queue.retain(|_, c| c.kind != kind);
        before.saturating_sub(self.queue.len())
    }

    /// Remove and return the earliest continuation due at or before `now`.
    pub fn pop_due(&mut self, now: SimTime) -> Option<Continuation> {
        let (&(due, _), _) = self.queue.first_key_value()?;
        if due > now {
            return None;
        }
        self.queue.pop_first().map(|(_, c)| c)
    }

    /// Number of pending continuations owned by `owner`.
    pub fn pending_for(&self, owner: ContinuationOwner) -> usize {
        self.queue.values().filter(|c| c.owner == owner).count()
    }

    /// Whether a continuation of `kind` is pending.
    pub fn is_pending(&self, kind: ContinuationKind) -> bool {
        self.queue.values().any(|c| c.kind == kind)
    }

    /// Total pending continuations.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
