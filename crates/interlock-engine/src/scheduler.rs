//! Virtual clock and deferred work.
//!
//! Everything time-based (coil delays, armature travel, remote-bridge
//! latency) and everything that must not run inside the registration that
//! triggered it (transformer secondary refresh, remote-bridge state refresh)
//! becomes a [`Task`] on this queue. Tasks run in `(due, insertion)` order,
//! so equal-time tasks keep the order they were scheduled in.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use interlock_core::{CircuitPole, NodeId, RelayId};

use crate::node::remote::RemoteMode;

/// Simulated time in milliseconds since the network was created.
pub type SimTime = u64;

/// A unit of deferred work.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Task {
    /// A coil's pickup/drop delay elapsed.
    CoilDelay {
        node: NodeId,
        coil: usize,
        generation: u64,
    },
    /// One armature travel step.
    RelayTick { relay: RelayId, generation: u64 },
    /// Re-evaluate whether a transformer's secondary should be live.
    TransformerRefresh { node: NodeId },
    /// Deliver a peer's mode to a remote bridge.
    RemotePeerMode {
        node: NodeId,
        mode: RemoteMode,
        pole: CircuitPole,
    },
    /// Tear down a remote bridge's circuits outside of a removal.
    RemoteRefresh { node: NodeId },
}

#[derive(Debug)]
struct Entry {
    due: SimTime,
    seq: u64,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        (self.due, self.seq) == (other.due, other.seq)
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Deterministic task queue over [`SimTime`].
#[derive(Debug, Default)]
pub struct Scheduler {
    now: SimTime,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Entry>>,
}

impl Scheduler {
    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Due time of the earliest queued task.
    pub fn next_due(&self) -> Option<SimTime> {
        self.queue.peek().map(|Reverse(e)| e.due)
    }

    pub(crate) fn schedule(&mut self, delay_ms: u64, task: Task) {
        let entry = Entry {
            due: self.now.saturating_add(delay_ms),
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Pop the earliest task due at or before `limit`, moving the clock to
    /// its due time.
    pub(crate) fn pop_due(&mut self, limit: SimTime) -> Option<Task> {
        match self.queue.peek() {
            Some(Reverse(e)) if e.due <= limit => {}
            _ => return None,
        }
        let Reverse(entry) = self.queue.pop()?;
        self.now = self.now.max(entry.due);
        Some(entry.task)
    }

    /// Move the clock forward to `time` once no task before it remains.
    pub(crate) fn advance_to(&mut self, time: SimTime) {
        self.now = self.now.max(time);
    }
}
