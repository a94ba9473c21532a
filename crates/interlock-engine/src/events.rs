//! Outbound notifications.
//!
//! Observers (an editor, a panel, a test) learn about changes through a
//! channel owned by the network. Events are queued while a mutation runs
//! and read with
//! [`Network::drain_events()`](crate::network::Network::drain_events) once
//! it has settled. The channel is bounded by
//! [`EngineConfig::event_capacity`](crate::EngineConfig::event_capacity);
//! an embedder that never drains loses the newest events, not memory.

use std::cell::Cell;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

use interlock_core::{CableId, CablePower, NodeId, RelayId};

use crate::node::remote::RemoteMode;
use crate::relay::RelayState;

/// Something observable changed.
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkEvent {
    /// A node's circuit lists or contact counters changed.
    NodeCircuitsChanged {
        /// Node.
        node: NodeId,
    },
    /// A cable's power or flags changed.
    CablePowerChanged {
        /// Cable.
        cable: CableId,
        /// New power.
        power: CablePower,
    },
    /// A relay armature changed state.
    RelayStateChanged {
        /// Relay.
        relay: RelayId,
        /// New state.
        state: RelayState,
    },
    /// A lamp, sound or electromagnet switched on or off.
    ActivationChanged {
        /// Node.
        node: NodeId,
        /// Whether it is now energized.
        active: bool,
    },
    /// A power source, transformer or remote bridge was enabled or disabled.
    SourceEnabledChanged {
        /// Node.
        node: NodeId,
        /// New flag.
        enabled: bool,
    },
    /// A remote bridge changed mode.
    RemoteModeChanged {
        /// Node.
        node: NodeId,
        /// New mode.
        mode: RemoteMode,
    },
    /// A deviator (relay contact, lever contact, button) moved.
    DeviatorStateChanged {
        /// Node.
        node: NodeId,
        /// Up contact closed.
        up: bool,
        /// Down contact closed.
        down: bool,
    },
}

/// Event queue.
#[derive(Debug)]
pub(crate) struct Outbox {
    tx: Sender<NetworkEvent>,
    rx: Receiver<NetworkEvent>,
    dropped: Cell<u64>,
}

impl Outbox {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        let (tx, rx) = match capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        Self {
            tx,
            rx,
            dropped: Cell::new(0),
        }
    }

    pub(crate) fn push(&self, event: NetworkEvent) {
        // Both halves live in `self`, so the channel cannot be disconnected.
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped.set(self.dropped.get() + 1);
        }
    }

    /// Events refused because the queue was full.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    pub(crate) fn drain(&self) -> Vec<NetworkEvent> {
        self.rx.try_iter().collect()
    }

    /// A receiver observing the same queue. Events read through it are not
    /// returned by [`drain`](Self::drain).
    pub(crate) fn subscribe(&self) -> Receiver<NetworkEvent> {
        self.rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn drain_returns_in_order_and_empties() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = nodes.insert(());
        let b = nodes.insert(());
        let outbox = Outbox::new(None);
        outbox.push(NetworkEvent::NodeCircuitsChanged { node: a });
        outbox.push(NetworkEvent::ActivationChanged {
            node: b,
            active: true,
        });
        let events = outbox.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], NetworkEvent::NodeCircuitsChanged { node: a });
        assert!(outbox.drain().is_empty());
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = nodes.insert(());
        let outbox = Outbox::new(Some(2));
        for _ in 0..5 {
            outbox.push(NetworkEvent::NodeCircuitsChanged { node: a });
        }
        assert_eq!(outbox.dropped(), 3);
        assert_eq!(outbox.drain().len(), 2);
        outbox.push(NetworkEvent::NodeCircuitsChanged { node: a });
        assert_eq!(outbox.drain().len(), 1);
        assert_eq!(outbox.dropped(), 3);
    }
}
