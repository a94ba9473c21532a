//! Remote bridge handshake.
//!
//! A bridge end reacts to circuits arriving at its contact and to modes
//! reported by its peer. The sender forwards current; the receiver
//! re-emits it as a dependent source. The receiver's own loops stay open
//! ("fake" loops: they start and end at the bridge on different poles)
//! until the sender reports that current can turn around on its side too.
//! Only then do both sides convert to closed circuits.
//!
//! Peer notifications travel through the scheduler, so each side reacts
//! after the mutation that changed the other has settled.

use tracing::debug;

use interlock_core::{AnyCircuitType, CircuitFlags, CircuitId, CircuitPole, CircuitType, NodeId};

use crate::events::NetworkEvent;
use crate::node::{NodeKind, RemoteBridge, RemoteMode};
use crate::scheduler::Task;

use super::hooks::{Phase, Touch};
use super::Network;

impl Network {
    fn bridge(&self, id: NodeId) -> Option<&RemoteBridge> {
        match self.nodes.get(id)?.kind() {
            NodeKind::RemoteBridge(b) => Some(b),
            _ => None,
        }
    }

    fn bridge_mut(&mut self, id: NodeId) -> Option<&mut RemoteBridge> {
        match self.nodes.get_mut(id)?.kind_mut() {
            NodeKind::RemoteBridge(b) => Some(b),
            _ => None,
        }
    }

    fn bridge_contact(&self, id: NodeId) -> AnyCircuitType {
        self.nodes
            .get(id)
            .map_or(AnyCircuitType::None, |n| n.accounting().any_circuit(0))
    }

    /// Open loops that leave and return to the bridge on different poles.
    fn fake_loops(&self, id: NodeId) -> Vec<CircuitId> {
        self.circuits_at(id, CircuitType::Open, None)
            .into_iter()
            .filter(|&c| {
                self.circuits.get(c).is_some_and(|circuit| {
                    circuit.source() == Some(id)
                        && circuit.end() == Some(id)
                        && circuit.is_different_pole_start_end()
                })
            })
            .collect()
    }

    // ── Hooks ──────────────────────────────────────────────────────

    pub(crate) fn remote_after_touch(&mut self, touch: &Touch) {
        match touch.phase {
            Phase::Added => self.remote_added(touch),
            Phase::Removed => {
                if let Some(b) = self.bridge_mut(touch.node) {
                    b.inside_remove = true;
                }
                self.remote_removed(touch);
                if let Some(b) = self.bridge_mut(touch.node) {
                    b.inside_remove = false;
                }
            }
            Phase::PartiallyRemoved => {
                let Some(mode) = self.bridge(touch.node).map(RemoteBridge::mode) else {
                    return;
                };
                let has_closed = self
                    .nodes
                    .get(touch.node)
                    .is_some_and(|n| n.accounting().has_circuits(CircuitType::Closed));
                if matches!(mode, RemoteMode::ReceiveWaitClosed | RemoteMode::ReceiveClosed)
                    && !has_closed
                    && self.fake_loops(touch.node).is_empty()
                {
                    self.set_remote_mode(touch.node, RemoteMode::ReceiveOpen);
                }
            }
        }
    }

    fn remote_added(&mut self, touch: &Touch) {
        let id = touch.node;
        let after = self.bridge_contact(id);
        let Some(b) = self.bridge_mut(id) else {
            return;
        };
        b.state_dirty = false;
        let before = touch.before.contact(0);
        let mode = b.mode;

        if before != after {
            match (before, after, mode) {
                (AnyCircuitType::None, AnyCircuitType::Open, RemoteMode::None) => {
                    b.send_pole = touch.entry_pole.unwrap_or(CircuitPole::First);
                    self.set_remote_mode(id, RemoteMode::SendOpen);
                }
                (AnyCircuitType::Open, AnyCircuitType::Closed, RemoteMode::SendWaitClosed) => {
                    self.set_remote_mode(id, RemoteMode::SendClosed);
                }
                (AnyCircuitType::Open, AnyCircuitType::Closed, RemoteMode::ReceiveWaitClosed) => {
                    self.set_remote_mode(id, RemoteMode::ReceiveClosed);
                }
                _ => {}
            }
        }

        let receiving = self.bridge(id).map(RemoteBridge::mode) == Some(RemoteMode::ReceiveOpen);
        if receiving && !self.fake_loops(id).is_empty() {
            self.set_remote_mode(id, RemoteMode::ReceiveWaitClosed);
        }
    }

    fn remote_removed(&mut self, touch: &Touch) {
        let id = touch.node;
        let after = self.bridge_contact(id);
        let before = touch.before.contact(0);
        let Some(mode) = self.bridge(id).map(RemoteBridge::mode) else {
            return;
        };
        if before == after {
            return;
        }

        if after == AnyCircuitType::None {
            if before == AnyCircuitType::Closed {
                match mode {
                    RemoteMode::SendClosed => {
                        self.set_remote_mode(id, RemoteMode::SendWaitClosed)
                    }
                    RemoteMode::ReceiveClosed => {
                        self.set_remote_mode(id, RemoteMode::ReceiveOpen)
                    }
                    _ => {}
                }
                self.schedule_remote_refresh(id);
            } else {
                self.set_remote_mode(id, RemoteMode::None);
            }
            return;
        }

        if let Some(b) = self.bridge_mut(id) {
            b.state_dirty = false;
        }
        if mode == RemoteMode::SendClosed
            && before == AnyCircuitType::Closed
            && after == AnyCircuitType::Open
        {
            self.set_remote_mode(id, RemoteMode::SendWaitClosed);
        } else if matches!(mode, RemoteMode::ReceiveWaitClosed | RemoteMode::ReceiveClosed)
            && after == AnyCircuitType::Open
            && self.fake_loops(id).is_empty()
        {
            self.set_remote_mode(id, RemoteMode::ReceiveOpen);
        }
    }

    // ── Mode transitions ───────────────────────────────────────────

    /// Move a bridge to `new` (or the closest mode it admits), adjusting
    /// its circuits and notifying the peer.
    pub(crate) fn set_remote_mode(&mut self, id: NodeId, new: RemoteMode) {
        let Some(b) = self.bridge_mut(id) else {
            return;
        };
        let new = b.admissible(new);
        let old = b.mode;
        if new == old {
            return;
        }
        b.mode = new;
        let inside_remove = b.inside_remove;
        let recv_pole = b.recv_pole;

        if new == RemoteMode::None || (new == RemoteMode::SendOpen && old != RemoteMode::None) {
            if inside_remove {
                self.schedule_remote_refresh(id);
            } else {
                self.cut_circuits_at(id, None);
                self.default_reach(id);
            }
        }

        match (old, new) {
            (RemoteMode::SendOpen, RemoteMode::SendWaitClosed | RemoteMode::SendClosed) => {
                self.create_from_other(id);
            }
            (RemoteMode::None, RemoteMode::ReceiveOpen) => {
                self.seed(id, recv_pole, 0, CircuitFlags::NONE);
            }
            (RemoteMode::ReceiveClosed, RemoteMode::ReceiveWaitClosed) => {
                for closed in self.circuits_at(id, CircuitType::Closed, None) {
                    self.morph(closed);
                }
                self.disable_closed_at(id, None);
            }
            (RemoteMode::ReceiveWaitClosed, RemoteMode::ReceiveClosed) => {
                let fakes = self.fake_loops(id);
                for &fake in &fakes {
                    self.morph(fake);
                }
                let mut truncated = Vec::new();
                for fake in fakes {
                    self.terminate_here(fake, id, &mut truncated);
                }
            }
            _ => {}
        }

        // A nested transition may already have moved on.
        let Some(b) = self.bridge(id) else {
            return;
        };
        if b.mode != new {
            return;
        }
        let (peer, send_pole) = (b.peer, b.send_pole);
        debug!(node = %id, ?old, ?new, "remote bridge mode changed");
        self.outbox
            .push(NetworkEvent::RemoteModeChanged { node: id, mode: new });
        if let Some(peer) = peer {
            self.scheduler.schedule(
                self.config.remote_latency_ms,
                Task::RemotePeerMode {
                    node: peer,
                    mode: new,
                    pole: send_pole,
                },
            );
        }
    }

    /// Register a copy of `id` with the opposite type.
    fn morph(&mut self, id: CircuitId) {
        let Some(circuit) = self.circuits.get(id) else {
            return;
        };
        if !circuit.is_enabled() {
            return;
        }
        let copy = self.circuits.insert(circuit.clone_to_opposite_type());
        self.enable_circuit(copy);
    }

    /// React to the peer entering `mode`.
    pub(crate) fn remote_peer_mode(&mut self, id: NodeId, mode: RemoteMode, pole: CircuitPole) {
        let Some(b) = self.bridge_mut(id) else {
            return;
        };
        b.recv_pole = pole;
        b.last_peer_mode = mode;
        let own = b.mode;

        let next = match mode {
            RemoteMode::None if own.is_receive() => Some(RemoteMode::None),
            RemoteMode::None if own.is_send() => Some(RemoteMode::SendOpen),
            RemoteMode::None => None,
            RemoteMode::SendOpen if own.is_send() => Some(RemoteMode::None),
            RemoteMode::SendOpen
                if matches!(own, RemoteMode::None | RemoteMode::ReceiveClosed) =>
            {
                Some(RemoteMode::ReceiveOpen)
            }
            RemoteMode::SendOpen => None,
            RemoteMode::SendWaitClosed if own == RemoteMode::ReceiveClosed => {
                Some(RemoteMode::ReceiveWaitClosed)
            }
            RemoteMode::SendWaitClosed if own != RemoteMode::ReceiveWaitClosed => {
                Some(RemoteMode::None)
            }
            RemoteMode::SendWaitClosed => None,
            RemoteMode::SendClosed
                if matches!(own, RemoteMode::ReceiveWaitClosed | RemoteMode::ReceiveClosed) =>
            {
                Some(RemoteMode::ReceiveClosed)
            }
            RemoteMode::SendClosed => Some(RemoteMode::None),
            RemoteMode::ReceiveOpen if own.is_send() => Some(RemoteMode::SendOpen),
            RemoteMode::ReceiveOpen => Some(RemoteMode::None),
            RemoteMode::ReceiveWaitClosed if own.is_send() => Some(RemoteMode::SendWaitClosed),
            RemoteMode::ReceiveWaitClosed => Some(RemoteMode::None),
            RemoteMode::ReceiveClosed if own != RemoteMode::SendClosed => Some(RemoteMode::None),
            RemoteMode::ReceiveClosed => None,
        };
        if let Some(next) = next {
            self.set_remote_mode(id, next);
        }
    }

    // ── Deferred refresh ───────────────────────────────────────────

    fn schedule_remote_refresh(&mut self, id: NodeId) {
        let Some(b) = self.bridge_mut(id) else {
            return;
        };
        if b.state_dirty {
            return;
        }
        b.state_dirty = true;
        self.scheduler.schedule(0, Task::RemoteRefresh { node: id });
    }

    pub(crate) fn remote_refresh(&mut self, id: NodeId) {
        if !self.bridge(id).is_some_and(|b| b.state_dirty) {
            return;
        }
        if self.bridge_contact(id) == AnyCircuitType::None {
            self.set_remote_mode(id, RemoteMode::None);
        }
        if self
            .bridge(id)
            .is_some_and(|b| matches!(b.mode, RemoteMode::None | RemoteMode::SendOpen))
        {
            self.cut_circuits_at(id, None);
            self.default_reach(id);
        }
        if let Some(b) = self.bridge_mut(id) {
            b.state_dirty = false;
        }
    }

    /// Enable or disable a bridge end.
    pub(crate) fn set_remote_enabled(&mut self, id: NodeId, enabled: bool) -> bool {
        let Some(b) = self.bridge_mut(id) else {
            return false;
        };
        if b.enabled == enabled {
            return false;
        }
        b.enabled = enabled;
        let (peer_mode, recv_pole) = (b.last_peer_mode, b.recv_pole);

        if !enabled {
            self.set_remote_mode(id, RemoteMode::None);
        } else if self.bridge_contact(id) == AnyCircuitType::Open {
            self.set_remote_mode(id, RemoteMode::SendOpen);
        } else if peer_mode.is_send() {
            self.remote_peer_mode(id, peer_mode, recv_pole);
        }
        true
    }
}
