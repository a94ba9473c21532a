//! One end of a remote bridge.
//!
//! Two bridge nodes in different parts of a layout behave as if a cable
//! ran between them. The side where current first arrives becomes the
//! sender; its peer becomes a dependent source that re-emits the current
//! on its own side. A loop is only reported closed once both sides have a
//! path back, which takes a short exchange of modes between the peers.
//!
//! This module holds the per-node state. The mode transitions themselves
//! need the tracer and live with the network hooks.

use serde::{Deserialize, Serialize};

use interlock_core::{CircuitPole, Connection, Contact, NodeId, Terminal};

use super::{Connections, Switching};

/// Bridge mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteMode {
    /// Idle.
    #[default]
    None,
    /// Current arrives here and is forwarded to the peer.
    SendOpen,
    /// The peer found a path back; current may now turn around here.
    SendWaitClosed,
    /// Current turns around here and the local loop is closed.
    SendClosed,
    /// Re-emitting the peer's current.
    ReceiveOpen,
    /// A local path back exists, waiting for the sender to close.
    ReceiveWaitClosed,
    /// Both sides closed.
    ReceiveClosed,
}

impl RemoteMode {
    /// Whether this is one of the sending modes.
    pub fn is_send(self) -> bool {
        matches!(
            self,
            RemoteMode::SendOpen | RemoteMode::SendWaitClosed | RemoteMode::SendClosed
        )
    }

    /// Whether this is one of the receiving modes.
    pub fn is_receive(self) -> bool {
        matches!(
            self,
            RemoteMode::ReceiveOpen | RemoteMode::ReceiveWaitClosed | RemoteMode::ReceiveClosed
        )
    }
}

/// Single-contact bridge end.
#[derive(Clone, Debug)]
pub struct RemoteBridge {
    pub(crate) is_node_a: bool,
    pub(crate) peer: Option<NodeId>,
    pub(crate) enabled: bool,
    pub(crate) mode: RemoteMode,
    pub(crate) send_pole: CircuitPole,
    pub(crate) recv_pole: CircuitPole,
    pub(crate) last_peer_mode: RemoteMode,
    pub(crate) state_dirty: bool,
    pub(crate) inside_remove: bool,
}

impl RemoteBridge {
    /// An unpaired, disabled bridge end.
    pub fn new(is_node_a: bool) -> Self {
        Self {
            is_node_a,
            peer: None,
            enabled: false,
            mode: RemoteMode::None,
            send_pole: CircuitPole::First,
            recv_pole: CircuitPole::First,
            last_peer_mode: RemoteMode::None,
            state_dirty: false,
            inside_remove: false,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> RemoteMode {
        self.mode
    }

    /// Paired node, if any.
    pub fn peer(&self) -> Option<NodeId> {
        self.peer
    }

    /// Whether this is the A end of the pair.
    pub fn is_node_a(&self) -> bool {
        self.is_node_a
    }

    /// Whether the bridge may carry current.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last mode the peer reported.
    pub fn last_peer_mode(&self) -> RemoteMode {
        self.last_peer_mode
    }

    /// Pole current arrived on while sending.
    pub fn send_pole(&self) -> CircuitPole {
        self.send_pole
    }

    /// Mode the bridge can actually take, given whether it is enabled.
    pub(crate) fn admissible(&self, mode: RemoteMode) -> RemoteMode {
        if self.enabled {
            return mode;
        }
        match mode {
            m if m.is_receive() => RemoteMode::None,
            RemoteMode::SendWaitClosed | RemoteMode::SendClosed => RemoteMode::SendOpen,
            m => m,
        }
    }
}

impl Default for RemoteBridge {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Switching for RemoteBridge {
    fn contact_count(&self) -> usize {
        1
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        let mut out = Connections::new();
        if from.contact == 0
            && matches!(self.mode, RemoteMode::SendWaitClosed | RemoteMode::SendClosed)
        {
            out.push(Connection::plain(0, !from.pole));
        }
        out
    }

    fn is_load(&self) -> bool {
        true
    }

    fn is_source(&self, contact: Option<usize>) -> bool {
        matches!(contact, None | Some(0)) && self.mode.is_receive()
    }

    fn closes_circuits(&self) -> bool {
        !matches!(
            self.mode,
            RemoteMode::ReceiveOpen | RemoteMode::ReceiveWaitClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_bridge_cannot_receive_or_close() {
        let b = RemoteBridge::new(true);
        assert_eq!(b.admissible(RemoteMode::ReceiveOpen), RemoteMode::None);
        assert_eq!(b.admissible(RemoteMode::SendClosed), RemoteMode::SendOpen);
        assert_eq!(b.admissible(RemoteMode::SendOpen), RemoteMode::SendOpen);
    }

    #[test]
    fn only_closing_send_modes_turn_current_around() {
        let contacts = vec![Contact::default()];
        let from = Terminal::new(0, CircuitPole::First);
        let mut b = RemoteBridge::new(false);
        b.enabled = true;
        assert!(b.connections(&contacts, from, false).is_empty());
        b.mode = RemoteMode::SendWaitClosed;
        let out = b.connections(&contacts, from, false);
        assert_eq!(out[0].to, Terminal::new(0, CircuitPole::Second));
    }

    #[test]
    fn receive_side_is_a_source_that_may_not_close() {
        let mut b = RemoteBridge::new(true);
        b.mode = RemoteMode::ReceiveOpen;
        assert!(b.is_source(Some(0)));
        assert!(!b.closes_circuits());
        b.mode = RemoteMode::ReceiveClosed;
        assert!(b.closes_circuits());
        b.mode = RemoteMode::SendOpen;
        assert!(!b.is_source(None));
    }
}
