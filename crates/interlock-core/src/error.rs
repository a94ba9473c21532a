//! Error types for topology construction.
//!
//! Only caller mistakes surface as errors. Broken internal invariants
//! (counter underflow, double registration) are assertions: a corrupted
//! contact count would silently desynchronize every later query.

use crate::id::{CableId, NodeId, RelayId};
use crate::types::{CableSide, CircuitPole};

/// Errors from building or editing the node/cable graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// The node id is stale or was never issued.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// The cable id is stale or was never issued.
    #[error("unknown cable {0}")]
    UnknownCable(CableId),
    /// The relay id is stale or was never issued.
    #[error("unknown relay {0}")]
    UnknownRelay(RelayId),
    /// Contact index past the node's contact list.
    #[error("contact {contact} out of range (node has {count} contacts)")]
    ContactOutOfRange {
        /// Requested contact.
        contact: usize,
        /// Contacts on the node.
        count: usize,
    },
    /// The contact is already wired to another cable.
    #[error("contact {contact} is wired to a different cable")]
    ContactOccupied {
        /// Contact index.
        contact: usize,
    },
    /// The pole slot is already in use.
    #[error("pole {pole:?} of contact {contact} is already connected")]
    PoleAlreadyConnected {
        /// Contact index.
        contact: usize,
        /// Pole.
        pole: CircuitPole,
    },
    /// The pole slot is not wired to the given cable.
    #[error("pole {pole:?} of contact {contact} is not connected to that cable")]
    PoleNotConnected {
        /// Contact index.
        contact: usize,
        /// Pole.
        pole: CircuitPole,
    },
    /// The cable side already ends on a different node or contact.
    #[error("side {side:?} of {cable} is attached elsewhere")]
    CableSideOccupied {
        /// Cable.
        cable: CableId,
        /// Side.
        side: CableSide,
    },
    /// Edits that would strand live circuits are refused.
    #[error("node {0} still carries circuits")]
    NodeEnergized(NodeId),
    /// Edits that would strand live circuits are refused.
    #[error("cable {0} still carries circuits")]
    CableEnergized(CableId),
    /// Relay names key coil and contact links, so they must be unique.
    #[error("a relay named {name:?} already exists")]
    RelayNameTaken {
        /// Requested name.
        name: String,
    },
    /// The operation does not apply to this node's variant.
    #[error("node {node} is not a {expected}")]
    WrongNodeKind {
        /// Node addressed.
        node: NodeId,
        /// Variant the operation needs.
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let e = TopologyError::ContactOutOfRange {
            contact: 5,
            count: 2,
        };
        assert_eq!(e.to_string(), "contact 5 out of range (node has 2 contacts)");

        let e = TopologyError::PoleAlreadyConnected {
            contact: 1,
            pole: CircuitPole::Second,
        };
        assert!(e.to_string().contains("Second"));
    }
}
