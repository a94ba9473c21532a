//! Circuit discovery and propagation.
//!
//! The tracer walks the node/cable graph and keeps the set of registered
//! circuits consistent with the current switching state. It is split by
//! entry point:
//!
//! - [`lifecycle`]: registering, disabling, converting and truncating a
//!   single circuit.
//! - [`seed`]: full discovery from a power source (forward walk).
//! - [`local`]: re-discovery around one node whose switching gained new
//!   connections, plus the reverse-voltage fix-up.
//! - [`reach`]: backward search from unpowered contacts towards current
//!   that is already flowing.
//!
//! All of it runs as `impl Network` blocks so a walk can register circuits
//! and fire node hooks as it goes. Walks share one `Vec<Item>` path buffer
//! and restore it after every branch.

pub(crate) mod lifecycle;
pub(crate) mod local;
pub(crate) mod reach;
pub(crate) mod seed;

use std::ops::{AddAssign, BitOr};

use interlock_core::{CableEnd, CableItem, Connection, NodeId};

use crate::network::Network;

// ── PassMode ───────────────────────────────────────────────────────

/// Flags carried down a forward walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct PassMode(u8);

impl PassMode {
    pub(crate) const NONE: PassMode = PassMode(0);
    /// A load was crossed since the source.
    pub(crate) const LOAD_PASSED: PassMode = PassMode(0b001);
    /// Do not cross another load on this attempt.
    pub(crate) const SKIP_LOADS: PassMode = PassMode(0b010);
    /// The walk runs against an existing closed circuit.
    pub(crate) const REVERSE_VOLTAGE_PASSED: PassMode = PassMode(0b100);

    pub(crate) const fn contains(self, other: PassMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PassMode {
    type Output = PassMode;

    fn bitor(self, rhs: PassMode) -> PassMode {
        PassMode(self.0 | rhs.0)
    }
}

// ── PassResult ─────────────────────────────────────────────────────

/// How many circuits a walk registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct PassResult {
    pub(crate) open: usize,
    pub(crate) closed: usize,
}

impl AddAssign for PassResult {
    fn add_assign(&mut self, rhs: PassResult) {
        self.open += rhs.open;
        self.closed += rhs.closed;
    }
}

// ── Hop ────────────────────────────────────────────────────────────

/// What lies beyond a connection's destination contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Hop {
    /// A cable is attached but not on this pole: current cannot leave.
    Blocked,
    /// No cable at all.
    Dangling,
    /// A cable whose far end is detached or unwired on this pole.
    Loose(CableItem),
    /// A cable leading to another node's contact.
    Reach { cable: CableItem, far: CableEnd },
}

impl Network {
    /// Resolve where current leaving `node` through `conn` ends up.
    pub(crate) fn resolve_hop(&self, node: NodeId, conn: &Connection) -> Hop {
        let pole = conn.to.pole;
        let Some(contact) = self
            .nodes
            .get(node)
            .and_then(|n| n.accounting().contact(conn.to.contact))
        else {
            return Hop::Dangling;
        };
        let Some((cable_id, side)) = contact.wire() else {
            return Hop::Dangling;
        };
        if !contact.contact_type(pole).is_wired() {
            return Hop::Blocked;
        }
        let cable = CableItem {
            cable: cable_id,
            side,
            pole,
        };
        let Some(far) = self.cables.get(cable_id).and_then(|c| c.end(!side)) else {
            return Hop::Loose(cable);
        };
        let far_wired = self
            .nodes
            .get(far.node)
            .and_then(|n| n.accounting().contact(far.contact))
            .is_some_and(|c| c.contact_type(pole).is_wired());
        if far_wired {
            Hop::Reach { cable, far }
        } else {
            Hop::Loose(cable)
        }
    }

    pub(crate) fn is_load(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.is_load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_mode_flags_combine() {
        let m = PassMode::LOAD_PASSED | PassMode::SKIP_LOADS;
        assert!(m.contains(PassMode::LOAD_PASSED));
        assert!(m.contains(PassMode::SKIP_LOADS));
        assert!(!m.contains(PassMode::REVERSE_VOLTAGE_PASSED));
        assert!(PassMode::NONE.contains(PassMode::NONE));
    }

    #[test]
    fn pass_results_accumulate() {
        let mut r = PassResult { open: 1, closed: 0 };
        r += PassResult { open: 2, closed: 1 };
        assert_eq!(r, PassResult { open: 3, closed: 1 });
    }
}
