//! Node variants and their switching contract.
//!
//! A [`Node`] couples the per-contact circuit bookkeeping
//! ([`NodeAccounting`]) with a [`NodeKind`]: the closed set of electrical
//! components the tracer knows about. Each variant implements
//! [`Switching`], which answers the only question the tracer asks of a
//! component: "current arrives here, where may it go next?".
//!
//! Variants hold their own state (switch position, coil timers, remote
//! bridge mode), but never touch circuits themselves. Reactions to circuit
//! changes live in the network's hook dispatch, which has access to the
//! whole graph.

pub mod activation;
pub mod basic;
pub mod deviator;
pub mod lever;
pub mod relay_coil;
pub mod remote;
pub mod source;
pub mod transformer;

use smallvec::SmallVec;

use interlock_core::{Connection, Contact, NodeAccounting, Terminal};

pub use activation::{Activation, ActivationKind};
pub use basic::{Bifilarizator, Diode, Junction, OnOffSwitch, PolarityInversion, Resistor};
pub use deviator::{ButtonState, ContactPosition, Deviator, DeviatorDriver};
pub use lever::{sanitize_conditions, LeverCondition, LeverRange};
pub use relay_coil::RelayCoil;
pub use remote::{RemoteBridge, RemoteMode};
pub use source::PowerSource;
pub use transformer::Transformer;

/// Destinations reachable from one terminal. Three covers every variant
/// except a fully enabled junction.
pub type Connections = SmallVec<[Connection; 3]>;

// ── Switching ──────────────────────────────────────────────────────

/// Per-variant switching contract.
///
/// `connections` is called with a terminal already bounds-checked against
/// [`contact_count`](Switching::contact_count). `invert` is set when the
/// tracer walks backward from an unpowered contact looking for current;
/// only direction-sensitive parts (diodes, coils) care.
pub trait Switching {
    /// Number of contacts the variant exposes.
    fn contact_count(&self) -> usize;

    /// Where current arriving at `from` may leave.
    fn connections(&self, contacts: &[Contact], from: Terminal, invert: bool) -> Connections;

    /// Whether passing current through this part consumes it.
    fn is_load(&self) -> bool {
        false
    }

    /// Whether the part currently acts as a power source on `contact`.
    /// `None` asks about the part as a whole.
    fn is_source(&self, _contact: Option<usize>) -> bool {
        false
    }

    /// Whether a loop returning to this source counts as closed.
    fn closes_circuits(&self) -> bool {
        true
    }
}

// ── NodeKind ───────────────────────────────────────────────────────

/// The closed set of component variants.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Battery or feeder.
    PowerSource(PowerSource),
    /// Four-way star point.
    Junction(Junction),
    /// Two-position manual switch.
    OnOffSwitch(OnOffSwitch),
    /// One-way valve.
    Diode(Diode),
    /// Series resistor.
    Resistor(Resistor),
    /// Pole swap.
    PolarityInversion(PolarityInversion),
    /// Lamp, sounder or electromagnet.
    Activation(Activation),
    /// Unifilar-to-bifilar adapter.
    Bifilarizator(Bifilarizator),
    /// Relay coil.
    RelayCoil(RelayCoil),
    /// Three-way contact (relay contact, lever contact, button).
    Deviator(Deviator),
    /// Coded-current transformer.
    Transformer(Transformer),
    /// One end of a paired remote bridge.
    RemoteBridge(RemoteBridge),
}

impl NodeKind {
    /// The variant's switching contract.
    pub fn switching(&self) -> &dyn Switching {
        match self {
            NodeKind::PowerSource(n) => n,
            NodeKind::Junction(n) => n,
            NodeKind::OnOffSwitch(n) => n,
            NodeKind::Diode(n) => n,
            NodeKind::Resistor(n) => n,
            NodeKind::PolarityInversion(n) => n,
            NodeKind::Activation(n) => n,
            NodeKind::Bifilarizator(n) => n,
            NodeKind::RelayCoil(n) => n,
            NodeKind::Deviator(n) => n,
            NodeKind::Transformer(n) => n,
            NodeKind::RemoteBridge(n) => n,
        }
    }

    /// Short lowercase variant name, used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::PowerSource(_) => "power source",
            NodeKind::Junction(_) => "junction",
            NodeKind::OnOffSwitch(_) => "on/off switch",
            NodeKind::Diode(_) => "diode",
            NodeKind::Resistor(_) => "resistor",
            NodeKind::PolarityInversion(_) => "polarity inversion",
            NodeKind::Activation(_) => "activation",
            NodeKind::Bifilarizator(_) => "bifilarizator",
            NodeKind::RelayCoil(_) => "relay coil",
            NodeKind::Deviator(_) => "deviator",
            NodeKind::Transformer(_) => "transformer",
            NodeKind::RemoteBridge(_) => "remote bridge",
        }
    }
}

// ── Node ───────────────────────────────────────────────────────────

/// A component placed in the network.
#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    accounting: NodeAccounting,
}

impl Node {
    /// A fresh node with no cables and no circuits.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let accounting = NodeAccounting::new(kind.switching().contact_count());
        Self {
            name: name.into(),
            kind,
            accounting,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant and its state.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Contacts, cables and circuit counters.
    pub fn accounting(&self) -> &NodeAccounting {
        &self.accounting
    }

    pub(crate) fn accounting_mut(&mut self) -> &mut NodeAccounting {
        &mut self.accounting
    }

    /// Where current arriving at `from` may go. Out-of-range contacts
    /// connect nowhere.
    pub fn connections(&self, from: Terminal, invert: bool) -> Connections {
        let switching = self.kind.switching();
        if from.contact >= switching.contact_count() {
            return Connections::new();
        }
        switching.connections(self.accounting.contacts(), from, invert)
    }

    /// See [`Switching::is_load`].
    pub fn is_load(&self) -> bool {
        self.kind.switching().is_load()
    }

    /// See [`Switching::is_source`].
    pub fn is_source(&self, contact: Option<usize>) -> bool {
        self.kind.switching().is_source(contact)
    }

    /// See [`Switching::closes_circuits`].
    pub fn closes_circuits(&self) -> bool {
        self.kind.switching().closes_circuits()
    }
}

/// The other contact of a two-contact part.
pub(crate) fn other_of_two(contact: usize) -> usize {
    if contact == 0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interlock_core::CircuitPole;

    #[test]
    fn node_sizes_accounting_from_variant() {
        let node = Node::new("J1", NodeKind::Junction(Junction::default()));
        assert_eq!(node.accounting().contact_count(), 4);
        assert_eq!(node.name(), "J1");
        assert_eq!(node.kind().name(), "junction");
    }

    #[test]
    fn out_of_range_contact_connects_nowhere() {
        let node = Node::new("R", NodeKind::Resistor(Resistor));
        assert!(node
            .connections(Terminal::new(7, CircuitPole::First), false)
            .is_empty());
    }

    #[test]
    fn load_classification() {
        let lamp = Node::new("L", NodeKind::Activation(Activation::default()));
        let diode = Node::new("D", NodeKind::Diode(Diode::default()));
        assert!(lamp.is_load());
        assert!(!diode.is_load());
    }
}
