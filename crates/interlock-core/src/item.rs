//! Path elements: node passages, cable passages and switching results.

use crate::flags::CircuitFlags;
use crate::id::{CableId, NodeId};
use crate::types::{CableSide, CircuitPole};

/// One contact of one node, on one pole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Terminal {
    /// Contact index on the node.
    pub contact: usize,
    /// Pole on that contact.
    pub pole: CircuitPole,
}

impl Terminal {
    /// Shorthand constructor.
    pub const fn new(contact: usize, pole: CircuitPole) -> Self {
        Self { contact, pole }
    }
}

/// Where current may go next, as answered by a node's switching contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Destination contact and pole.
    pub to: Terminal,
    /// Flags this passage adds to the circuit.
    pub flags: CircuitFlags,
}

impl Connection {
    /// A connection without flags.
    pub const fn plain(contact: usize, pole: CircuitPole) -> Self {
        Self {
            to: Terminal::new(contact, pole),
            flags: CircuitFlags::NONE,
        }
    }

    /// A connection tagged with `flags`.
    pub const fn flagged(contact: usize, pole: CircuitPole, flags: CircuitFlags) -> Self {
        Self {
            to: Terminal::new(contact, pole),
            flags,
        }
    }
}

/// The node and contact at one end of a cable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CableEnd {
    /// Node the cable side is attached to.
    pub node: NodeId,
    /// Contact index on that node.
    pub contact: usize,
}

/// A circuit passing through a node.
///
/// `from_contact` is `None` on the source item (current starts there);
/// `to_contact` is `None` on the last item of an open circuit.
#[derive(Clone, Copy, Debug, Eq)]
pub struct NodeItem {
    /// Node passed.
    pub node: NodeId,
    /// Entrance contact.
    pub from_contact: Option<usize>,
    /// Entrance pole.
    pub from_pole: CircuitPole,
    /// Exit contact.
    pub to_contact: Option<usize>,
    /// Exit pole.
    pub to_pole: CircuitPole,
    /// Flags contributed by this passage.
    pub flags: CircuitFlags,
}

impl NodeItem {
    /// Entrance terminal, if any.
    pub fn entrance(&self) -> Option<Terminal> {
        self.from_contact.map(|c| Terminal::new(c, self.from_pole))
    }

    /// Exit terminal, if any.
    pub fn exit(&self) -> Option<Terminal> {
        self.to_contact.map(|c| Terminal::new(c, self.to_pole))
    }

    /// Whether this passage enters or leaves through `contact` on `pole`.
    pub fn touches(&self, contact: usize, pole: CircuitPole) -> bool {
        (self.from_contact == Some(contact) && self.from_pole == pole)
            || (self.to_contact == Some(contact) && self.to_pole == pole)
    }
}

// Flags follow from the passage itself, so they take no part in path identity.
impl PartialEq for NodeItem {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
            && self.from_contact == other.from_contact
            && self.from_pole == other.from_pole
            && self.to_contact == other.to_contact
            && self.to_pole == other.to_pole
    }
}

/// A circuit passing along a cable, leaving from `side` on `pole`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CableItem {
    /// Cable passed.
    pub cable: CableId,
    /// Side current enters the cable from.
    pub side: CableSide,
    /// Pole used.
    pub pole: CircuitPole,
}

/// One element of a circuit path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
    /// Passage through a node.
    Node(NodeItem),
    /// Passage along a cable.
    Cable(CableItem),
}

impl Item {
    /// The node passage, if this is one.
    pub fn as_node(&self) -> Option<&NodeItem> {
        match self {
            Item::Node(n) => Some(n),
            Item::Cable(_) => None,
        }
    }

    /// The cable passage, if this is one.
    pub fn as_cable(&self) -> Option<&CableItem> {
        match self {
            Item::Cable(c) => Some(c),
            Item::Node(_) => None,
        }
    }
}

/// Whether `items` already enters or leaves `node` through `contact` on `pole`.
///
/// Used to reject paths that would loop through the same terminal twice.
pub fn contains_terminal(items: &[Item], node: NodeId, contact: usize, pole: CircuitPole) -> bool {
    items.iter().any(|item| match item {
        Item::Node(n) => n.node == node && n.touches(contact, pole),
        Item::Cable(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids() -> (NodeId, NodeId, CableId) {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let mut cables: SlotMap<CableId, ()> = SlotMap::with_key();
        (nodes.insert(()), nodes.insert(()), cables.insert(()))
    }

    fn passage(node: NodeId, from: Option<usize>, to: Option<usize>) -> NodeItem {
        NodeItem {
            node,
            from_contact: from,
            from_pole: CircuitPole::First,
            to_contact: to,
            to_pole: CircuitPole::First,
            flags: CircuitFlags::NONE,
        }
    }

    #[test]
    fn node_item_equality_ignores_flags() {
        let (a, _, _) = ids();
        let plain = passage(a, Some(0), Some(1));
        let flagged = NodeItem {
            flags: CircuitFlags::RESISTOR,
            ..plain
        };
        assert_eq!(plain, flagged);
        assert_ne!(plain, passage(a, Some(0), None));
    }

    #[test]
    fn contains_terminal_checks_both_ends() {
        let (a, b, c) = ids();
        let items = vec![
            Item::Node(passage(a, None, Some(0))),
            Item::Cable(CableItem {
                cable: c,
                side: CableSide::A,
                pole: CircuitPole::First,
            }),
            Item::Node(passage(b, Some(0), Some(1))),
        ];
        assert!(contains_terminal(&items, a, 0, CircuitPole::First));
        assert!(contains_terminal(&items, b, 1, CircuitPole::First));
        assert!(!contains_terminal(&items, b, 1, CircuitPole::Second));
        assert!(!contains_terminal(&items, b, 2, CircuitPole::First));
    }
}
