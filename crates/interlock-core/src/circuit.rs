//! The circuit entity: an ordered path of node and cable passages.
//!
//! A [`Circuit`] owns nothing outside itself. Registration on nodes and
//! cables, and every lifecycle transition, is driven by the engine's
//! tracer; this type only keeps the path and answers questions about it.

use smallvec::SmallVec;

use crate::flags::CircuitFlags;
use crate::id::NodeId;
use crate::item::{Item, NodeItem};
use crate::types::CircuitType;

/// Every passage of a circuit through one node, in path order.
pub type NodeOccurrences = SmallVec<[NodeItem; 2]>;

/// A discovered current path.
///
/// Invariants upheld by the tracer:
/// - item 0 is a node passage on the source with `from_contact == None`;
/// - node and cable passages alternate;
/// - a closed circuit ends on the source with `from_pole` opposite to the
///   source's exit pole;
/// - an open circuit ends on a node passage with `to_contact == None`,
///   or on a cable whose far end is unwired.
#[derive(Clone, Debug)]
pub struct Circuit {
    circuit_type: CircuitType,
    items: Vec<Item>,
    enabled: bool,
    disabling: bool,
}

impl Circuit {
    /// Create a disabled circuit over `items`.
    pub fn new(circuit_type: CircuitType, items: Vec<Item>) -> Self {
        Self {
            circuit_type,
            items,
            enabled: false,
            disabling: false,
        }
    }

    /// Open or closed.
    pub fn circuit_type(&self) -> CircuitType {
        self.circuit_type
    }

    /// Change the type. Only valid while the circuit is not registered.
    pub fn set_circuit_type(&mut self, circuit_type: CircuitType) {
        assert!(!self.enabled, "cannot retype a registered circuit");
        self.circuit_type = circuit_type;
    }

    /// The path.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items on the path.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the circuit is currently registered on its nodes and cables.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mark as registered or unregistered.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Re-entrancy guard for teardown.
    pub fn is_disabling(&self) -> bool {
        self.disabling
    }

    /// Set the teardown guard.
    pub fn set_disabling(&mut self, disabling: bool) {
        self.disabling = disabling;
    }

    /// Drop every item from `len` on.
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Mark the last node passage as a dead end (`to_contact = None`).
    pub fn clear_last_exit(&mut self) {
        if let Some(Item::Node(n)) = self.items.last_mut() {
            n.to_contact = None;
        }
    }

    /// The power source this circuit starts from.
    pub fn source(&self) -> Option<NodeId> {
        match self.items.first() {
            Some(Item::Node(n)) => Some(n.node),
            _ => None,
        }
    }

    /// The source passage.
    pub fn source_item(&self) -> Option<&NodeItem> {
        self.items.first().and_then(Item::as_node)
    }

    /// The final node, for paths of at least source + cable + node.
    pub fn end(&self) -> Option<NodeId> {
        if self.items.len() < 3 {
            return None;
        }
        match self.items.last() {
            Some(Item::Node(n)) => Some(n.node),
            _ => None,
        }
    }

    /// Whether the last item is a passage through `node`.
    pub fn is_last_node(&self, node: NodeId) -> bool {
        matches!(self.items.last(), Some(Item::Node(n)) if n.node == node)
    }

    /// Whether the path leaves the source on one pole and returns on the other.
    pub fn is_different_pole_start_end(&self) -> bool {
        match (self.items.first(), self.items.last()) {
            (Some(Item::Node(first)), Some(Item::Node(last))) if self.items.len() > 1 => {
                first.to_pole != last.from_pole
            }
            _ => false,
        }
    }

    /// Every passage through `node`, in path order.
    pub fn occurrences(&self, node: NodeId) -> NodeOccurrences {
        self.items
            .iter()
            .filter_map(Item::as_node)
            .filter(|n| n.node == node)
            .copied()
            .collect()
    }

    /// Index of the first passage through `node`.
    pub fn first_index_of(&self, node: NodeId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, Item::Node(n) if n.node == node))
    }

    /// Union of the flags contributed by every passage.
    pub fn flags(&self) -> CircuitFlags {
        self.items
            .iter()
            .filter_map(Item::as_node)
            .fold(CircuitFlags::NONE, |acc, n| acc | n.flags)
    }

    /// A disabled copy with the opposite type.
    pub fn clone_to_opposite_type(&self) -> Circuit {
        Circuit::new(self.circuit_type.opposite(), self.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::CableId;
    use crate::item::CableItem;
    use crate::types::{CableSide, CircuitPole};
    use slotmap::SlotMap;

    fn lamp_loop() -> (Circuit, NodeId, NodeId) {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let mut cables: SlotMap<CableId, ()> = SlotMap::with_key();
        let source = nodes.insert(());
        let lamp = nodes.insert(());
        let cable = cables.insert(());
        let items = vec![
            Item::Node(NodeItem {
                node: source,
                from_contact: None,
                from_pole: CircuitPole::First,
                to_contact: Some(0),
                to_pole: CircuitPole::First,
                flags: CircuitFlags::NONE,
            }),
            Item::Cable(CableItem {
                cable,
                side: CableSide::A,
                pole: CircuitPole::First,
            }),
            Item::Node(NodeItem {
                node: lamp,
                from_contact: Some(0),
                from_pole: CircuitPole::First,
                to_contact: Some(0),
                to_pole: CircuitPole::Second,
                flags: CircuitFlags::CODE_75,
            }),
            Item::Cable(CableItem {
                cable,
                side: CableSide::B,
                pole: CircuitPole::Second,
            }),
            Item::Node(NodeItem {
                node: source,
                from_contact: Some(0),
                from_pole: CircuitPole::Second,
                to_contact: None,
                to_pole: CircuitPole::First,
                flags: CircuitFlags::NONE,
            }),
        ];
        (Circuit::new(CircuitType::Closed, items), source, lamp)
    }

    #[test]
    fn source_end_and_occurrences() {
        let (c, source, lamp) = lamp_loop();
        assert_eq!(c.source(), Some(source));
        assert_eq!(c.end(), Some(source));
        assert!(c.is_last_node(source));
        assert!(!c.is_last_node(lamp));
        assert_eq!(c.occurrences(source).len(), 2);
        assert_eq!(c.occurrences(lamp).len(), 1);
        assert_eq!(c.first_index_of(lamp), Some(2));
        assert!(c.is_different_pole_start_end());
        assert_eq!(c.flags(), CircuitFlags::CODE_75);
    }

    #[test]
    fn clone_to_opposite_type_is_disabled() {
        let (mut c, _, _) = lamp_loop();
        c.set_enabled(true);
        let open = c.clone_to_opposite_type();
        assert_eq!(open.circuit_type(), CircuitType::Open);
        assert!(!open.is_enabled());
        assert_eq!(open.items(), c.items());
    }

    #[test]
    fn truncate_and_clear_exit() {
        let (mut c, _, lamp) = lamp_loop();
        c.truncate(3);
        c.clear_last_exit();
        assert!(c.is_last_node(lamp));
        assert_eq!(c.items()[2].as_node().and_then(|n| n.to_contact), None);
    }

    #[test]
    #[should_panic(expected = "cannot retype")]
    fn retype_while_enabled_panics() {
        let (mut c, _, _) = lamp_loop();
        c.set_enabled(true);
        c.set_circuit_type(CircuitType::Open);
    }
}
