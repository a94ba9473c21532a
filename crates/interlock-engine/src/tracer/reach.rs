//! Backward search from unpowered contacts.
//!
//! When a node stops conducting, contacts it used to feed may still be
//! reachable from elsewhere. The search walks upstream from such a contact
//! (asking nodes for their connections in reverse) until it meets a node
//! that already carries current, then splices the walked path onto the
//! circuits found there.

use tracing::debug;

use interlock_core::{
    contains_terminal, AnyCircuitType, CableItem, CircuitFlags, CircuitPole, CircuitType,
    Connection, Item, NodeId, NodeItem, Terminal,
};

use super::Hop;
use crate::network::Network;

impl Network {
    /// Try to feed every unpowered contact and pole of `goal` from
    /// neighbouring live circuits.
    pub(crate) fn default_reach(&mut self, goal: NodeId) {
        let Some(count) = self.nodes.get(goal).map(|n| n.accounting().contact_count()) else {
            return;
        };
        for contact in 0..count {
            for pole in CircuitPole::ALL {
                let unpowered = self.nodes.get(goal).is_some_and(|n| {
                    n.accounting().any_circuit_on_pole(contact, pole) == AnyCircuitType::None
                });
                if unpowered {
                    self.try_reach_next(goal, contact, pole);
                }
            }
        }
    }

    /// Search upstream from `contact` of `goal` on `pole`.
    pub(crate) fn try_reach_next(&mut self, goal: NodeId, contact: usize, pole: CircuitPole) {
        let Hop::Reach { cable, far } = self.resolve_hop(goal, &Connection::plain(contact, pole))
        else {
            return;
        };
        let goal_item = NodeItem {
            node: goal,
            from_contact: Some(contact),
            from_pole: pole,
            to_contact: None,
            to_pole: pole,
            flags: CircuitFlags::NONE,
        };
        let mut items = vec![
            Item::Node(goal_item),
            Item::Cable(CableItem {
                side: !cable.side,
                ..cable
            }),
        ];
        self.search(far.node, far.contact, &mut items, 0);
    }

    /// One upstream step: the walk reached `node` at `contact` over the
    /// cable at the end of `items`. Items are stored in reverse order.
    fn search(&mut self, node: NodeId, contact: usize, items: &mut Vec<Item>, depth: usize) {
        if depth > self.config.max_trace_depth {
            self.stats.depth_cap_hits += 1;
            debug!(%node, depth, "search depth cap reached");
            return;
        }
        let Some(Item::Cable(last)) = items.last().copied() else {
            return;
        };
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let acc = n.accounting();
        if acc.any_entrance_on_pole(contact, last.pole) == AnyCircuitType::Closed {
            return;
        }
        if acc.has_any_circuits() {
            self.extend_existing(node, contact, items);
            return;
        }

        let connections = n.connections(Terminal::new(contact, last.pole), true);
        let base = items.len();
        for conn in connections {
            let Hop::Reach { cable, far } = self.resolve_hop(node, &conn) else {
                continue;
            };
            if far.node == node && far.contact == contact {
                continue;
            }
            if contains_terminal(items, node, contact, last.pole) {
                continue;
            }
            items.push(Item::Node(NodeItem {
                node,
                from_contact: Some(conn.to.contact),
                from_pole: conn.to.pole,
                to_contact: Some(contact),
                to_pole: last.pole,
                flags: conn.flags,
            }));
            items.push(Item::Cable(CableItem {
                side: !cable.side,
                ..cable
            }));
            self.search(far.node, far.contact, items, depth + 1);
            items.truncate(base);
        }
    }

    /// Join the reversed walk in `items` onto every live circuit through
    /// `node` that can route current out of `contact`.
    fn extend_existing(&mut self, node: NodeId, contact: usize, items: &[Item]) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if n.is_source(Some(contact)) {
            return;
        }
        let Some(Item::Cable(last)) = items.last().copied() else {
            return;
        };

        let mut candidates = self.circuits_at(node, CircuitType::Closed, None);
        candidates.extend(self.circuits_at(node, CircuitType::Open, None));

        let mut joined = 0usize;
        for other in candidates {
            let Some(circuit) = self.circuits.get(other) else {
                continue;
            };
            if !circuit.is_enabled() {
                continue;
            }
            let other_items = circuit.items().to_vec();
            for (i, item) in other_items.iter().enumerate().skip(1) {
                let Item::Node(occurrence) = *item else {
                    continue;
                };
                if occurrence.node != node {
                    continue;
                }
                let (Some(from_contact), Some(Item::Cable(before))) =
                    (occurrence.from_contact, other_items.get(i - 1).copied())
                else {
                    continue;
                };
                let connections = self.nodes[node]
                    .connections(Terminal::new(from_contact, before.pole), false);
                for conn in connections {
                    if conn.to != Terminal::new(contact, last.pole) {
                        continue;
                    }
                    let mut path = Vec::with_capacity(i + 1 + items.len());
                    path.extend_from_slice(&other_items[..i]);
                    path.push(Item::Node(NodeItem {
                        to_contact: Some(contact),
                        to_pole: last.pole,
                        flags: conn.flags,
                        ..occurrence
                    }));
                    path.extend(items.iter().rev().copied());
                    if self.register_circuit(CircuitType::Open, path).is_some() {
                        joined += 1;
                    }
                }
            }
        }
        if joined > 0 {
            debug!(%node, contact, joined, "extended live circuits backwards");
        }
    }
}
