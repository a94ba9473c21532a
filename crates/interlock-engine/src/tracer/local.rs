//! Local re-discovery around a node whose switching changed.
//!
//! Instead of re-seeding every source, open circuits already passing the
//! node try each newly available exit and continue from there with the
//! forward walk. Afterwards the closed circuits through the node, whose
//! direction of current is now known, clear out open circuits running the
//! opposite way.

use tracing::trace;

use interlock_core::{AnyCircuitType, CircuitType, CircuitId, Item, NodeId, NodeItem, Terminal};

use super::seed::extended;
use super::{Hop, PassMode};
use crate::network::Network;

impl Network {
    /// Extend the open circuits through `node` along connections it did
    /// not offer before.
    pub(crate) fn create_from_other(&mut self, node: NodeId) {
        for orig in self.circuits_at(node, CircuitType::Open, None) {
            let Some(circuit) = self.circuits.get(orig) else {
                continue;
            };
            if !circuit.is_enabled() || circuit.circuit_type() != CircuitType::Open {
                continue;
            }
            let items = circuit.items().to_vec();
            let last_index = items.len() - 1;
            let mut remove_original = false;
            let mut load_passed = false;

            for (i, item) in items.iter().enumerate() {
                let Item::Node(occurrence) = *item else {
                    continue;
                };
                load_passed |= self.is_load(occurrence.node);
                if occurrence.node != node {
                    continue;
                }
                if i == 0 {
                    break;
                }
                let (Some(from_contact), Some(Item::Cable(last_cable))) =
                    (occurrence.from_contact, items.get(i - 1).copied())
                else {
                    continue;
                };
                let Some(n) = self.nodes.get(node) else {
                    break;
                };
                let connections = n.connections(Terminal::new(from_contact, last_cable.pole), false);

                let mut ends_here = true;
                for conn in connections {
                    if Some(conn.to.contact) == occurrence.to_contact {
                        continue;
                    }
                    let prefix = &items[..i];
                    let node_item = NodeItem {
                        to_contact: Some(conn.to.contact),
                        to_pole: conn.to.pole,
                        ..occurrence
                    };

                    let (cable, far) = match self.resolve_hop(node, &conn) {
                        Hop::Blocked => continue,
                        hop @ (Hop::Dangling | Hop::Loose(_)) => {
                            let energized = self.nodes[node]
                                .accounting()
                                .any_exit_on_pole(conn.to.contact, conn.to.pole)
                                != AnyCircuitType::None;
                            if energized {
                                continue;
                            }
                            let cable = match hop {
                                Hop::Loose(cable) => Some(cable),
                                _ => None,
                            };
                            self.register_circuit(
                                CircuitType::Open,
                                extended(prefix, node_item, cable),
                            );
                            ends_here = false;
                            continue;
                        }
                        Hop::Reach { cable, far } => (cable, far),
                    };

                    ends_here = false;
                    if far.node == node && far.contact == from_contact {
                        continue;
                    }
                    if interlock_core::contains_terminal(prefix, node, from_contact, last_cable.pole)
                    {
                        continue;
                    }

                    let mut path = extended(prefix, node_item, Some(cable));
                    let mode = if load_passed || self.is_load(far.node) {
                        PassMode::LOAD_PASSED
                    } else {
                        PassMode::NONE
                    };
                    self.pass(far.node, far.contact, &mut path, 1, mode);
                }

                if i == last_index && !ends_here {
                    remove_original = true;
                }
            }

            if remove_original {
                if let Some(source) = self.circuits.get(orig).and_then(|c| c.source()) {
                    trace!(%orig, %node, "open circuit superseded");
                    self.terminate_here(orig, source, &mut Vec::new());
                }
            }
        }

        for id in self.circuits_at(node, CircuitType::Closed, None) {
            self.check_reverse_voltage_siblings(id);
        }
    }

    /// Remove open circuits that cross the closed circuit `id` against its
    /// direction of current.
    pub(crate) fn check_reverse_voltage_siblings(&mut self, id: CircuitId) {
        let Some(circuit) = self.circuits.get(id) else {
            return;
        };
        if circuit.circuit_type() != CircuitType::Closed || !circuit.is_enabled() {
            return;
        }
        let items = circuit.items().to_vec();

        for item in items.iter().filter_map(Item::as_node) {
            let Some(n) = self.nodes.get(item.node) else {
                continue;
            };
            let acc = n.accounting();
            let against_entrance = item
                .from_contact
                .is_some_and(|c| acc.has_exit_on_pole(c, item.from_pole, CircuitType::Open));
            let against_exit = item
                .to_contact
                .is_some_and(|c| acc.has_entrance_on_pole(c, item.to_pole, CircuitType::Open));
            if !against_entrance && !against_exit {
                continue;
            }

            for open in self.circuits_at(item.node, CircuitType::Open, None) {
                let Some(open_circuit) = self.circuits.get(open) else {
                    continue;
                };
                if !open_circuit.is_enabled() {
                    continue;
                }
                let opposite = open_circuit.occurrences(item.node).iter().any(|o| {
                    (o.from_contact.is_some()
                        && o.from_contact == item.to_contact
                        && o.from_pole == item.to_pole)
                        || (o.to_contact.is_some()
                            && o.to_contact == item.from_contact
                            && o.to_pole == item.from_pole)
                });
                if !opposite {
                    continue;
                }
                if let Some(source) = open_circuit.source() {
                    trace!(closed = %id, %open, node = %item.node, "removing reverse open circuit");
                    self.terminate_here(open, source, &mut Vec::new());
                }
            }
        }
    }
}
