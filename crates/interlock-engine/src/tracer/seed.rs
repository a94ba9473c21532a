//! Forward discovery from a power source.

use tracing::{debug, trace};

use interlock_core::{
    AnyCircuitType, CircuitFlags, CircuitPole, CircuitType, Connection, Item, NodeId, NodeItem,
    Terminal,
};

use super::{Hop, PassMode, PassResult};
use crate::network::Network;

impl Network {
    /// Discover every circuit fed by `source` through `contact`, starting on
    /// `pole`. Every passage of the first hop carries `flags`.
    pub(crate) fn seed(
        &mut self,
        source: NodeId,
        pole: CircuitPole,
        contact: usize,
        flags: CircuitFlags,
    ) {
        let first = NodeItem {
            node: source,
            from_contact: None,
            from_pole: pole,
            to_contact: Some(contact),
            to_pole: pole,
            flags,
        };
        let mut items = vec![Item::Node(first)];

        match self.resolve_hop(source, &Connection::plain(contact, pole)) {
            Hop::Blocked | Hop::Dangling => {
                self.register_circuit(CircuitType::Open, items);
            }
            Hop::Loose(cable) => {
                items.push(Item::Cable(cable));
                self.register_circuit(CircuitType::Open, items);
            }
            Hop::Reach { cable, far } => {
                items.push(Item::Cable(cable));
                let result = self.pass(far.node, far.contact, &mut items, 1, PassMode::NONE);
                debug!(
                    %source,
                    open = result.open,
                    closed = result.closed,
                    "source seeded"
                );
            }
        }

        for id in self.circuits_at(source, CircuitType::Closed, None) {
            self.check_reverse_voltage_siblings(id);
        }
    }

    /// One step of the forward walk: current entered `node` through
    /// `contact`, over the cable at the end of `items`.
    ///
    /// `items` is restored to its length on entry before returning.
    pub(crate) fn pass(
        &mut self,
        node: NodeId,
        contact: usize,
        items: &mut Vec<Item>,
        depth: usize,
        mode: PassMode,
    ) -> PassResult {
        let mut result = PassResult::default();
        if depth > self.config.max_trace_depth {
            self.stats.depth_cap_hits += 1;
            debug!(%node, depth, "trace depth cap reached");
            return result;
        }
        let (Some(Item::Node(first)), Some(Item::Cable(last))) =
            (items.first().copied(), items.last().copied())
        else {
            return result;
        };
        let Some(n) = self.nodes.get(node) else {
            return result;
        };

        let mut node_item = NodeItem {
            node,
            from_contact: Some(contact),
            from_pole: last.pole,
            to_contact: None,
            to_pole: last.pole,
            flags: CircuitFlags::NONE,
        };

        if node == first.node {
            if Some(contact) == first.to_contact
                && last.pole == !first.to_pole
                && !mode.contains(PassMode::REVERSE_VOLTAGE_PASSED)
            {
                let circuit_type = if n.closes_circuits() {
                    CircuitType::Closed
                } else {
                    CircuitType::Open
                };
                self.register_circuit(circuit_type, extended(items, node_item, None));
                result.closed = 1;
            }
            return result;
        }

        if n.is_source(Some(contact)) {
            self.stats.foreign_source_rejections += 1;
            trace!(%node, contact, "reached a foreign source");
            return result;
        }

        let connections = n.connections(Terminal::new(contact, last.pole), false);
        let base = items.len();
        let mut ends_here = true;

        for conn in connections {
            node_item.to_contact = Some(conn.to.contact);
            node_item.to_pole = conn.to.pole;
            node_item.flags = conn.flags;

            let (cable, far) = match self.resolve_hop(node, &conn) {
                Hop::Blocked => continue,
                hop @ (Hop::Dangling | Hop::Loose(_)) => {
                    let energized = self.nodes[node]
                        .accounting()
                        .any_exit_on_pole(conn.to.contact, conn.to.pole)
                        != AnyCircuitType::None;
                    if energized || mode.contains(PassMode::REVERSE_VOLTAGE_PASSED) {
                        continue;
                    }
                    let cable = match hop {
                        Hop::Loose(cable) => Some(cable),
                        _ => None,
                    };
                    self.register_circuit(CircuitType::Open, extended(items, node_item, cable));
                    ends_here = false;
                    result.open += 1;
                    continue;
                }
                Hop::Reach { cable, far } => (cable, far),
            };

            // A reachable far end is never a dead end, even when skipped.
            ends_here = false;
            if far.node == node && far.contact == contact {
                continue;
            }
            if interlock_core::contains_terminal(items, node, contact, last.pole) {
                continue;
            }

            let mut next_mode = mode;
            if self.is_load(far.node) {
                if mode.contains(PassMode::SKIP_LOADS) {
                    continue;
                }
                next_mode = next_mode | PassMode::LOAD_PASSED;
            }

            let against_closed = self.nodes.get(far.node).is_some_and(|f| {
                f.accounting().any_exit_on_pole(far.contact, cable.pole) == AnyCircuitType::Closed
            });
            if against_closed {
                // Current cannot flow into a higher potential.
                next_mode = next_mode | PassMode::REVERSE_VOLTAGE_PASSED;
                self.stats.reverse_voltage_skips += 1;
                trace!(%node, far = %far.node, ?next_mode, "branch runs against a closed circuit");
                continue;
            }

            items.push(Item::Node(node_item));
            items.push(Item::Cable(cable));
            let branch = items.len();

            let mut sub = PassResult::default();
            if next_mode.contains(PassMode::LOAD_PASSED) {
                sub = self.pass(
                    far.node,
                    far.contact,
                    items,
                    depth + 1,
                    next_mode | PassMode::SKIP_LOADS,
                );
            }
            if sub.closed == 0 && !next_mode.contains(PassMode::SKIP_LOADS) {
                items.truncate(branch);
                sub += self.pass(far.node, far.contact, items, depth + 1, next_mode);
            }
            items.truncate(base);
            result += sub;
        }

        if ends_here {
            if depth > 0 && !mode.contains(PassMode::REVERSE_VOLTAGE_PASSED) {
                node_item.to_contact = None;
                node_item.to_pole = last.pole;
                node_item.flags = CircuitFlags::NONE;
                self.register_circuit(CircuitType::Open, extended(items, node_item, None));
            }
            // The terminal circuit replaces its parent; it is not counted.
            return PassResult::default();
        }
        result
    }
}

/// `items` followed by a passage and optionally a cable.
pub(crate) fn extended(
    items: &[Item],
    node_item: NodeItem,
    cable: Option<interlock_core::CableItem>,
) -> Vec<Item> {
    let mut out = Vec::with_capacity(items.len() + 2);
    out.extend_from_slice(items);
    out.push(Item::Node(node_item));
    out.extend(cable.map(Item::Cable));
    out
}
