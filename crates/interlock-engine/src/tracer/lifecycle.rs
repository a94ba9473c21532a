//! Single-circuit lifecycle.
//!
//! A circuit is created disabled, then [`enable_circuit`] registers it on
//! every node and cable it crosses. From there it either stays, is
//! disabled (a closed circuit falling back to the open prefix that still
//! reaches a node), or is truncated after a node that stopped conducting.
//! Node hooks always run after the bookkeeping of the whole circuit is
//! done, never in the middle of it.
//!
//! [`enable_circuit`]: Network::enable_circuit

use smallvec::SmallVec;
use tracing::{debug, trace};

use interlock_core::{
    CableId, Circuit, CircuitId, CircuitPole, CircuitType, Item, NodeId, NodeItem, NodeOccurrences,
};

use crate::events::NetworkEvent;
use crate::network::hooks::{NodeSnapshot, Phase, Touch};
use crate::network::Network;

impl Network {
    // ── Registration ───────────────────────────────────────────────

    /// Create a circuit from `items` and enable it. `None` if it was
    /// discarded as a duplicate.
    pub(crate) fn register_circuit(
        &mut self,
        circuit_type: CircuitType,
        items: Vec<Item>,
    ) -> Option<CircuitId> {
        let id = self.circuits.insert(Circuit::new(circuit_type, items));
        self.enable_circuit(id).then_some(id)
    }

    /// Register a disabled circuit on its nodes and cables.
    ///
    /// A circuit identical to one its source already carries is deleted
    /// instead; returns `false` in that case.
    pub(crate) fn enable_circuit(&mut self, id: CircuitId) -> bool {
        let Some(circuit) = self.circuits.get(id) else {
            return false;
        };
        assert!(!circuit.is_enabled(), "{id} enabled twice");
        let circuit_type = circuit.circuit_type();
        let Some(source) = circuit.source() else {
            self.circuits.remove(id);
            return false;
        };

        let duplicate = self.nodes.get(source).is_some_and(|n| {
            n.accounting().circuits(circuit_type).iter().any(|&other| {
                other != id
                    && self
                        .circuits
                        .get(other)
                        .is_some_and(|o| o.items() == circuit.items())
            })
        });
        if duplicate {
            self.circuits.remove(id);
            self.stats.duplicates_discarded += 1;
            debug!(%source, %circuit_type, "duplicate circuit discarded");
            return false;
        }

        let items = circuit.items().to_vec();
        let flags = circuit.flags();
        let mut touches: Vec<Touch> = Vec::new();
        let mut cables_done: SmallVec<[(CableId, CircuitPole); 8]> = SmallVec::new();

        for item in &items {
            match *item {
                Item::Node(n) => {
                    if touches.iter().any(|t| t.node == n.node) {
                        continue;
                    }
                    let entry_pole = self.entry_pole_of(id, n.node);
                    let Some(node) = self.nodes.get_mut(n.node) else {
                        continue;
                    };
                    let before = NodeSnapshot::of(node.accounting());
                    let changed = node
                        .accounting_mut()
                        .add_circuit(id, &self.circuits[id], n.node);
                    touches.push(Touch::new(
                        n.node,
                        circuit_type,
                        Phase::Added,
                        before,
                        changed,
                        entry_pole,
                    ));
                }
                Item::Cable(c) => {
                    if cables_done.contains(&(c.cable, c.pole)) {
                        continue;
                    }
                    cables_done.push((c.cable, c.pole));
                    if let Some(cable) = self.cables.get_mut(c.cable) {
                        if cable.add_circuit(id, circuit_type, flags, c.pole) {
                            let power = cable.power();
                            self.outbox.push(NetworkEvent::CablePowerChanged {
                                cable: c.cable,
                                power,
                            });
                        }
                    }
                }
            }
        }

        self.circuits[id].set_enabled(true);
        self.stats.circuits_created += 1;
        trace!(%id, %source, %circuit_type, len = items.len(), "circuit enabled");
        self.run_hooks(touches);
        true
    }

    /// Remove an enabled circuit from every node and cable. Returns the
    /// hooks to run.
    fn unregister_everywhere(&mut self, id: CircuitId) -> Vec<Touch> {
        let circuit = &self.circuits[id];
        let circuit_type = circuit.circuit_type();
        let items = circuit.items().to_vec();
        let mut touches: Vec<Touch> = Vec::new();
        let mut cables_done: SmallVec<[CableId; 8]> = SmallVec::new();

        for item in &items {
            match *item {
                Item::Node(n) => {
                    if touches.iter().any(|t| t.node == n.node) {
                        continue;
                    }
                    let entry_pole = self.entry_pole_of(id, n.node);
                    let occurrences = self.circuits[id].occurrences(n.node);
                    let Some(node) = self.nodes.get_mut(n.node) else {
                        continue;
                    };
                    let before = NodeSnapshot::of(node.accounting());
                    let changed = node
                        .accounting_mut()
                        .remove_circuit(id, circuit_type, &occurrences);
                    touches.push(Touch::new(
                        n.node,
                        circuit_type,
                        Phase::Removed,
                        before,
                        changed,
                        entry_pole,
                    ));
                }
                Item::Cable(c) => {
                    if cables_done.contains(&c.cable) {
                        continue;
                    }
                    cables_done.push(c.cable);
                    self.remove_from_cable(id, circuit_type, c.cable);
                }
            }
        }
        touches
    }

    fn remove_from_cable(&mut self, id: CircuitId, circuit_type: CircuitType, cable_id: CableId) {
        if let Some(cable) = self.cables.get_mut(cable_id) {
            if cable.remove_circuit(id, circuit_type) {
                let power = cable.power();
                self.outbox.push(NetworkEvent::CablePowerChanged {
                    cable: cable_id,
                    power,
                });
            }
        }
    }

    fn remove_from_cable_pole(
        &mut self,
        id: CircuitId,
        circuit_type: CircuitType,
        cable_id: CableId,
        pole: CircuitPole,
    ) {
        if let Some(cable) = self.cables.get_mut(cable_id) {
            if cable.remove_circuit_on_pole(id, circuit_type, pole) {
                let power = cable.power();
                self.outbox.push(NetworkEvent::CablePowerChanged {
                    cable: cable_id,
                    power,
                });
            }
        }
    }

    /// Delete an unregistered circuit.
    pub(crate) fn destroy_circuit(&mut self, id: CircuitId) {
        if self.circuits.remove(id).is_some() {
            self.stats.circuits_destroyed += 1;
            trace!(%id, "circuit destroyed");
        }
    }

    // ── Disable ────────────────────────────────────────────────────

    /// Unregister a closed circuit, then keep its prefix up to `node` as an
    /// open circuit if that prefix still conducts. Otherwise delete it.
    pub(crate) fn disable_or_terminate(&mut self, id: CircuitId, node: NodeId) {
        let Some(circuit) = self.circuits.get_mut(id) else {
            return;
        };
        if circuit.circuit_type() != CircuitType::Closed
            || !circuit.is_enabled()
            || circuit.is_disabling()
        {
            return;
        }
        circuit.set_disabling(true);
        let touches = self.unregister_everywhere(id);
        let circuit = &mut self.circuits[id];
        circuit.set_disabling(false);
        circuit.set_enabled(false);
        trace!(%id, %node, "closed circuit disabled");
        self.run_hooks(touches);

        if !self.try_reach_open(id, node) {
            self.destroy_circuit(id);
        }
    }

    /// Turn a disabled circuit into an open one ending at `goal`, provided
    /// every node before `goal` still connects the way the path says.
    ///
    /// Returns `true` if the circuit was taken over (re-enabled, or
    /// discarded as a duplicate of an existing one).
    pub(crate) fn try_reach_open(&mut self, id: CircuitId, goal: NodeId) -> bool {
        let Some(circuit) = self.circuits.get_mut(id) else {
            return false;
        };
        circuit.set_circuit_type(CircuitType::Open);
        if circuit.is_empty() || circuit.source() == Some(goal) {
            return false;
        }
        let items = circuit.items().to_vec();

        let mut goal_index = None;
        for (i, item) in items.iter().enumerate().skip(1) {
            match item {
                Item::Node(n) if n.node == goal => {
                    goal_index = Some(i);
                    break;
                }
                Item::Node(n) => {
                    let Some(from) = n.entrance() else {
                        return false;
                    };
                    let Some(node) = self.nodes.get(n.node) else {
                        return false;
                    };
                    let still_connected = node.connections(from, false).iter().any(|conn| {
                        Some(conn.to.contact) == n.to_contact && conn.to.pole == n.to_pole
                    });
                    if !still_connected {
                        return false;
                    }
                }
                Item::Cable(c) => {
                    if !self.cables.contains_key(c.cable) {
                        return false;
                    }
                }
            }
        }
        let Some(goal_index) = goal_index else {
            return false;
        };

        let circuit = &mut self.circuits[id];
        circuit.truncate(goal_index + 1);
        circuit.clear_last_exit();
        trace!(%id, %goal, "closed circuit reduced to open");
        self.enable_circuit(id);
        true
    }

    // ── Truncate ───────────────────────────────────────────────────

    /// Cut an open circuit right after its first passage through `goal`.
    ///
    /// Everything past that passage is unregistered; nodes the kept prefix
    /// still uses only lose the removed passages, and cables only lose the
    /// poles the prefix no longer runs on. When `goal`
    /// is the source, or the shortened circuit would equal one already
    /// truncated in this batch (listed in `truncated`), the whole circuit
    /// is deleted instead.
    pub(crate) fn terminate_here(
        &mut self,
        id: CircuitId,
        goal: NodeId,
        truncated: &mut Vec<CircuitId>,
    ) {
        let Some(circuit) = self.circuits.get(id) else {
            return;
        };
        if circuit.circuit_type() != CircuitType::Open || !circuit.is_enabled() {
            return;
        }
        let items = circuit.items().to_vec();
        let source = circuit.source();

        let mut keep_nodes: SmallVec<[NodeId; 8]> = SmallVec::new();
        let mut keep_cables: SmallVec<[(CableId, CircuitPole); 8]> = SmallVec::new();
        let mut goal_index = None;
        for (i, item) in items.iter().enumerate() {
            match item {
                Item::Node(n) => {
                    keep_nodes.push(n.node);
                    if n.node == goal {
                        goal_index = Some(i);
                        break;
                    }
                }
                Item::Cable(c) => keep_cables.push((c.cable, c.pole)),
            }
        }
        let Some(goal_index) = goal_index else {
            return;
        };

        let mut first = if goal_index > 0 { goal_index + 1 } else { 0 };
        if first > 0
            && truncated
                .iter()
                .any(|&other| self.is_truncated_twin(other, source, &items, goal_index))
        {
            first = 0;
        }
        if first == 0 {
            keep_nodes.clear();
            keep_cables.clear();
        }

        let mut partial: SmallVec<[(NodeId, NodeOccurrences); 4]> = SmallVec::new();
        let mut full: SmallVec<[NodeId; 8]> = SmallVec::new();
        let mut cables: SmallVec<[(CableId, CircuitPole); 8]> = SmallVec::new();
        for item in &items[first..] {
            match *item {
                Item::Node(n) if keep_nodes.contains(&n.node) => {
                    match partial.iter_mut().find(|(node, _)| *node == n.node) {
                        Some((_, occ)) => occ.push(n),
                        None => partial.push((n.node, NodeOccurrences::from_slice(&[n]))),
                    }
                }
                Item::Node(n) => {
                    if !full.contains(&n.node) {
                        full.push(n.node);
                    }
                }
                Item::Cable(c) => {
                    let slot = (c.cable, c.pole);
                    if !keep_cables.contains(&slot) && !cables.contains(&slot) {
                        cables.push(slot);
                    }
                }
            }
        }

        let mut touches: Vec<Touch> = Vec::with_capacity(partial.len() + full.len());
        for (node_id, occurrences) in &partial {
            let entry_pole = self.entry_pole_of(id, *node_id);
            let Some(node) = self.nodes.get_mut(*node_id) else {
                continue;
            };
            let before = NodeSnapshot::of(node.accounting());
            let changed =
                node.accounting_mut()
                    .partial_remove_circuit(id, CircuitType::Open, occurrences);
            touches.push(Touch::new(
                *node_id,
                CircuitType::Open,
                Phase::PartiallyRemoved,
                before,
                changed,
                entry_pole,
            ));
        }
        for node_id in full {
            let entry_pole = self.entry_pole_of(id, node_id);
            let occurrences = self.circuits[id].occurrences(node_id);
            let Some(node) = self.nodes.get_mut(node_id) else {
                continue;
            };
            let before = NodeSnapshot::of(node.accounting());
            let changed = node
                .accounting_mut()
                .remove_circuit(id, CircuitType::Open, &occurrences);
            touches.push(Touch::new(
                node_id,
                CircuitType::Open,
                Phase::Removed,
                before,
                changed,
                entry_pole,
            ));
        }
        for (cable, pole) in cables {
            self.remove_from_cable_pole(id, CircuitType::Open, cable, pole);
        }

        let circuit = &mut self.circuits[id];
        circuit.truncate(first);
        if circuit.is_empty() {
            circuit.set_enabled(false);
            trace!(%id, %goal, "open circuit removed");
            self.destroy_circuit(id);
        } else {
            if let Item::Node(last) = items[goal_index] {
                let changed = self
                    .nodes
                    .get_mut(goal)
                    .is_some_and(|n| n.accounting_mut().unregister_open_exit(id, &last));
                if changed {
                    self.outbox
                        .push(NetworkEvent::NodeCircuitsChanged { node: goal });
                }
            }
            self.circuits[id].clear_last_exit();
            truncated.push(id);
            trace!(%id, %goal, len = first, "open circuit truncated");
        }
        self.run_hooks(touches);
    }

    /// Whether `other`, an already truncated circuit, equals `items` cut at
    /// `goal_index` (ignoring the exit of the last passage).
    fn is_truncated_twin(
        &self,
        other: CircuitId,
        source: Option<NodeId>,
        items: &[Item],
        goal_index: usize,
    ) -> bool {
        let Some(twin) = self.circuits.get(other) else {
            return false;
        };
        if twin.source() != source || twin.len() != goal_index + 1 {
            return false;
        }
        twin.items()
            .iter()
            .zip(&items[..=goal_index])
            .enumerate()
            .all(|(i, (a, b))| {
                a == b
                    || (i == goal_index
                        && matches!((a, b), (Item::Node(a), Item::Node(b))
                            if a.to_contact.is_none()
                                && *a == NodeItem { to_contact: None, ..*b }))
            })
    }

    // ── Bulk helpers ───────────────────────────────────────────────

    /// Whether `circuit` passes `node` through `contact`. A passage that
    /// merely ends at `contact` does not count.
    fn passes_contact(circuit: &Circuit, node: NodeId, contact: usize) -> bool {
        circuit.occurrences(node).iter().any(|n| {
            if n.from_contact == Some(contact) && n.to_contact.is_none() {
                return false;
            }
            n.from_contact == Some(contact) || n.to_contact == Some(contact)
        })
    }

    pub(crate) fn circuits_at(
        &self,
        node: NodeId,
        circuit_type: CircuitType,
        contact: Option<usize>,
    ) -> Vec<CircuitId> {
        let Some(n) = self.nodes.get(node) else {
            return Vec::new();
        };
        n.accounting()
            .circuits(circuit_type)
            .iter()
            .copied()
            .filter(|&id| match contact {
                None => true,
                Some(c) => self
                    .circuits
                    .get(id)
                    .is_some_and(|circuit| Self::passes_contact(circuit, node, c)),
            })
            .collect()
    }

    /// Disable every closed circuit through `node` (or through one of its
    /// contacts), keeping their prefixes as open circuits where possible.
    pub(crate) fn disable_closed_at(&mut self, node: NodeId, contact: Option<usize>) {
        for id in self.circuits_at(node, CircuitType::Closed, contact) {
            self.disable_or_terminate(id, node);
        }
    }

    /// Truncate every open circuit through `node` (or through one of its
    /// contacts) right after `node`.
    pub(crate) fn truncate_open_at(&mut self, node: NodeId, contact: Option<usize>) {
        let mut truncated = Vec::new();
        for id in self.circuits_at(node, CircuitType::Open, contact) {
            self.terminate_here(id, node, &mut truncated);
        }
    }

    /// Drop every circuit at `node` that depends on it conducting.
    pub(crate) fn cut_circuits_at(&mut self, node: NodeId, contact: Option<usize>) {
        self.disable_closed_at(node, contact);
        self.truncate_open_at(node, contact);
    }
}
