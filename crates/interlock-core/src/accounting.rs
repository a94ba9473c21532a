//! Per-node circuit registration and contact counters.
//!
//! [`NodeAccounting`] is the part of a node that every variant shares: the
//! contact list, the node-level circuit lists and the reference counts
//! behind every "is this contact powered" query. Variants never touch the
//! counters directly; the engine registers and unregisters circuits here
//! and reacts to the transitions reported back.

use smallvec::SmallVec;

use crate::circuit::Circuit;
use crate::contact::Contact;
use crate::error::TopologyError;
use crate::id::{CableId, CircuitId, NodeId};
use crate::item::NodeItem;
use crate::types::{AnyCircuitType, CableSide, CircuitPole, CircuitType, ContactType};

/// Contacts, circuit lists and counters of one node.
#[derive(Clone, Debug, Default)]
pub struct NodeAccounting {
    contacts: SmallVec<[Contact; 4]>,
    // [circuit type]
    circuits: [Vec<CircuitId>; 2],
    flagged: Vec<CircuitId>,
}

impl NodeAccounting {
    /// Accounting for a node with `contact_count` unwired contacts.
    pub fn new(contact_count: usize) -> Self {
        Self {
            contacts: (0..contact_count).map(|_| Contact::default()).collect(),
            circuits: [Vec::new(), Vec::new()],
            flagged: Vec::new(),
        }
    }

    // ── Contacts ────────────────────────────────────────────────

    /// Number of contacts.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// All contacts, in index order.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// One contact, if the index is in range.
    pub fn contact(&self, contact: usize) -> Option<&Contact> {
        self.contacts.get(contact)
    }

    fn checked(&self, contact: usize) -> Result<&Contact, TopologyError> {
        self.contacts
            .get(contact)
            .ok_or(TopologyError::ContactOutOfRange {
                contact,
                count: self.contacts.len(),
            })
    }

    // ── Circuit lists ───────────────────────────────────────────

    /// Circuits of `circuit_type` registered here, in registration order.
    pub fn circuits(&self, circuit_type: CircuitType) -> &[CircuitId] {
        &self.circuits[circuit_type.index()]
    }

    /// Whether any circuit of `circuit_type` is registered.
    pub fn has_circuits(&self, circuit_type: CircuitType) -> bool {
        !self.circuits[circuit_type.index()].is_empty()
    }

    /// Whether any circuit at all is registered.
    pub fn has_any_circuits(&self) -> bool {
        CircuitType::ALL.iter().any(|&t| self.has_circuits(t))
    }

    /// Whether `id` is registered in the `circuit_type` list.
    pub fn is_registered(&self, id: CircuitId, circuit_type: CircuitType) -> bool {
        self.circuits[circuit_type.index()].contains(&id)
    }

    /// Whether a registered circuit carries non-empty flags.
    pub fn has_circuits_with_flags(&self) -> bool {
        !self.flagged.is_empty()
    }

    /// Register `circuit` on this node.
    ///
    /// Every passage of the circuit through `node` bumps the matching
    /// entrance/exit counter. Registering a circuit already in the list is a
    /// no-op. Returns `true` when the node's observable state changed: first
    /// circuit of its type, or some counter went 0→1.
    pub fn add_circuit(&mut self, id: CircuitId, circuit: &Circuit, node: NodeId) -> bool {
        let circuit_type = circuit.circuit_type();
        let list = &mut self.circuits[circuit_type.index()];
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        let first_of_type = list.len() == 1;

        let mut changed = false;
        for item in circuit.occurrences(node) {
            if let Some(from) = item.from_contact {
                changed |= self.contacts[from].inc_entrance(circuit_type, item.from_pole);
            }
            if let Some(to) = item.to_contact {
                changed |= self.contacts[to].inc_exit(circuit_type, item.to_pole);
            }
        }

        if !circuit.flags().is_empty() {
            self.flagged.push(id);
        }

        first_of_type || changed
    }

    /// Unregister `id`, undoing the counts of `occurrences`.
    ///
    /// Panics if the circuit is not registered.
    pub fn remove_circuit(
        &mut self,
        id: CircuitId,
        circuit_type: CircuitType,
        occurrences: &[NodeItem],
    ) -> bool {
        let changed = self.partial_remove_circuit(id, circuit_type, occurrences);
        let list = &mut self.circuits[circuit_type.index()];
        if let Some(pos) = list.iter().position(|&c| c == id) {
            list.remove(pos);
        }
        self.flagged.retain(|&c| c != id);
        changed || list.is_empty()
    }

    /// Undo the counts of `occurrences` while keeping `id` registered.
    ///
    /// Used when a circuit is trimmed rather than deleted. Panics if the
    /// circuit is not registered or a counter would go negative.
    pub fn partial_remove_circuit(
        &mut self,
        id: CircuitId,
        circuit_type: CircuitType,
        occurrences: &[NodeItem],
    ) -> bool {
        assert!(
            self.is_registered(id, circuit_type),
            "{id} is not registered as {circuit_type}"
        );
        let mut changed = false;
        for item in occurrences {
            if let Some(from) = item.from_contact {
                changed |= self.contacts[from].dec_entrance(circuit_type, item.from_pole);
            }
            if let Some(to) = item.to_contact {
                changed |= self.contacts[to].dec_exit(circuit_type, item.to_pole);
            }
        }
        changed
    }

    /// Drop the exit count of an open circuit's last passage, which is about
    /// to become its dead end.
    pub fn unregister_open_exit(&mut self, id: CircuitId, last: &NodeItem) -> bool {
        assert!(
            self.is_registered(id, CircuitType::Open),
            "{id} is not a registered open circuit"
        );
        match last.to_contact {
            Some(to) => self.contacts[to].dec_exit(CircuitType::Open, last.to_pole),
            None => false,
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Whether a circuit of `circuit_type` touches `contact`.
    pub fn has_circuit(&self, contact: usize, circuit_type: CircuitType) -> bool {
        self.contact(contact)
            .is_some_and(|c| c.has_circuit(circuit_type))
    }

    /// Strongest circuit type touching `contact`.
    pub fn any_circuit(&self, contact: usize) -> AnyCircuitType {
        self.contact(contact)
            .map_or(AnyCircuitType::None, Contact::any)
    }

    /// Strongest circuit type touching `contact` on `pole`.
    pub fn any_circuit_on_pole(&self, contact: usize, pole: CircuitPole) -> AnyCircuitType {
        self.contact(contact)
            .map_or(AnyCircuitType::None, |c| c.any_on_pole(pole))
    }

    /// Strongest circuit type entering through `contact` on `pole`.
    pub fn any_entrance_on_pole(&self, contact: usize, pole: CircuitPole) -> AnyCircuitType {
        self.contact(contact)
            .map_or(AnyCircuitType::None, |c| c.any_entrance_on_pole(pole))
    }

    /// Strongest circuit type leaving through `contact` on `pole`.
    pub fn any_exit_on_pole(&self, contact: usize, pole: CircuitPole) -> AnyCircuitType {
        self.contact(contact)
            .map_or(AnyCircuitType::None, |c| c.any_exit_on_pole(pole))
    }

    /// Whether a circuit of `circuit_type` enters through `contact` on `pole`.
    pub fn has_entrance_on_pole(
        &self,
        contact: usize,
        pole: CircuitPole,
        circuit_type: CircuitType,
    ) -> bool {
        self.contact(contact)
            .is_some_and(|c| c.has_entrance_on_pole(circuit_type, pole))
    }

    /// Whether a circuit of `circuit_type` leaves through `contact` on `pole`.
    pub fn has_exit_on_pole(
        &self,
        contact: usize,
        pole: CircuitPole,
        circuit_type: CircuitType,
    ) -> bool {
        self.contact(contact)
            .is_some_and(|c| c.has_exit_on_pole(circuit_type, pole))
    }

    // ── Wiring ──────────────────────────────────────────────────

    /// Connect `pole` of `contact` to `side` of `cable`.
    ///
    /// Returns `true` when the contact was free and now references the
    /// cable; the caller must then record the cable end. Adding the second
    /// pole of an already attached cable returns `false`.
    pub fn attach_cable(
        &mut self,
        contact: usize,
        cable: CableId,
        side: CableSide,
        pole: CircuitPole,
    ) -> Result<bool, TopologyError> {
        let c = self.checked(contact)?;
        if let Some(wire) = c.wire() {
            if wire != (cable, side) {
                return Err(TopologyError::ContactOccupied { contact });
            }
            if c.raw_slot(pole).is_wired() {
                return Err(TopologyError::PoleAlreadyConnected { contact, pole });
            }
            self.contacts[contact].set_slot(pole, ContactType::Connected);
            return Ok(false);
        }
        let c = &mut self.contacts[contact];
        c.set_wire(Some((cable, side)));
        c.set_slot(pole, ContactType::Connected);
        Ok(true)
    }

    /// Disconnect `pole` of `contact` from `cable`.
    ///
    /// Returns `true` when the contact released the cable entirely (the
    /// other pole was not `Connected`); the caller must then clear the
    /// cable end.
    pub fn detach_cable(
        &mut self,
        contact: usize,
        cable: CableId,
        pole: CircuitPole,
    ) -> Result<bool, TopologyError> {
        let c = self.checked(contact)?;
        if c.cable() != Some(cable) || !c.raw_slot(pole).is_wired() {
            return Err(TopologyError::PoleNotConnected { contact, pole });
        }
        let c = &mut self.contacts[contact];
        if c.raw_slot(!pole) != ContactType::Connected {
            c.set_wire(None);
            return Ok(true);
        }
        c.set_slot(pole, ContactType::NotConnected);
        Ok(false)
    }

    /// Release whatever cable `contact` holds, both poles at once.
    pub fn detach_all(&mut self, contact: usize) -> Option<(CableId, CableSide)> {
        let c = self.contacts.get_mut(contact)?;
        let wire = c.wire();
        c.set_wire(None);
        wire
    }

    /// Switch a wired pole between `Connected` and `Passthrough`.
    pub fn set_passthrough(
        &mut self,
        contact: usize,
        pole: CircuitPole,
        passthrough: bool,
    ) -> Result<(), TopologyError> {
        let c = self.checked(contact)?;
        if c.cable().is_none() || !c.raw_slot(pole).is_wired() {
            return Err(TopologyError::PoleNotConnected { contact, pole });
        }
        let t = if passthrough {
            ContactType::Passthrough
        } else {
            ContactType::Connected
        };
        self.contacts[contact].set_slot(pole, t);
        Ok(())
    }
}
