//! A node's single wiring point and its per-pole circuit counters.

use crate::id::CableId;
use crate::types::{AnyCircuitType, CableSide, CircuitPole, CircuitType, ContactType};

/// One contact of a node.
///
/// Tracks the attached cable, the two pole slots and four counter pairs:
/// {closed, open} × {entrance, exit}, each per pole. A contact with no
/// cable reports both slots as [`ContactType::NotConnected`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contact {
    cable: Option<(CableId, CableSide)>,
    slots: [ContactType; 2],
    // [circuit type][pole]
    entrance: [[u16; 2]; 2],
    exit: [[u16; 2]; 2],
}

impl Contact {
    /// Attached cable, if any.
    pub fn cable(&self) -> Option<CableId> {
        self.cable.map(|(c, _)| c)
    }

    /// Attached cable and the side of it that ends here.
    pub fn wire(&self) -> Option<(CableId, CableSide)> {
        self.cable
    }

    /// Attached cable, only if `pole` is wired through it.
    pub fn wire_for(&self, pole: CircuitPole) -> Option<(CableId, CableSide)> {
        self.cable.filter(|_| self.slots[pole.index()].is_wired())
    }

    /// Slot state for `pole`.
    pub fn contact_type(&self, pole: CircuitPole) -> ContactType {
        if self.cable.is_none() {
            return ContactType::NotConnected;
        }
        self.slots[pole.index()]
    }

    /// Circuits of `circuit_type` entering through `pole`.
    pub fn entrance_count(&self, circuit_type: CircuitType, pole: CircuitPole) -> u16 {
        self.entrance[circuit_type.index()][pole.index()]
    }

    /// Circuits of `circuit_type` leaving through `pole`.
    pub fn exit_count(&self, circuit_type: CircuitType, pole: CircuitPole) -> u16 {
        self.exit[circuit_type.index()][pole.index()]
    }

    /// Whether any circuit of `circuit_type` enters on `pole`.
    pub fn has_entrance_on_pole(&self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        self.entrance_count(circuit_type, pole) > 0
    }

    /// Whether any circuit of `circuit_type` leaves on `pole`.
    pub fn has_exit_on_pole(&self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        self.exit_count(circuit_type, pole) > 0
    }

    /// Whether any circuit of `circuit_type` touches `pole`.
    pub fn has_circuit_on_pole(&self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        self.has_entrance_on_pole(circuit_type, pole) || self.has_exit_on_pole(circuit_type, pole)
    }

    /// Whether any circuit of `circuit_type` touches either pole.
    pub fn has_circuit(&self, circuit_type: CircuitType) -> bool {
        CircuitPole::ALL
            .iter()
            .any(|&p| self.has_circuit_on_pole(circuit_type, p))
    }

    /// Strongest circuit type touching `pole`.
    pub fn any_on_pole(&self, pole: CircuitPole) -> AnyCircuitType {
        Self::strongest(|t| self.has_circuit_on_pole(t, pole))
    }

    /// Strongest circuit type touching the contact.
    pub fn any(&self) -> AnyCircuitType {
        Self::strongest(|t| self.has_circuit(t))
    }

    /// Strongest circuit type entering on `pole`.
    pub fn any_entrance_on_pole(&self, pole: CircuitPole) -> AnyCircuitType {
        Self::strongest(|t| self.has_entrance_on_pole(t, pole))
    }

    /// Strongest circuit type leaving on `pole`.
    pub fn any_exit_on_pole(&self, pole: CircuitPole) -> AnyCircuitType {
        Self::strongest(|t| self.has_exit_on_pole(t, pole))
    }

    fn strongest(present: impl Fn(CircuitType) -> bool) -> AnyCircuitType {
        if present(CircuitType::Closed) {
            AnyCircuitType::Closed
        } else if present(CircuitType::Open) {
            AnyCircuitType::Open
        } else {
            AnyCircuitType::None
        }
    }

    // ── Mutation (accounting only) ──────────────────────────────

    /// Returns `true` on a 0→1 transition.
    pub(crate) fn inc_entrance(&mut self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        let c = &mut self.entrance[circuit_type.index()][pole.index()];
        *c += 1;
        *c == 1
    }

    /// Returns `true` on a 0→1 transition.
    pub(crate) fn inc_exit(&mut self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        let c = &mut self.exit[circuit_type.index()][pole.index()];
        *c += 1;
        *c == 1
    }

    /// Returns `true` on a 1→0 transition. Panics on underflow.
    pub(crate) fn dec_entrance(&mut self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        let c = &mut self.entrance[circuit_type.index()][pole.index()];
        assert!(*c > 0, "entrance counter underflow ({circuit_type}, {pole:?})");
        *c -= 1;
        *c == 0
    }

    /// Returns `true` on a 1→0 transition. Panics on underflow.
    pub(crate) fn dec_exit(&mut self, circuit_type: CircuitType, pole: CircuitPole) -> bool {
        let c = &mut self.exit[circuit_type.index()][pole.index()];
        assert!(*c > 0, "exit counter underflow ({circuit_type}, {pole:?})");
        *c -= 1;
        *c == 0
    }

    pub(crate) fn set_wire(&mut self, wire: Option<(CableId, CableSide)>) {
        self.cable = wire;
        if wire.is_none() {
            self.slots = [ContactType::NotConnected; 2];
        }
    }

    pub(crate) fn set_slot(&mut self, pole: CircuitPole, t: ContactType) {
        self.slots[pole.index()] = t;
    }

    pub(crate) fn raw_slot(&self, pole: CircuitPole) -> ContactType {
        self.slots[pole.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_contact_is_idle() {
        let c = Contact::default();
        assert_eq!(c.cable(), None);
        assert_eq!(c.contact_type(CircuitPole::First), ContactType::NotConnected);
        assert_eq!(c.any(), AnyCircuitType::None);
    }

    #[test]
    fn closed_dominates_open_in_queries() {
        let mut c = Contact::default();
        assert!(c.inc_exit(CircuitType::Open, CircuitPole::First));
        assert_eq!(c.any_on_pole(CircuitPole::First), AnyCircuitType::Open);
        assert!(c.inc_entrance(CircuitType::Closed, CircuitPole::First));
        assert_eq!(c.any_on_pole(CircuitPole::First), AnyCircuitType::Closed);
        assert_eq!(c.any_exit_on_pole(CircuitPole::First), AnyCircuitType::Open);
        assert_eq!(c.any_entrance_on_pole(CircuitPole::Second), AnyCircuitType::None);
    }

    #[test]
    fn transitions_are_reported_once() {
        let mut c = Contact::default();
        assert!(c.inc_entrance(CircuitType::Closed, CircuitPole::Second));
        assert!(!c.inc_entrance(CircuitType::Closed, CircuitPole::Second));
        assert!(!c.dec_entrance(CircuitType::Closed, CircuitPole::Second));
        assert!(c.dec_entrance(CircuitType::Closed, CircuitPole::Second));
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn underflow_is_fatal() {
        let mut c = Contact::default();
        c.dec_exit(CircuitType::Open, CircuitPole::First);
    }
}
