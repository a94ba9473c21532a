//! Two-sided, two-pole conductor and its power aggregation.

use crate::flags::CircuitFlags;
use crate::id::CircuitId;
use crate::item::CableEnd;
use crate::types::{CableMode, CablePower, CableSide, CircuitPole, CircuitType};

/// A cable joining one contact on each side.
///
/// Keeps one membership list per (circuit type, pole) slot. Each entry
/// remembers the flags the circuit carried when it joined, so the slot's
/// flags can be recomputed without looking the circuits up again.
#[derive(Clone, Debug, Default)]
pub struct Cable {
    ends: [Option<CableEnd>; 2],
    // [circuit type][pole]
    members: [[Vec<(CircuitId, CircuitFlags)>; 2]; 2],
    flags: [[CircuitFlags; 2]; 2],
    mode: CableMode,
}

impl Cable {
    /// A detached, unpowered cable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Node and contact at `side`, if attached.
    pub fn end(&self, side: CableSide) -> Option<CableEnd> {
        self.ends[side.index()]
    }

    /// Record (or clear) the node and contact at `side`.
    pub fn set_end(&mut self, side: CableSide, end: Option<CableEnd>) {
        self.ends[side.index()] = end;
    }

    /// Drawing mode.
    pub fn mode(&self) -> CableMode {
        self.mode
    }

    /// Change the drawing mode. Tracing ignores it.
    pub fn set_mode(&mut self, mode: CableMode) {
        self.mode = mode;
    }

    /// Circuits in one slot.
    pub fn circuits(
        &self,
        circuit_type: CircuitType,
        pole: CircuitPole,
    ) -> impl Iterator<Item = CircuitId> + '_ {
        self.members[circuit_type.index()][pole.index()]
            .iter()
            .map(|&(id, _)| id)
    }

    /// Whether no circuit is registered in any slot.
    pub fn is_idle(&self) -> bool {
        self.members.iter().flatten().all(Vec::is_empty)
    }

    /// Whether the cable can be destroyed: both ends detached and idle.
    pub fn is_unused(&self) -> bool {
        self.ends.iter().all(Option::is_none) && self.is_idle()
    }

    /// Register a circuit on one pole. Returns `true` if the power changed.
    ///
    /// Panics if the circuit is already in that slot.
    pub fn add_circuit(
        &mut self,
        id: CircuitId,
        circuit_type: CircuitType,
        flags: CircuitFlags,
        pole: CircuitPole,
    ) -> bool {
        let before = self.power();
        let slot = &mut self.members[circuit_type.index()][pole.index()];
        assert!(
            slot.iter().all(|&(c, _)| c != id),
            "{id} registered twice on the same cable pole"
        );
        slot.push((id, flags));
        self.refresh_flags(circuit_type, pole);
        before != self.power()
    }

    /// Unregister a circuit from every pole it uses. Returns `true` if the
    /// power changed.
    ///
    /// Panics if the circuit is on neither pole.
    pub fn remove_circuit(&mut self, id: CircuitId, circuit_type: CircuitType) -> bool {
        let before = self.power();
        let mut found = false;
        for pole in CircuitPole::ALL {
            let slot = &mut self.members[circuit_type.index()][pole.index()];
            if let Some(pos) = slot.iter().position(|&(c, _)| c == id) {
                slot.remove(pos);
                found = true;
                self.refresh_flags(circuit_type, pole);
            }
        }
        assert!(found, "{id} is not registered on this cable");
        before != self.power()
    }

    /// Unregister a circuit from one pole only, leaving its entry on the
    /// other pole in place. Returns `true` if the power changed.
    ///
    /// Panics if the circuit is not on that pole.
    pub fn remove_circuit_on_pole(
        &mut self,
        id: CircuitId,
        circuit_type: CircuitType,
        pole: CircuitPole,
    ) -> bool {
        let before = self.power();
        let slot = &mut self.members[circuit_type.index()][pole.index()];
        let pos = slot.iter().position(|&(c, _)| c == id);
        let Some(pos) = pos else {
            panic!("{id} is not registered on pole {pole:?} of this cable");
        };
        slot.remove(pos);
        self.refresh_flags(circuit_type, pole);
        before != self.power()
    }

    fn refresh_flags(&mut self, circuit_type: CircuitType, pole: CircuitPole) {
        let slot = &self.members[circuit_type.index()][pole.index()];
        let flags = match slot.split_first() {
            None => CircuitFlags::NONE,
            Some((&(_, first), rest)) => rest.iter().fold(first, |acc, &(_, f)| acc & f),
        };
        self.flags[circuit_type.index()][pole.index()] = flags;
    }

    /// Energized poles and dominating circuit type.
    pub fn power(&self) -> CablePower {
        let occupied = |t: CircuitType| {
            CircuitPole::ALL.map(|p| !self.members[t.index()][p.index()].is_empty())
        };
        CablePower::from_occupancy(occupied(CircuitType::Closed), occupied(CircuitType::Open))
    }

    /// Intersected flags of one slot.
    pub fn flags_for(&self, circuit_type: CircuitType, pole: CircuitPole) -> CircuitFlags {
        self.flags[circuit_type.index()][pole.index()]
    }

    /// Flags of the slots that determine [`power()`](Cable::power): the
    /// closed slots when any closed circuit is present, otherwise the open
    /// ones, intersected across the energized poles.
    pub fn flags(&self) -> CircuitFlags {
        let power = self.power();
        let t = power.circuit_type;
        let mut result: Option<CircuitFlags> = None;
        for pole in CircuitPole::ALL {
            if self.members[t.index()][pole.index()].is_empty() {
                continue;
            }
            let f = self.flags_for(t, pole);
            result = Some(result.map_or(f, |acc| acc & f));
        }
        result.unwrap_or(CircuitFlags::NONE)
    }

    /// Whether some registered circuit carries non-empty flags.
    pub fn has_circuits_with_flags(&self) -> bool {
        self.members
            .iter()
            .flatten()
            .flatten()
            .any(|(_, f)| !f.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CablePowerPole;
    use slotmap::SlotMap;

    fn circuit_ids(n: usize) -> Vec<CircuitId> {
        let mut sm: SlotMap<CircuitId, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn power_follows_membership() {
        let ids = circuit_ids(2);
        let mut cable = Cable::new();
        assert_eq!(cable.power(), CablePower::NONE);

        assert!(cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::First));
        assert_eq!(cable.power().poles, CablePowerPole::First);
        assert_eq!(cable.power().circuit_type, CircuitType::Open);

        assert!(cable.add_circuit(ids[1], CircuitType::Closed, CircuitFlags::NONE, CircuitPole::Second));
        assert_eq!(cable.power().poles, CablePowerPole::Second);
        assert!(cable.power().is_closed());

        assert!(cable.remove_circuit(ids[1], CircuitType::Closed));
        assert!(cable.remove_circuit(ids[0], CircuitType::Open));
        assert!(cable.is_idle());
    }

    #[test]
    fn slot_flags_are_intersection() {
        let ids = circuit_ids(3);
        let mut cable = Cable::new();
        let pole = CircuitPole::First;
        cable.add_circuit(ids[0], CircuitType::Closed, CircuitFlags::RESISTOR | CircuitFlags::CODE_75, pole);
        assert_eq!(
            cable.flags_for(CircuitType::Closed, pole),
            CircuitFlags::RESISTOR | CircuitFlags::CODE_75
        );
        cable.add_circuit(ids[1], CircuitType::Closed, CircuitFlags::CODE_75, pole);
        assert_eq!(cable.flags_for(CircuitType::Closed, pole), CircuitFlags::CODE_75);
        cable.add_circuit(ids[2], CircuitType::Closed, CircuitFlags::NONE, pole);
        assert_eq!(cable.flags(), CircuitFlags::NONE);

        cable.remove_circuit(ids[2], CircuitType::Closed);
        cable.remove_circuit(ids[1], CircuitType::Closed);
        assert_eq!(
            cable.flags(),
            CircuitFlags::RESISTOR | CircuitFlags::CODE_75
        );
        assert!(cable.has_circuits_with_flags());
        cable.remove_circuit(ids[0], CircuitType::Closed);
        assert_eq!(cable.flags_for(CircuitType::Closed, pole), CircuitFlags::NONE);
    }

    #[test]
    fn remove_clears_both_poles() {
        let ids = circuit_ids(1);
        let mut cable = Cable::new();
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::First);
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::Second);
        assert_eq!(cable.power().poles, CablePowerPole::Both);
        cable.remove_circuit(ids[0], CircuitType::Open);
        assert!(cable.is_idle());
        assert!(cable.is_unused());
    }

    #[test]
    fn pole_removal_keeps_the_other_pole() {
        let ids = circuit_ids(2);
        let mut cable = Cable::new();
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::First);
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::CODE_75, CircuitPole::Second);
        cable.add_circuit(ids[1], CircuitType::Open, CircuitFlags::CODE_75, CircuitPole::Second);
        assert_eq!(cable.flags_for(CircuitType::Open, CircuitPole::Second), CircuitFlags::CODE_75);

        assert!(!cable.remove_circuit_on_pole(ids[0], CircuitType::Open, CircuitPole::Second));
        assert_eq!(cable.power().poles, CablePowerPole::Both);
        assert_eq!(cable.circuits(CircuitType::Open, CircuitPole::First).count(), 1);

        assert!(cable.remove_circuit_on_pole(ids[1], CircuitType::Open, CircuitPole::Second));
        assert_eq!(cable.power().poles, CablePowerPole::First);
        assert_eq!(cable.flags_for(CircuitType::Open, CircuitPole::Second), CircuitFlags::NONE);
        assert!(cable.remove_circuit_on_pole(ids[0], CircuitType::Open, CircuitPole::First));
        assert!(cable.is_idle());
    }

    #[test]
    #[should_panic(expected = "not registered on pole")]
    fn pole_removal_of_a_stranger_panics() {
        let ids = circuit_ids(1);
        let mut cable = Cable::new();
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::First);
        cable.remove_circuit_on_pole(ids[0], CircuitType::Open, CircuitPole::Second);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn double_registration_panics() {
        let ids = circuit_ids(1);
        let mut cable = Cable::new();
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::First);
        cable.add_circuit(ids[0], CircuitType::Open, CircuitFlags::NONE, CircuitPole::First);
    }
}
