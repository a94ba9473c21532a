//! Relay coil: a load that powers a [`Relay`](crate::relay::Relay).
//!
//! The coil itself only closes circuits. Its pickup and drop delays are
//! timers owned here and run by the network scheduler; each timer carries
//! a generation so a cancelled timer that still fires is ignored.

use interlock_core::{CircuitPole, Connection, Contact, RelayId, Terminal};

use super::{other_of_two, Connections, Switching};
use crate::relay::RelayType;

/// Pending delayed action on one coil winding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CoilTimer {
    pub(crate) going_up: bool,
    pub(crate) generation: u64,
}

/// Coil node with an optional second winding on contact 1.
#[derive(Clone, Debug, Default)]
pub struct RelayCoil {
    pub(crate) relay: Option<RelayId>,
    pub(crate) relay_type: Option<RelayType>,
    pub(crate) delay_up_s: u32,
    pub(crate) delay_down_s: u32,
    pub(crate) has_second_connector: bool,
    pub(crate) combinator_second_coil: bool,
    pub(crate) is_up: [bool; 2],
    pub(crate) timers: [Option<CoilTimer>; 2],
    pub(crate) next_generation: u64,
}

impl RelayCoil {
    /// An unlinked coil.
    pub fn new(
        delay_up_s: u32,
        delay_down_s: u32,
        has_second_connector: bool,
        combinator_second_coil: bool,
    ) -> Self {
        Self {
            delay_up_s,
            delay_down_s,
            has_second_connector,
            combinator_second_coil,
            ..Self::default()
        }
    }

    /// The relay this coil drives.
    pub fn relay(&self) -> Option<RelayId> {
        self.relay
    }

    /// Pickup delay in seconds.
    pub fn delay_up_s(&self) -> u32 {
        self.delay_up_s
    }

    /// Drop delay in seconds.
    pub fn delay_down_s(&self) -> u32 {
        self.delay_down_s
    }

    /// Whether contact 1 is a second winding.
    pub fn has_second_connector(&self) -> bool {
        self.has_second_connector
    }

    /// Whether winding `index` is currently powering the relay.
    pub fn is_up(&self, index: usize) -> bool {
        self.is_up.get(index).copied().unwrap_or(false)
    }

    /// Whether winding `index` has a delayed action pending, and in which
    /// direction.
    pub fn pending(&self, index: usize) -> Option<bool> {
        self.timers.get(index).copied().flatten().map(|t| t.going_up)
    }

    fn is_combinator(&self) -> bool {
        self.relay_type == Some(RelayType::Combinator)
    }

    /// Winding driven by closed current on `contact`.
    ///
    /// A combinator uses both contacts as one bifilar winding whose index
    /// is chosen by `combinator_second_coil`.
    pub(crate) fn winding_for(&self, contact: usize) -> Option<usize> {
        match contact {
            0 if self.is_combinator() => Some(if self.combinator_second_coil { 0 } else { 1 }),
            0 => Some(0),
            1 if !self.is_combinator() && self.has_second_connector => Some(1),
            _ => None,
        }
    }

    /// Arm a delayed action on `winding`, returning its generation.
    pub(crate) fn arm(&mut self, winding: usize, going_up: bool) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.timers[winding] = Some(CoilTimer {
            going_up,
            generation,
        });
        generation
    }

    pub(crate) fn stop_timer(&mut self, winding: usize) {
        self.timers[winding] = None;
    }

    /// Consume the timer of `winding` if `generation` is still current.
    pub(crate) fn fire(&mut self, winding: usize, generation: u64) -> Option<bool> {
        match self.timers.get(winding).copied().flatten() {
            Some(t) if t.generation == generation => {
                self.timers[winding] = None;
                self.is_up[winding] = t.going_up;
                Some(t.going_up)
            }
            _ => None,
        }
    }
}

impl Switching for RelayCoil {
    fn contact_count(&self) -> usize {
        2
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, invert: bool) -> Connections {
        let mut out = Connections::new();
        if from.contact == 1 && !self.has_second_connector {
            return out;
        }
        let Some(relay_type) = self.relay_type else {
            return out;
        };
        match relay_type {
            RelayType::Polarized if (from.pole != CircuitPole::First) != invert => {}
            RelayType::PolarizedInverted if (from.pole != CircuitPole::Second) != invert => {}
            RelayType::Combinator => {
                if from.pole == CircuitPole::First {
                    out.push(Connection::plain(
                        other_of_two(from.contact),
                        CircuitPole::First,
                    ));
                }
            }
            _ => out.push(Connection::plain(from.contact, !from.pole)),
        }
        out
    }

    fn is_load(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interlock_core::CircuitPole::{First, Second};

    fn linked(relay_type: RelayType) -> RelayCoil {
        RelayCoil {
            relay_type: Some(relay_type),
            has_second_connector: true,
            ..RelayCoil::default()
        }
    }

    fn dest(coil: &RelayCoil, contact: usize, pole: CircuitPole, invert: bool) -> Vec<Terminal> {
        let contacts = vec![Contact::default(); 2];
        coil.connections(&contacts, Terminal::new(contact, pole), invert)
            .iter()
            .map(|c| c.to)
            .collect()
    }

    #[test]
    fn unlinked_coil_is_open() {
        assert!(dest(&RelayCoil::default(), 0, First, false).is_empty());
    }

    #[test]
    fn normal_coil_turns_current_around() {
        let coil = linked(RelayType::Normal);
        assert_eq!(dest(&coil, 0, First, false), vec![Terminal::new(0, Second)]);
        assert_eq!(dest(&coil, 1, Second, false), vec![Terminal::new(1, First)]);
    }

    #[test]
    fn polarized_coil_filters_by_pole_and_direction() {
        let coil = linked(RelayType::Polarized);
        assert_eq!(dest(&coil, 0, First, false).len(), 1);
        assert!(dest(&coil, 0, Second, false).is_empty());
        assert!(dest(&coil, 0, First, true).is_empty());
        assert_eq!(dest(&coil, 0, Second, true).len(), 1);

        let inverted = linked(RelayType::PolarizedInverted);
        assert!(dest(&inverted, 0, First, false).is_empty());
        assert_eq!(dest(&inverted, 0, Second, false).len(), 1);
    }

    #[test]
    fn combinator_bridges_contacts_on_first_pole() {
        let coil = linked(RelayType::Combinator);
        assert_eq!(dest(&coil, 0, First, false), vec![Terminal::new(1, First)]);
        assert!(dest(&coil, 1, Second, false).is_empty());
        assert_eq!(coil.winding_for(0), Some(1));
        assert_eq!(coil.winding_for(1), None);
    }

    #[test]
    fn second_contact_needs_second_connector() {
        let coil = RelayCoil {
            relay_type: Some(RelayType::Normal),
            ..RelayCoil::default()
        };
        assert!(dest(&coil, 1, First, false).is_empty());
        assert_eq!(coil.winding_for(1), None);
    }

    #[test]
    fn stale_timer_is_ignored() {
        let mut coil = linked(RelayType::Normal);
        let first = coil.arm(0, true);
        let second = coil.arm(0, false);
        assert_eq!(coil.fire(0, first), None);
        assert_eq!(coil.pending(0), Some(false));
        assert_eq!(coil.fire(0, second), Some(false));
        assert_eq!(coil.pending(0), None);
        assert!(!coil.is_up(0));
    }
}
