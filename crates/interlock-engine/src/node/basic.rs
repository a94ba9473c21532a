//! Stateless or nearly stateless passive parts.

use interlock_core::{CircuitFlags, CircuitPole, Connection, Contact, ContactType, Terminal};

use super::{other_of_two, Connections, Switching};

// ── Junction ───────────────────────────────────────────────────────

/// Four-way star point. Current fans out to every other enabled contact on
/// the same pole.
#[derive(Clone, Debug, Default)]
pub struct Junction {
    pub(crate) disabled_contact: Option<usize>,
}

impl Junction {
    /// Contacts on every junction.
    pub const CONTACTS: usize = 4;

    /// A junction with `contact` removed from service.
    pub fn with_disabled(contact: Option<usize>) -> Self {
        Self {
            disabled_contact: contact.filter(|&c| c < Self::CONTACTS),
        }
    }

    /// The contact taken out of service, if any.
    pub fn disabled_contact(&self) -> Option<usize> {
        self.disabled_contact
    }

    fn is_enabled(&self, contact: usize) -> bool {
        self.disabled_contact != Some(contact)
    }
}

impl Switching for Junction {
    fn contact_count(&self) -> usize {
        Self::CONTACTS
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        if !self.is_enabled(from.contact) {
            return Connections::new();
        }
        (0..Self::CONTACTS)
            .filter(|&c| c != from.contact && self.is_enabled(c))
            .map(|c| Connection::plain(c, from.pole))
            .collect()
    }
}

// ── OnOffSwitch ────────────────────────────────────────────────────

/// Two-contact manual switch.
#[derive(Clone, Debug, Default)]
pub struct OnOffSwitch {
    pub(crate) on: bool,
}

impl OnOffSwitch {
    /// Whether the switch conducts.
    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Switching for OnOffSwitch {
    fn contact_count(&self) -> usize {
        2
    }

    fn connections(&self, contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        if !self.on || contacts[from.contact].contact_type(from.pole) == ContactType::NotConnected {
            return Connections::new();
        }
        let mut out = Connections::new();
        out.push(Connection::plain(other_of_two(from.contact), from.pole));
        out
    }
}

// ── Diode ──────────────────────────────────────────────────────────

/// Lets current through from contact 0 to contact 1 only.
///
/// When `reversed` the conducting direction is 1 to 0. Backward searches
/// (`invert`) see the mirror image, so an unpowered anode can still find
/// current waiting at the cathode side.
#[derive(Clone, Debug, Default)]
pub struct Diode {
    pub(crate) reversed: bool,
}

impl Diode {
    /// Whether the conducting direction is 1 to 0.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }
}

impl Switching for Diode {
    fn contact_count(&self) -> usize {
        2
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, invert: bool) -> Connections {
        let backward = invert != self.reversed;
        let mut out = Connections::new();
        match (from.contact, backward) {
            (0, false) => out.push(Connection::plain(1, from.pole)),
            (1, true) => out.push(Connection::plain(0, from.pole)),
            _ => {}
        }
        out
    }
}

// ── Resistor ───────────────────────────────────────────────────────

/// Series resistor. Tags the circuits through it with
/// [`CircuitFlags::RESISTOR`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Resistor;

impl Switching for Resistor {
    fn contact_count(&self) -> usize {
        2
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        let mut out = Connections::new();
        out.push(Connection::flagged(
            other_of_two(from.contact),
            from.pole,
            CircuitFlags::RESISTOR,
        ));
        out
    }

    fn is_load(&self) -> bool {
        true
    }
}

// ── PolarityInversion ──────────────────────────────────────────────

/// Crosses the two wires of a bifilar pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolarityInversion;

impl Switching for PolarityInversion {
    fn contact_count(&self) -> usize {
        2
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        let mut out = Connections::new();
        out.push(Connection::plain(other_of_two(from.contact), !from.pole));
        out
    }
}

// ── Bifilarizator ──────────────────────────────────────────────────

/// Splits a bifilar central contact (1) into two unifilar outputs.
///
/// Contact 0 maps to the first pole of contact 1 and contact 2 to its
/// second pole. Outputs only use their first pole.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bifilarizator;

impl Switching for Bifilarizator {
    fn contact_count(&self) -> usize {
        3
    }

    fn connections(&self, _contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        let mut out = Connections::new();
        match (from.contact, from.pole) {
            (0, CircuitPole::First) => out.push(Connection::plain(1, CircuitPole::First)),
            (2, CircuitPole::First) => out.push(Connection::plain(1, CircuitPole::Second)),
            (1, CircuitPole::First) => out.push(Connection::plain(0, CircuitPole::First)),
            (1, CircuitPole::Second) => out.push(Connection::plain(2, CircuitPole::First)),
            _ => {}
        }
        out
    }
}
