//! Coded-current transformer.
//!
//! The primary (contact 0) behaves like a lamp: current turns around on the
//! other pole. While a closed circuit passes through the primary and the
//! transformer is enabled, the secondary (contact 1) becomes a power source
//! of its own, optionally tagging everything it feeds with a code.

use interlock_core::{CircuitFlags, Connection, Contact, Terminal};

use super::{Connections, Switching};

/// Code flag for a rate in pulses per minute.
pub fn code_for_rate(rate: u32) -> Option<CircuitFlags> {
    match rate {
        75 => Some(CircuitFlags::CODE_75),
        120 => Some(CircuitFlags::CODE_120),
        180 => Some(CircuitFlags::CODE_180),
        270 => Some(CircuitFlags::CODE_270),
        _ => None,
    }
}

/// Two-contact transformer.
#[derive(Clone, Debug, Default)]
pub struct Transformer {
    pub(crate) code: CircuitFlags,
    pub(crate) enabled: bool,
    pub(crate) really_enabled: bool,
}

impl Transformer {
    /// A disabled transformer injecting `code` (use
    /// [`CircuitFlags::NONE`] for plain current).
    pub fn new(code: CircuitFlags) -> Self {
        Self {
            code: code.code(),
            ..Self::default()
        }
    }

    /// Code injected on the secondary.
    pub fn code(&self) -> CircuitFlags {
        self.code
    }

    /// Whether the transformer is switched on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the secondary is currently feeding.
    pub fn is_feeding(&self) -> bool {
        self.really_enabled
    }
}

impl Switching for Transformer {
    fn contact_count(&self) -> usize {
        2
    }

    fn connections(&self, contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        let mut out = Connections::new();
        if from.contact == 0 && contacts[0].cable().is_some() {
            out.push(Connection::plain(0, !from.pole));
        }
        out
    }

    fn is_load(&self) -> bool {
        true
    }

    fn is_source(&self, contact: Option<usize>) -> bool {
        matches!(contact, None | Some(1))
    }
}
