//! Lamps, sounders and electromagnets.

use serde::{Deserialize, Serialize};

use interlock_core::{Connection, Contact, Terminal};

use super::{Connections, Switching};

/// What an activation node drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    /// Indicator lamp.
    #[default]
    Lamp,
    /// Bell or buzzer.
    Sound,
    /// Lock or release magnet.
    Electromagnet,
}

/// A single-contact load that turns current around on the other pole.
/// Energized while at least one closed circuit passes through it.
#[derive(Clone, Debug, Default)]
pub struct Activation {
    pub(crate) kind: ActivationKind,
    pub(crate) active: bool,
}

impl Activation {
    /// An idle activation node of `kind`.
    pub fn new(kind: ActivationKind) -> Self {
        Self {
            kind,
            active: false,
        }
    }

    /// What it drives.
    pub fn kind(&self) -> ActivationKind {
        self.kind
    }

    /// Whether a closed circuit currently passes through it.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Switching for Activation {
    fn contact_count(&self) -> usize {
        1
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
}
