//! Battery / feeder.

use interlock_core::{Contact, Terminal};

use super::{Connections, Switching};

/// A power source with a single contact.
///
/// Current leaves on one pole and must come back on the other for a loop
/// to close. It never passes current through.
#[derive(Clone, Debug, Default)]
pub struct PowerSource {
    pub(crate) enabled: bool,
}

impl PowerSource {
    /// Whether the source is feeding current.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Switching for PowerSource {
    fn contact_count(&self) -> usize {
        1
    }

    fn connections(&self, _contacts: &[Contact], _from: Terminal, _invert: bool) -> Connections {
        Connections::new()
    }

    fn is_source(&self, contact: Option<usize>) -> bool {
        self.enabled && matches!(contact, None | Some(0))
    }
}
