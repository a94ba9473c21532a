//! Three-way contacts: relay contacts, lever contacts and buttons.
//!
//! Contact 0 is the common, 1 the up contact (reachable only through the
//! central connector) and 2 the down contact. What decides which of up and
//! down is closed is the [`DeviatorDriver`]; the routing is shared.

use serde::{Deserialize, Serialize};

use interlock_core::{Connection, Contact, ContactType, RelayId, Terminal};

use super::lever::{LeverCondition, LeverRange};
use super::{Connections, Switching};
use crate::relay::RelayState;

/// Common contact.
pub const COMMON: usize = 0;
/// Up contact.
pub const UP: usize = 1;
/// Down contact.
pub const DOWN: usize = 2;

/// Resting position reported by whatever moves a contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPosition {
    /// Up contact closed.
    Up,
    /// Down contact closed.
    Down,
    /// In transit or unlinked.
    #[default]
    Middle,
}

impl From<RelayState> for ContactPosition {
    fn from(state: RelayState) -> Self {
        match state {
            RelayState::Up => ContactPosition::Up,
            RelayState::Down => ContactPosition::Down,
            RelayState::GoingUp | RelayState::GoingDown => ContactPosition::Middle,
        }
    }
}

/// Position of a push button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    /// At rest.
    #[default]
    Normal,
    /// Pushed in.
    Pressed,
    /// Pulled out.
    Extracted,
}

impl ButtonState {
    fn index(self) -> usize {
        match self {
            ButtonState::Normal => 0,
            ButtonState::Pressed => 1,
            ButtonState::Extracted => 2,
        }
    }
}

/// What moves a deviator.
#[derive(Clone, Debug)]
pub enum DeviatorDriver {
    /// A relay armature.
    Relay {
        /// Linked relay.
        relay: Option<RelayId>,
        /// Last position reported by the relay.
        position: ContactPosition,
        /// Keep one side closed while the armature travels.
        active_while_middle: bool,
        /// Whether the linked relay is a combinator.
        combinator: bool,
    },
    /// A lever.
    Lever {
        /// Current lever position, `None` while unlinked.
        position: Option<i32>,
        /// Lever range the conditions were sanitized against.
        range: LeverRange,
        /// Sanitized conditions.
        conditions: Vec<LeverCondition>,
    },
    /// A push button.
    Button {
        /// Current state.
        state: ButtonState,
        /// `[straight, central]` closure per button state.
        contacts: [[bool; 2]; 3],
    },
}

/// Default closure table of a button: straight at rest, central while
/// pressed, straight when pulled out.
pub const DEFAULT_BUTTON_CONTACTS: [[bool; 2]; 3] = [[true, false], [false, true], [true, false]];

/// A three-way contact.
#[derive(Clone, Debug)]
pub struct Deviator {
    // [up, down], stored already swapped.
    pub(crate) on: [bool; 2],
    pub(crate) swap: bool,
    pub(crate) has_central: bool,
    pub(crate) driver: DeviatorDriver,
}

impl Deviator {
    /// A deviator with both contacts open.
    pub fn new(driver: DeviatorDriver, swap: bool, has_central: bool) -> Self {
        Self {
            on: [false, false],
            swap,
            has_central,
            driver,
        }
    }

    /// Whether the up contact is closed.
    pub fn is_up_on(&self) -> bool {
        self.on[0]
    }

    /// Whether the down contact is closed.
    pub fn is_down_on(&self) -> bool {
        self.on[1]
    }

    /// Whether up and down are swapped.
    pub fn swaps_state(&self) -> bool {
        self.swap
    }

    /// Whether the up contact is wired through the central connector.
    pub fn has_central_connector(&self) -> bool {
        self.has_central
    }

    /// What moves this contact.
    pub fn driver(&self) -> &DeviatorDriver {
        &self.driver
    }

    pub(crate) fn driver_mut(&mut self) -> &mut DeviatorDriver {
        &mut self.driver
    }

    /// The `(up, down)` pair the driver asks for, before swapping.
    pub fn desired_state(&self) -> (bool, bool) {
        match &self.driver {
            DeviatorDriver::Relay {
                position,
                active_while_middle,
                combinator,
                ..
            } => {
                let can_middle = *position == ContactPosition::Middle
                    && *active_while_middle
                    && *combinator
                    && !self.has_central;
                (
                    *position == ContactPosition::Up || (can_middle && self.swap),
                    *position == ContactPosition::Down || (can_middle && !self.swap),
                )
            }
            DeviatorDriver::Lever {
                position,
                conditions,
                ..
            } => match position {
                None => (false, false),
                Some(p) if conditions.iter().any(|c| c.matches(*p)) => (false, true),
                Some(_) => (true, false),
            },
            DeviatorDriver::Button { state, contacts } => {
                let [straight, central] = contacts[state.index()];
                let central = if self.has_central { central } else { !straight };
                (central, straight)
            }
        }
    }

    /// The `(up, down)` pair after applying the swap, as it would be stored.
    pub(crate) fn stored(&self, up: bool, down: bool) -> (bool, bool) {
        if self.swap {
            (down, up)
        } else {
            (up, down)
        }
    }
}

impl Switching for Deviator {
    fn contact_count(&self) -> usize {
        3
    }

    fn connections(&self, contacts: &[Contact], from: Terminal, _invert: bool) -> Connections {
        let up = self.on[0] && self.has_central;
        let down = self.on[1];
        let mut out = Connections::new();
        let passthrough = contacts[from.contact].contact_type(from.pole) == ContactType::Passthrough;
        if passthrough && (from.contact == COMMON || from.contact == DOWN) {
            let other = if from.contact == COMMON { DOWN } else { COMMON };
            out.push(Connection::plain(other, from.pole));
            return out;
        }
        let targets: [Option<usize>; 2] = match from.contact {
            COMMON => [up.then_some(UP), down.then_some(DOWN)],
            UP if up => [Some(COMMON), down.then_some(DOWN)],
            DOWN if down => [Some(COMMON), up.then_some(UP)],
            _ => [None, None],
        };
        out.extend(
            targets
                .into_iter()
                .flatten()
                .map(|c| Connection::plain(c, from.pole)),
        );
        out
    }
}
