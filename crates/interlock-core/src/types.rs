//! Circuit and cable enumerations shared by every layer.

use std::fmt;
use std::ops::Not;

/// Whether a circuit has looped back to its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CircuitType {
    /// Pending path: current got this far and stopped.
    Open,
    /// Complete loop from source back to source.
    Closed,
}

impl CircuitType {
    /// Both types, `Closed` first.
    pub const ALL: [CircuitType; 2] = [CircuitType::Closed, CircuitType::Open];

    /// Dense index for per-type arrays.
    pub const fn index(self) -> usize {
        match self {
            CircuitType::Open => 0,
            CircuitType::Closed => 1,
        }
    }

    /// The other type.
    pub const fn opposite(self) -> Self {
        match self {
            CircuitType::Open => CircuitType::Closed,
            CircuitType::Closed => CircuitType::Open,
        }
    }
}

impl fmt::Display for CircuitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitType::Open => write!(f, "open"),
            CircuitType::Closed => write!(f, "closed"),
        }
    }
}

/// Result of a "which circuits touch this contact" query.
///
/// `Closed` takes priority over `Open` when both are present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnyCircuitType {
    /// Nothing registered.
    None,
    /// Only open circuits.
    Open,
    /// At least one closed circuit.
    Closed,
}

impl From<CircuitType> for AnyCircuitType {
    fn from(t: CircuitType) -> Self {
        match t {
            CircuitType::Open => AnyCircuitType::Open,
            CircuitType::Closed => AnyCircuitType::Closed,
        }
    }
}

/// One of the two conductors carried by a contact or a cable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CircuitPole {
    /// First conductor (positive on polarized devices).
    First,
    /// Second conductor.
    Second,
}

impl CircuitPole {
    /// Both poles in index order.
    pub const ALL: [CircuitPole; 2] = [CircuitPole::First, CircuitPole::Second];

    /// Dense index for per-pole arrays.
    pub const fn index(self) -> usize {
        match self {
            CircuitPole::First => 0,
            CircuitPole::Second => 1,
        }
    }
}

impl Not for CircuitPole {
    type Output = CircuitPole;

    fn not(self) -> CircuitPole {
        match self {
            CircuitPole::First => CircuitPole::Second,
            CircuitPole::Second => CircuitPole::First,
        }
    }
}

/// End of a cable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CableSide {
    /// Side A.
    A,
    /// Side B.
    B,
}

impl CableSide {
    /// Dense index for per-side arrays.
    pub const fn index(self) -> usize {
        match self {
            CableSide::A => 0,
            CableSide::B => 1,
        }
    }
}

impl Not for CableSide {
    type Output = CableSide;

    fn not(self) -> CableSide {
        match self {
            CableSide::A => CableSide::B,
            CableSide::B => CableSide::A,
        }
    }
}

/// State of one pole slot of a contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContactType {
    /// No conductor on this pole.
    #[default]
    NotConnected,
    /// Cable pole terminates on this contact.
    Connected,
    /// Cable pole passes straight through the node.
    Passthrough,
}

impl ContactType {
    /// Whether current can use this slot.
    pub const fn is_wired(self) -> bool {
        !matches!(self, ContactType::NotConnected)
    }
}

/// Which poles of a cable are energized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CablePowerPole {
    /// No circuit on either pole.
    None,
    /// First pole only.
    First,
    /// Second pole only.
    Second,
    /// Both poles.
    Both,
}

impl CablePowerPole {
    fn from_bools(first: bool, second: bool) -> Self {
        match (first, second) {
            (true, true) => CablePowerPole::Both,
            (true, false) => CablePowerPole::First,
            (false, true) => CablePowerPole::Second,
            (false, false) => CablePowerPole::None,
        }
    }
}

/// Power state of a cable: energized poles and the dominating circuit type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CablePower {
    /// Energized poles.
    pub poles: CablePowerPole,
    /// `Closed` whenever any closed circuit is present.
    pub circuit_type: CircuitType,
}

impl CablePower {
    /// Unpowered cable.
    pub const NONE: CablePower = CablePower {
        poles: CablePowerPole::None,
        circuit_type: CircuitType::Open,
    };

    /// Build from per-pole occupancy; closed occupancy dominates open.
    pub fn from_occupancy(closed: [bool; 2], open: [bool; 2]) -> Self {
        if closed[0] || closed[1] {
            return CablePower {
                poles: CablePowerPole::from_bools(closed[0], closed[1]),
                circuit_type: CircuitType::Closed,
            };
        }
        CablePower {
            poles: CablePowerPole::from_bools(open[0], open[1]),
            circuit_type: CircuitType::Open,
        }
    }

    /// Whether any pole carries a closed circuit.
    pub fn is_closed(&self) -> bool {
        self.circuit_type == CircuitType::Closed && self.poles != CablePowerPole::None
    }
}

/// Drawing mode of a cable. Display-only; tracing ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CableMode {
    /// Single conductor drawn.
    Unifilar,
    /// Pair, first conductor highlighted.
    Bifilar1,
    /// Pair, second conductor highlighted.
    Bifilar2,
    /// Pair, both conductors drawn.
    #[default]
    BifilarBoth,
}
