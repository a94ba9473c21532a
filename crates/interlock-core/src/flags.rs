//! Coded-signaling metadata carried by circuits.
//!
//! [`CircuitFlags`] is a hand-rolled bitset: one resistor marker plus a
//! code field holding at most one of the four track-circuit frequencies.
//! Flags are gathered along a path (union) and intersected across
//! parallel circuits sharing a cable pole or a contact.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// Bitset of circuit metadata.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircuitFlags(u8);

impl CircuitFlags {
    /// No flags.
    pub const NONE: CircuitFlags = CircuitFlags(0);
    /// A resistor sits on the path.
    pub const RESISTOR: CircuitFlags = CircuitFlags(0b0000_0001);
    /// 75 pulses per minute code.
    pub const CODE_75: CircuitFlags = CircuitFlags(0b0000_0010);
    /// 120 pulses per minute code.
    pub const CODE_120: CircuitFlags = CircuitFlags(0b0000_0100);
    /// 180 pulses per minute code.
    pub const CODE_180: CircuitFlags = CircuitFlags(0b0000_1000);
    /// 270 pulses per minute code.
    pub const CODE_270: CircuitFlags = CircuitFlags(0b0001_0000);
    /// More than one code mixed on the same path.
    pub const CODE_INVALID: CircuitFlags = CircuitFlags(0b0010_0000);

    const CODE_MASK: u8 = 0b0011_1110;
    const ALL_MASK: u8 = 0b0011_1111;

    /// Build from raw bits, dropping anything outside the known set.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        CircuitFlags(bits & Self::ALL_MASK)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` when no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is set in `self`.
    pub const fn contains(self, other: CircuitFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the resistor marker is set.
    pub const fn has_resistor(self) -> bool {
        self.contains(Self::RESISTOR)
    }

    /// The code carried, normalized.
    ///
    /// Returns one of the four code flags, [`CircuitFlags::NONE`] when no
    /// code bit is set, or [`CircuitFlags::CODE_INVALID`] when the code
    /// bits do not name exactly one frequency.
    pub const fn code(self) -> CircuitFlags {
        let code = self.0 & Self::CODE_MASK;
        match code {
            0 => Self::NONE,
            0b0000_0010 | 0b0000_0100 | 0b0000_1000 | 0b0001_0000 => CircuitFlags(code),
            _ => Self::CODE_INVALID,
        }
    }

    /// Replace the code field, keeping the non-code flags.
    pub const fn with_code(self, code: CircuitFlags) -> CircuitFlags {
        CircuitFlags((self.0 & !Self::CODE_MASK) | (code.0 & Self::CODE_MASK))
    }

    /// Pulses per minute of the carried code, if it names one.
    pub const fn code_rate(self) -> Option<u32> {
        match self.code().0 {
            0b0000_0010 => Some(75),
            0b0000_0100 => Some(120),
            0b0000_1000 => Some(180),
            0b0001_0000 => Some(270),
            _ => None,
        }
    }
}

impl BitOr for CircuitFlags {
    type Output = CircuitFlags;

    fn bitor(self, rhs: CircuitFlags) -> CircuitFlags {
        CircuitFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for CircuitFlags {
    fn bitor_assign(&mut self, rhs: CircuitFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CircuitFlags {
    type Output = CircuitFlags;

    fn bitand(self, rhs: CircuitFlags) -> CircuitFlags {
        CircuitFlags(self.0 & rhs.0)
    }
}

impl BitAndAssign for CircuitFlags {
    fn bitand_assign(&mut self, rhs: CircuitFlags) {
        self.0 &= rhs.0;
    }
}

impl fmt::Debug for CircuitFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "CircuitFlags(NONE)");
        }
        let names = [
            (Self::RESISTOR, "RESISTOR"),
            (Self::CODE_75, "CODE_75"),
            (Self::CODE_120, "CODE_120"),
            (Self::CODE_180, "CODE_180"),
            (Self::CODE_270, "CODE_270"),
            (Self::CODE_INVALID, "CODE_INVALID"),
        ];
        let mut first = true;
        write!(f, "CircuitFlags(")?;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_code_is_reported() {
        let f = CircuitFlags::RESISTOR | CircuitFlags::CODE_180;
        assert_eq!(f.code(), CircuitFlags::CODE_180);
        assert_eq!(f.code_rate(), Some(180));
        assert!(f.has_resistor());
    }

    #[test]
    fn mixed_codes_are_invalid() {
        let f = CircuitFlags::CODE_75 | CircuitFlags::CODE_270;
        assert_eq!(f.code(), CircuitFlags::CODE_INVALID);
        assert_eq!(f.code_rate(), None);
    }

    #[test]
    fn with_code_keeps_resistor() {
        let f = (CircuitFlags::RESISTOR | CircuitFlags::CODE_75).with_code(CircuitFlags::CODE_120);
        assert!(f.has_resistor());
        assert_eq!(f.code(), CircuitFlags::CODE_120);
        assert_eq!(f.with_code(CircuitFlags::NONE), CircuitFlags::RESISTOR);
    }

    #[test]
    fn debug_lists_names() {
        let f = CircuitFlags::RESISTOR | CircuitFlags::CODE_75;
        assert_eq!(format!("{f:?}"), "CircuitFlags(RESISTOR | CODE_75)");
        assert_eq!(format!("{:?}", CircuitFlags::NONE), "CircuitFlags(NONE)");
    }

    proptest! {
        #[test]
        fn intersection_is_subset_of_both(a in any::<u8>(), b in any::<u8>()) {
            let a = CircuitFlags::from_bits_truncate(a);
            let b = CircuitFlags::from_bits_truncate(b);
            let both = a & b;
            prop_assert!(a.contains(both));
            prop_assert!(b.contains(both));
            prop_assert!((a | b).contains(a));
        }
    }
}
