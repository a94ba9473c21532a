//! Lever position conditions.
//!
//! A lever contact closes its down contact while the lever sits in one of
//! its configured conditions and its up contact otherwise. Conditions are
//! sanitized against the lever's range whenever they are set.

use serde::{Deserialize, Serialize};

/// One position or span of positions that moves the contact down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeverCondition {
    /// A single position.
    Exact {
        /// Position index.
        position: i32,
    },
    /// Every position from `from` to `to`, inclusive.
    Range {
        /// First position.
        from: i32,
        /// Last position.
        to: i32,
        /// Whether the span wraps past the top of the range back to zero,
        /// covering `from..=max` and `min..=to`.
        #[serde(default)]
        warps_around_zero: bool,
    },
}

impl LeverCondition {
    fn bounds(&self) -> (i32, i32) {
        match *self {
            LeverCondition::Exact { position } => (position, position),
            LeverCondition::Range { from, to, .. } => (from, to),
        }
    }

    fn is_range(&self) -> bool {
        matches!(self, LeverCondition::Range { .. })
    }

    /// Whether the lever at `position` satisfies this condition.
    pub fn matches(&self, position: i32) -> bool {
        match *self {
            LeverCondition::Exact { position: p } => p == position,
            LeverCondition::Range {
                from,
                to,
                warps_around_zero,
            } => {
                (warps_around_zero && (position >= from || position <= to))
                    || (from <= position && position <= to)
            }
        }
    }
}

/// Position range of the lever a contact is mounted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverRange {
    /// Lowest position.
    pub min: i32,
    /// Highest position.
    pub max: i32,
    /// Whether the lever can rotate past `max` back to `min`.
    pub can_warp_around_zero: bool,
}

impl Default for LeverRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: 10,
            can_warp_around_zero: false,
        }
    }
}

/// Normalize a condition set against `range`.
///
/// Positions are clamped into the range. Exact conditions lose any span.
/// Non-wrapping ranges cover at least three positions. The set is sorted
/// by start (ranges before exact positions on ties) and every condition
/// overlapping the one kept before it is dropped.
pub fn sanitize_conditions(conditions: &[LeverCondition], range: LeverRange) -> Vec<LeverCondition> {
    let clamp = |p: i32| p.clamp(range.min, range.max.max(range.min));
    let mut out: Vec<LeverCondition> = conditions
        .iter()
        .map(|c| match *c {
            LeverCondition::Exact { position } => LeverCondition::Exact {
                position: clamp(position),
            },
            LeverCondition::Range {
                from,
                to,
                warps_around_zero,
            } => {
                let (from, to) = (clamp(from), clamp(to));
                let warps_around_zero = warps_around_zero && range.can_warp_around_zero;
                let to = if warps_around_zero {
                    to
                } else {
                    to.max(from + 2)
                };
                LeverCondition::Range {
                    from,
                    to,
                    warps_around_zero,
                }
            }
        })
        .collect();

    out.sort_by(|a, b| {
        let (af, at) = a.bounds();
        let (bf, bt) = b.bounds();
        af.cmp(&bf)
            .then_with(|| b.is_range().cmp(&a.is_range()))
            .then_with(|| at.cmp(&bt))
    });

    let mut last: Option<(i32, i32)> = None;
    out.retain(|c| {
        let (from, to) = c.bounds();
        if let Some((lf, lt)) = last {
            let overlaps = (lf..=lt).contains(&from)
                || (lf..=lt).contains(&to)
                || (from <= lf && to >= lf)
                || (from <= lt && to >= lt);
            if overlaps {
                return false;
            }
        }
        last = Some((from, to));
        true
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(from: i32, to: i32) -> LeverCondition {
        LeverCondition::Range {
            from,
            to,
            warps_around_zero: false,
        }
    }

    #[test]
    fn exact_and_range_matching() {
        assert!(LeverCondition::Exact { position: 3 }.matches(3));
        assert!(!LeverCondition::Exact { position: 3 }.matches(4));
        assert!(range(2, 5).matches(5));
        assert!(!range(2, 5).matches(6));
        let warp = LeverCondition::Range {
            from: 8,
            to: 1,
            warps_around_zero: true,
        };
        assert!(warp.matches(9));
        assert!(warp.matches(0));
        assert!(!warp.matches(4));
    }

    #[test]
    fn short_ranges_are_widened_and_clamped() {
        let out = sanitize_conditions(&[range(4, 4), range(9, 30)], LeverRange::default());
        assert_eq!(out, vec![range(4, 6), range(9, 11)]);
    }

    #[test]
    fn warp_is_dropped_when_lever_cannot_warp() {
        let cond = LeverCondition::Range {
            from: 8,
            to: 1,
            warps_around_zero: true,
        };
        let out = sanitize_conditions(&[cond], LeverRange::default());
        assert_eq!(out, vec![range(8, 10)]);
    }

    #[test]
    fn overlapping_conditions_are_removed() {
        let out = sanitize_conditions(
            &[
                LeverCondition::Exact { position: 2 },
                range(2, 4),
                LeverCondition::Exact { position: 7 },
                range(3, 6),
            ],
            LeverRange::default(),
        );
        assert_eq!(out, vec![range(2, 4), LeverCondition::Exact { position: 7 }]);
    }

    #[test]
    fn conditions_round_trip_through_json() {
        let json = r#"[{"type":"exact","position":1},{"type":"range","from":3,"to":6}]"#;
        let parsed: Vec<LeverCondition> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, vec![LeverCondition::Exact { position: 1 }, range(3, 6)]);
    }
}
