//! Engine configuration and validation.
//!
//! [`EngineConfig`] is the constructor input of a
//! [`Network`](crate::network::Network). [`validate()`](EngineConfig::validate)
//! checks its invariants once, up front; nothing downstream re-checks them.

// ── RelayTiming ────────────────────────────────────────────────────

/// Armature travel times used when a relay has no custom duration.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayTiming {
    /// Default pickup travel, in milliseconds. Default: 700.
    pub default_up_ms: u32,
    /// Default drop travel, in milliseconds. Default: 200.
    pub default_down_ms: u32,
    /// Default travel of combinator relays (both directions). Default: 500.
    pub default_combinator_ms: u32,
    /// Relative random spread applied to every travel, in `[0, 0.5)`.
    /// Default: 0.05.
    pub jitter: f64,
}

impl Default for RelayTiming {
    fn default() -> Self {
        Self {
            default_up_ms: 700,
            default_down_ms: 200,
            default_combinator_ms: 500,
            jitter: 0.05,
        }
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration of a circuit network.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Recursion cap of every tracer walk. Paths deeper than this are
    /// silently abandoned. Default: 1000.
    pub max_trace_depth: usize,
    /// Relay travel defaults.
    pub relay_timing: RelayTiming,
    /// Simulated delay between a remote bridge changing mode and its peer
    /// hearing about it, in milliseconds. Zero delivers at the end of the
    /// current mutation. Default: 0.
    pub remote_latency_ms: u64,
    /// Seed of the relay travel jitter. Default: 0.
    pub seed: u64,
    /// Events held until drained. Once full, further events are dropped
    /// and counted in
    /// [`NetworkStats::events_dropped`](crate::NetworkStats::events_dropped).
    /// `None` keeps every event. Default: 65 536.
    pub event_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_trace_depth: 1000,
            relay_timing: RelayTiming::default(),
            remote_latency_ms: 0,
            seed: 0,
            event_capacity: Some(65_536),
        }
    }
}

impl EngineConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_trace_depth == 0 {
            return Err(ConfigError::ZeroTraceDepth);
        }
        if self.event_capacity == Some(0) {
            return Err(ConfigError::ZeroEventCapacity);
        }
        let t = &self.relay_timing;
        if t.default_up_ms == 0 || t.default_down_ms == 0 || t.default_combinator_ms == 0 {
            return Err(ConfigError::InvalidRelayTiming {
                reason: "default travel times must be positive".into(),
            });
        }
        if !t.jitter.is_finite() || !(0.0..0.5).contains(&t.jitter) {
            return Err(ConfigError::InvalidRelayTiming {
                reason: format!("jitter must be in [0, 0.5), got {}", t.jitter),
            });
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `max_trace_depth` is zero.
    #[error("max_trace_depth must be at least 1")]
    ZeroTraceDepth,
    /// `event_capacity` is `Some(0)`.
    #[error("event_capacity must be at least 1")]
    ZeroEventCapacity,
    /// A [`RelayTiming`] invariant is violated.
    #[error("invalid relay timing: {reason}")]
    InvalidRelayTiming {
        /// Which invariant.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_trace_depth, 1000);
        assert_eq!(cfg.relay_timing.default_up_ms, 700);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        let cfg = EngineConfig {
            max_trace_depth: 0,
            ..EngineConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::ZeroTraceDepth) => {}
            other => panic!("expected ZeroTraceDepth, got {other:?}"),
        }
    }

    #[test]
    fn zero_event_capacity_rejected() {
        let cfg = EngineConfig {
            event_capacity: Some(0),
            ..EngineConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::ZeroEventCapacity) => {}
            other => panic!("expected ZeroEventCapacity, got {other:?}"),
        }
        let unbounded = EngineConfig {
            event_capacity: None,
            ..EngineConfig::default()
        };
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn jitter_out_of_range_rejected() {
        for jitter in [-0.1, 0.5, f64::NAN] {
            let cfg = EngineConfig {
                relay_timing: RelayTiming {
                    jitter,
                    ..RelayTiming::default()
                },
                ..EngineConfig::default()
            };
            match cfg.validate() {
                Err(ConfigError::InvalidRelayTiming { .. }) => {}
                other => panic!("expected InvalidRelayTiming for {jitter}, got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_travel_rejected() {
        let cfg = EngineConfig {
            relay_timing: RelayTiming {
                default_down_ms: 0,
                ..RelayTiming::default()
            },
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
