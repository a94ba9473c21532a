//! Interlock: the circuit engine of a railway relay-interlocking simulator.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Interlock sub-crates. For most users, adding `interlock` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use interlock::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut net = Network::new(EngineConfig::default())?;
//! let source = net.add_node("S", &NodeSettings::PowerSource);
//! let switch = net.add_node("SW", &NodeSettings::OnOffSwitch);
//! let lamp = net.add_node("L", &NodeSettings::lamp());
//!
//! // One bifilar cable per hop: both poles of each side on one contact.
//! for (a, b) in [((source, 0), (switch, 0)), ((switch, 1), (lamp, 0))] {
//!     let cable = net.add_cable();
//!     for pole in CircuitPole::ALL {
//!         net.attach_cable(cable, CableSide::A, a.0, a.1, pole)?;
//!         net.attach_cable(cable, CableSide::B, b.0, b.1, pole)?;
//!     }
//! }
//!
//! net.set_source_enabled(source, true)?;
//! assert!(!net.is_active(lamp));
//!
//! net.set_switch(switch, true)?;
//! assert!(net.is_active(lamp));
//! assert_eq!(net.stats().closed_circuits, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `interlock-core` | IDs, circuits, contacts, cables, flags, topology errors |
//! | [`engine`] | `interlock-engine` | `Network`, node variants, relays, scheduler, settings |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Circuit, contact and cable model (`interlock-core`).
///
/// Holds the ids, the [`types::Circuit`] path type, per-contact counters
/// and [`types::TopologyError`].
pub use interlock_core as types;

/// Tracer, node variants, relays and the virtual clock (`interlock-engine`).
///
/// [`engine::Network`] is the single entry point; everything else hangs
/// off it.
pub use interlock_engine as engine;

/// Common imports for typical Interlock usage.
///
/// ```rust
/// use interlock::prelude::*;
/// ```
pub mod prelude {
    // Ids and graph primitives
    pub use interlock_core::{
        CableId, CableSide, Circuit, CircuitFlags, CircuitId, CircuitPole, CircuitType, NodeId,
        RelayId,
    };

    // Errors
    pub use interlock_core::TopologyError;
    pub use interlock_engine::{ConfigError, SettingsError};

    // Engine
    pub use interlock_engine::{
        ButtonState, EngineConfig, LeverCondition, LeverRange, Network, NetworkEvent,
        NetworkStats, NodeKind, NodeSettings, RelaySettings, RelayState, SimTime,
    };
}
