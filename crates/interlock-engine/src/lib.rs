//! Circuit discovery and propagation engine for the Interlock relay
//! simulator.
//!
//! A [`Network`] turns a static wiring (which node contact is attached to
//! which cable side) into the live set of current-carrying paths, and keeps
//! that set up to date as switches, levers, buttons and relays move.
//!
//! # Architecture
//!
//! ```text
//! Network (owner, single entry point)
//! ├── SlotMap<NodeId, Node>       variant state + per-contact accounting
//! ├── SlotMap<CableId, Cable>     per-pole circuit lists and power
//! ├── SlotMap<CircuitId, Circuit> ordered node/cable passages
//! ├── SlotMap<RelayId, Relay>     armatures linked to coils and contacts
//! ├── Scheduler                   virtual clock: coil delays, relay travel,
//! │                               deferred refreshes, remote latency
//! └── Outbox                      NetworkEvent queue for observers
//! ```
//!
//! # Tracer
//!
//! - **Seed:** an enabled source walks forward depth-first, registering
//!   a closed circuit for every loop that returns on the opposite pole
//!   and an open one for every dead end.
//! - **Local re-discovery:** a node whose switching changed extends the
//!   open circuits already passing through it.
//! - **Backward reach:** unpowered contacts search upstream for live
//!   circuits and splice onto them.
//! - **Disable / truncate:** circuits that no longer conduct are reduced
//!   to their still-valid open prefix or deleted.
//!
//! Node reactions (lamps, relay coils, transformers, remote bridges) run
//! on the 0→1 and 1→0 transitions of their contact counters.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod events;
pub mod network;
pub mod node;
pub mod relay;
pub mod scheduler;
pub mod settings;
pub mod stats;
pub(crate) mod tracer;

// Public re-exports for the primary API surface.
pub use config::{ConfigError, EngineConfig, RelayTiming};
pub use events::NetworkEvent;
pub use network::Network;
pub use node::{
    Activation, ActivationKind, ButtonState, ContactPosition, Deviator, DeviatorDriver,
    LeverCondition, LeverRange, Node, NodeKind, RelayCoil, RemoteBridge, RemoteMode, Switching,
    Transformer,
};
pub use relay::{Relay, RelaySettings, RelayState, RelayType};
pub use scheduler::{Scheduler, SimTime};
pub use settings::{NodeSettings, SettingsError};
pub use stats::NetworkStats;
