//! Core data model for the Interlock relay-logic simulator.
//!
//! This is the leaf crate of the workspace. It defines the vocabulary the
//! circuit tracer works with: arena ids, pole/side/type enums, circuit
//! flags, path items, the [`Circuit`] entity, per-contact counters
//! ([`NodeAccounting`]) and cable power aggregation ([`Cable`]). It
//! contains no traversal logic.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accounting;
pub mod cable;
pub mod circuit;
pub mod contact;
pub mod error;
pub mod flags;
pub mod id;
pub mod item;
pub mod types;

pub use accounting::NodeAccounting;
pub use cable::Cable;
pub use circuit::{Circuit, NodeOccurrences};
pub use contact::Contact;
pub use error::TopologyError;
pub use flags::CircuitFlags;
pub use id::{CableId, CircuitId, NodeId, RelayId};
pub use item::{contains_terminal, CableEnd, CableItem, Connection, Item, NodeItem, Terminal};
pub use types::{
    AnyCircuitType, CableMode, CablePower, CablePowerPole, CableSide, CircuitPole, CircuitType,
    ContactType,
};
