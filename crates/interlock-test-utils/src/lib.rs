//! Topology fixtures and invariant checkers for Interlock development.
//!
//! [`fixtures`] assembles the canonical layouts the engine tests keep
//! coming back to (a switch loop, a diode loop, a relay loop, two sources
//! fighting over one loop, a ladder of switched lamps). [`invariants`]
//! cross-checks a [`Network`](interlock_engine::Network)'s bookkeeping
//! against the circuits it holds.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod invariants;

pub use fixtures::{
    diode_loop, ladder, network, relay_loop, remote_pair, switch_loop, transformer_loop,
    two_source_loop, wire, wire_pole, DiodeLoop, Ladder, RelayLoop, RemotePair, SwitchLoop,
    TransformerLoop, TwoSourceLoop,
};
pub use invariants::{assert_consistent, check_consistency, circuit_signatures, closed_signatures};
