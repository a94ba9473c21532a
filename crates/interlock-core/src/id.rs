//! Strongly-typed arena keys for nodes, cables, circuits and relays.
//!
//! All four are [`slotmap`] keys: stable across unrelated insertions and
//! removals, and never reused while a stale copy could still observe the
//! old slot (the version half of the key changes on reuse).

use slotmap::{new_key_type, Key};
use std::fmt;

new_key_type! {
    /// Identifies a node (any switching element) within a network.
    pub struct NodeId;

    /// Identifies a cable within a network.
    pub struct CableId;

    /// Identifies a live circuit within a network.
    ///
    /// Circuit ids are runtime-only. They are never persisted and a full
    /// reseed produces fresh ids for equivalent paths.
    pub struct CircuitId;

    /// Identifies a relay (the moving armature shared by coils and contacts).
    pub struct RelayId;
}

/// Low 32 bits of the key are the slot index, high 32 bits the version.
fn split(raw: u64) -> (u32, u32) {
    (raw as u32, (raw >> 32) as u32)
}

macro_rules! display_key {
    ($ty:ty, $prefix:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let (idx, version) = split(self.data().as_ffi());
                write!(f, concat!($prefix, "{}v{}"), idx, version)
            }
        }
    };
}

display_key!(NodeId, "node#");
display_key!(CableId, "cable#");
display_key!(CircuitId, "circuit#");
display_key!(RelayId, "relay#");

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn display_includes_prefix_and_index() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = nodes.insert(());
        let b = nodes.insert(());
        assert!(a.to_string().starts_with("node#"));
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn reused_slot_gets_new_version() {
        let mut cables: SlotMap<CableId, ()> = SlotMap::with_key();
        let first = cables.insert(());
        cables.remove(first);
        let second = cables.insert(());
        assert_ne!(first, second);
        assert_ne!(first.to_string(), second.to_string());
    }
}
