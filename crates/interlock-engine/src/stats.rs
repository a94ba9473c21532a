//! Per-network tracer diagnostics.
//!
//! [`NetworkStats`] counts what the tracer did since the network was
//! created. Live circuit counts are filled in on read by
//! [`Network::stats()`](crate::network::Network::stats).

/// Cumulative tracer counters and live circuit totals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Live open circuits.
    pub open_circuits: usize,
    /// Live closed circuits.
    pub closed_circuits: usize,
    /// Circuits registered on the graph.
    pub circuits_created: u64,
    /// Candidate circuits dropped because the source already had an
    /// identical path.
    pub duplicates_discarded: u64,
    /// Circuits unregistered and deleted.
    pub circuits_destroyed: u64,
    /// Walks abandoned at the depth cap.
    pub depth_cap_hits: u64,
    /// Branches abandoned on reaching a second power source.
    pub foreign_source_rejections: u64,
    /// Branches abandoned for running against an existing closed circuit.
    pub reverse_voltage_skips: u64,
    /// Scheduler tasks executed.
    pub tasks_run: u64,
    /// Events refused because the event queue was full.
    pub events_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = NetworkStats::default();
        assert_eq!(s.open_circuits, 0);
        assert_eq!(s.closed_circuits, 0);
        assert_eq!(s.circuits_created, 0);
        assert_eq!(s.duplicates_discarded, 0);
        assert_eq!(s.circuits_destroyed, 0);
        assert_eq!(s.depth_cap_hits, 0);
        assert_eq!(s.foreign_source_rejections, 0);
        assert_eq!(s.reverse_voltage_skips, 0);
        assert_eq!(s.tasks_run, 0);
    }
}
