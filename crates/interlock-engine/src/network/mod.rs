//! The circuit network.
//!
//! [`Network`] owns every node, cable, circuit and relay of one layout,
//! plus the virtual clock that drives delayed behaviour. It is the single
//! entry point of the engine: topology edits, state changes (switches,
//! levers, buttons, sources) and time all go through it.
//!
//! # Execution model
//!
//! Every public mutation runs the tracer to completion, then drains the
//! tasks due at the current instant (deferred refreshes, zero-latency peer
//! messages) before returning. Events produced along the way are read with
//! [`drain_events()`](Network::drain_events) once the call returned.
//! Time only moves in [`advance()`](Network::advance).
//!
//! # Ownership model
//!
//! `Network` is [`Send`] but all mutation takes `&mut self`; there is no
//! interior mutability and no background thread.

pub(crate) mod control;
pub(crate) mod hooks;
pub(crate) mod remote;
pub(crate) mod topology;

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use slotmap::SlotMap;
use tracing::warn;

use interlock_core::{
    Cable, CablePower, CableId, Circuit, CircuitId, CircuitType, NodeId, RelayId, TopologyError,
};

use crate::config::{ConfigError, EngineConfig};
use crate::events::{NetworkEvent, Outbox};
use crate::node::{Node, NodeKind};
use crate::relay::Relay;
use crate::scheduler::{Scheduler, SimTime, Task};
use crate::stats::NetworkStats;

// Compile-time assertion: Network is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Network>();
    }
};

// ── Network ────────────────────────────────────────────────────────

/// A layout of nodes and cables with its live circuits.
///
/// # Example
///
/// ```ignore
/// let mut net = Network::new(EngineConfig::default())?;
/// let source = net.add_node("S", &NodeSettings::PowerSource);
/// let lamp = net.add_node("L", &NodeSettings::lamp());
/// let cable = net.add_cable();
/// net.attach_cable(cable, CableSide::A, source, 0, CircuitPole::First)?;
/// // ...
/// net.set_source_enabled(source, true)?;
/// assert!(net.is_active(lamp));
/// ```
#[derive(Debug)]
pub struct Network {
    pub(crate) config: EngineConfig,
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) cables: SlotMap<CableId, Cable>,
    pub(crate) circuits: SlotMap<CircuitId, Circuit>,
    pub(crate) relays: SlotMap<RelayId, Relay>,
    pub(crate) relay_names: IndexMap<String, RelayId>,
    pub(crate) scheduler: Scheduler,
    pub(crate) outbox: Outbox,
    pub(crate) stats: NetworkStats,
    pub(crate) rng: ChaCha8Rng,
}

impl Network {
    /// An empty network.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let outbox = Outbox::new(config.event_capacity);
        Ok(Self {
            config,
            nodes: SlotMap::with_key(),
            cables: SlotMap::with_key(),
            circuits: SlotMap::with_key(),
            relays: SlotMap::with_key(),
            relay_names: IndexMap::new(),
            scheduler: Scheduler::default(),
            outbox,
            stats: NetworkStats::default(),
            rng,
        })
    }

    /// Configuration the network was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Every node.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Cable by id.
    pub fn cable(&self, id: CableId) -> Option<&Cable> {
        self.cables.get(id)
    }

    /// Every cable.
    pub fn cables(&self) -> impl Iterator<Item = (CableId, &Cable)> {
        self.cables.iter()
    }

    /// Power currently carried by a cable.
    pub fn cable_power(&self, id: CableId) -> Option<CablePower> {
        self.cables.get(id).map(Cable::power)
    }

    /// Relay by id.
    pub fn relay(&self, id: RelayId) -> Option<&Relay> {
        self.relays.get(id)
    }

    /// Relay by name.
    pub fn relay_by_name(&self, name: &str) -> Option<RelayId> {
        self.relay_names.get(name).copied()
    }

    /// Every relay, in creation order.
    pub fn relays(&self) -> impl Iterator<Item = (RelayId, &Relay)> {
        self.relay_names
            .values()
            .filter_map(|&id| self.relays.get(id).map(|r| (id, r)))
    }

    /// Circuit by id. Circuits are never persisted and ids do not survive
    /// a recalculation.
    pub fn circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.get(id)
    }

    /// Every registered circuit.
    pub fn circuits(&self) -> impl Iterator<Item = (CircuitId, &Circuit)> {
        self.circuits.iter().filter(|(_, c)| c.is_enabled())
    }

    /// Circuits of one type registered on `node`.
    pub fn circuits_on(&self, node: NodeId, circuit_type: CircuitType) -> &[CircuitId] {
        self.nodes
            .get(node)
            .map_or(&[], |n| n.accounting().circuits(circuit_type))
    }

    /// Whether a lamp, sound or electromagnet is energized.
    pub fn is_active(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node).map(Node::kind),
            Some(NodeKind::Activation(a)) if a.is_active()
        )
    }

    /// Tracer counters, with live circuit totals.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = self.stats.clone();
        stats.events_dropped = self.outbox.dropped();
        for (_, circuit) in self.circuits() {
            match circuit.circuit_type() {
                CircuitType::Open => stats.open_circuits += 1,
                CircuitType::Closed => stats.closed_circuits += 1,
            }
        }
        stats
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Take every event queued so far.
    ///
    /// The queue holds at most
    /// [`EngineConfig::event_capacity`](crate::EngineConfig::event_capacity)
    /// events; past that, new events are dropped and counted in
    /// [`NetworkStats::events_dropped`]. Drain after each mutation (or keep
    /// a [`subscribe()`](Network::subscribe) receiver busy) to see them all.
    pub fn drain_events(&self) -> Vec<NetworkEvent> {
        self.outbox.drain()
    }

    /// A receiver on the event queue, for observers on another thread.
    /// Events it reads are no longer returned by
    /// [`drain_events()`](Network::drain_events).
    pub fn subscribe(&self) -> Receiver<NetworkEvent> {
        self.outbox.subscribe()
    }

    // ── Time ───────────────────────────────────────────────────────

    /// Current simulated time in milliseconds.
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Number of queued timers and deferred tasks.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Move the clock forward by `ms`, running every task that falls due.
    pub fn advance(&mut self, ms: u64) {
        let target = self.scheduler.now().saturating_add(ms);
        while let Some(task) = self.scheduler.pop_due(target) {
            self.run_task(task);
        }
        self.scheduler.advance_to(target);
    }

    /// Run every task due now.
    pub(crate) fn settle(&mut self) {
        let now = self.scheduler.now();
        while let Some(task) = self.scheduler.pop_due(now) {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: Task) {
        self.stats.tasks_run += 1;
        match task {
            Task::CoilDelay {
                node,
                coil,
                generation,
            } => self.coil_delay_elapsed(node, coil, generation),
            Task::RelayTick { relay, generation } => self.relay_tick(relay, generation),
            Task::TransformerRefresh { node } => self.refresh_transformer(node),
            Task::RemotePeerMode { node, mode, pole } => {
                if self.nodes.contains_key(node) {
                    self.remote_peer_mode(node, mode, pole);
                } else {
                    warn!(%node, "peer mode for a removed bridge dropped");
                }
            }
            Task::RemoteRefresh { node } => self.remote_refresh(node),
        }
    }

    pub(crate) fn checked_node(&self, id: NodeId) -> Result<&Node, TopologyError> {
        self.nodes.get(id).ok_or(TopologyError::UnknownNode(id))
    }
}
