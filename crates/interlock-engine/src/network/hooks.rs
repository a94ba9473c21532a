//! Reactions of node variants to circuit changes.
//!
//! The tracer records a [`Touch`] for every node whose registration
//! changed and runs the hooks once the circuit is fully registered or
//! unregistered. Hooks compare against the [`NodeSnapshot`] taken before
//! the change, so they fire on transitions only.

use rand_chacha::rand_core::RngCore;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use interlock_core::{
    AnyCircuitType, CircuitId, CircuitPole, CircuitType, NodeAccounting, NodeId, RelayId,
};

use crate::events::NetworkEvent;
use crate::node::deviator::{DOWN, UP};
use crate::node::{ContactPosition, DeviatorDriver, NodeKind};
use crate::relay::Travel;
use crate::scheduler::Task;

use super::Network;

// ── Touch ──────────────────────────────────────────────────────────

/// How a circuit's registration on a node changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Added,
    Removed,
    PartiallyRemoved,
}

/// Node state before a registration change.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeSnapshot {
    /// Strongest circuit type per contact.
    pub(crate) any: SmallVec<[AnyCircuitType; 4]>,
}

impl NodeSnapshot {
    pub(crate) fn of(accounting: &NodeAccounting) -> Self {
        Self {
            any: (0..accounting.contact_count())
                .map(|c| accounting.any_circuit(c))
                .collect(),
        }
    }

    pub(crate) fn contact(&self, contact: usize) -> AnyCircuitType {
        self.any.get(contact).copied().unwrap_or(AnyCircuitType::None)
    }
}

/// A pending hook invocation.
#[derive(Clone, Debug)]
pub(crate) struct Touch {
    pub(crate) node: NodeId,
    pub(crate) circuit_type: CircuitType,
    pub(crate) phase: Phase,
    pub(crate) before: NodeSnapshot,
    pub(crate) changed: bool,
    /// Pole the circuit first entered the node on.
    pub(crate) entry_pole: Option<CircuitPole>,
}

impl Touch {
    pub(crate) fn new(
        node: NodeId,
        circuit_type: CircuitType,
        phase: Phase,
        before: NodeSnapshot,
        changed: bool,
        entry_pole: Option<CircuitPole>,
    ) -> Self {
        Self {
            node,
            circuit_type,
            phase,
            before,
            changed,
            entry_pole,
        }
    }
}

impl Network {
    pub(crate) fn entry_pole_of(&self, id: CircuitId, node: NodeId) -> Option<CircuitPole> {
        self.circuits
            .get(id)?
            .occurrences(node)
            .first()
            .map(|item| item.from_pole)
    }

    pub(crate) fn run_hooks(&mut self, touches: Vec<Touch>) {
        for touch in touches {
            trace!(
                node = %touch.node,
                circuit_type = %touch.circuit_type,
                phase = ?touch.phase,
                "node touched"
            );
            if touch.changed {
                self.outbox
                    .push(NetworkEvent::NodeCircuitsChanged { node: touch.node });
            }
            self.after_touch(&touch);
        }
    }

    fn after_touch(&mut self, touch: &Touch) {
        let Some(node) = self.nodes.get(touch.node) else {
            return;
        };
        match node.kind() {
            NodeKind::Activation(_) => self.refresh_activation(touch.node),
            NodeKind::RelayCoil(_) => self.coil_after_touch(touch),
            NodeKind::Transformer(t) => {
                let primary_closed = node.accounting().has_circuit(0, CircuitType::Closed);
                if primary_closed != t.really_enabled {
                    self.scheduler
                        .schedule(0, Task::TransformerRefresh { node: touch.node });
                }
            }
            NodeKind::RemoteBridge(_) => self.remote_after_touch(touch),
            _ => {}
        }
    }

    // ── Activation ─────────────────────────────────────────────────

    pub(crate) fn refresh_activation(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let active = node.accounting().has_circuits(CircuitType::Closed);
        let NodeKind::Activation(a) = node.kind_mut() else {
            return;
        };
        if a.active != active {
            a.active = active;
            self.outbox
                .push(NetworkEvent::ActivationChanged { node: id, active });
        }
    }

    // ── Relay coils ────────────────────────────────────────────────

    fn coil_after_touch(&mut self, touch: &Touch) {
        let Some(node) = self.nodes.get(touch.node) else {
            return;
        };
        let NodeKind::RelayCoil(coil) = node.kind() else {
            return;
        };
        let mut changes: SmallVec<[(usize, bool); 2]> = SmallVec::new();
        for contact in 0..node.accounting().contact_count() {
            let was = touch.before.contact(contact) == AnyCircuitType::Closed;
            let is = node.accounting().has_circuit(contact, CircuitType::Closed);
            if was == is {
                continue;
            }
            if let Some(winding) = coil.winding_for(contact) {
                changes.push((winding, is));
            }
        }
        for (winding, powered) in changes {
            if powered {
                self.activate_coil(touch.node, winding);
            } else {
                self.deactivate_coil(touch.node, winding);
            }
        }
    }

    pub(crate) fn activate_coil(&mut self, id: NodeId, winding: usize) {
        self.drive_coil(id, winding, true);
    }

    pub(crate) fn deactivate_coil(&mut self, id: NodeId, winding: usize) {
        self.drive_coil(id, winding, false);
    }

    fn drive_coil(&mut self, id: NodeId, winding: usize, up: bool) {
        let Some(NodeKind::RelayCoil(coil)) = self.nodes.get_mut(id).map(|n| n.kind_mut()) else {
            return;
        };
        if coil.pending(winding) == Some(up) {
            return;
        }
        coil.stop_timer(winding);
        if coil.is_up(winding) == up {
            return;
        }
        let Some(relay) = coil.relay else {
            return;
        };
        let delay_s = if up { coil.delay_up_s } else { coil.delay_down_s };
        if delay_s == 0 {
            coil.is_up[winding] = up;
            self.power_relay(relay, up, winding == 1);
        } else {
            let generation = coil.arm(winding, up);
            self.scheduler.schedule(
                u64::from(delay_s) * 1000,
                Task::CoilDelay {
                    node: id,
                    coil: winding,
                    generation,
                },
            );
        }
    }

    pub(crate) fn coil_delay_elapsed(&mut self, id: NodeId, winding: usize, generation: u64) {
        let Some(NodeKind::RelayCoil(coil)) = self.nodes.get_mut(id).map(|n| n.kind_mut()) else {
            warn!(node = %id, "coil timer for a removed node dropped");
            return;
        };
        let Some(up) = coil.fire(winding, generation) else {
            return;
        };
        if let Some(relay) = coil.relay {
            self.power_relay(relay, up, winding == 1);
        }
    }

    // ── Relays ─────────────────────────────────────────────────────

    pub(crate) fn power_relay(&mut self, id: RelayId, on: bool, second_coil: bool) {
        let Some(relay) = self.relays.get_mut(id) else {
            return;
        };
        let travel = if on {
            relay.power_on(second_coil)
        } else {
            relay.power_off(second_coil)
        };
        if let Some(travel) = travel {
            self.start_travel(id, travel);
        }
    }

    fn start_travel(&mut self, id: RelayId, travel: Travel) {
        let Some(relay) = self.relays.get_mut(id) else {
            return;
        };
        let nominal = relay.nominal_travel_ms(travel, &self.config.relay_timing);
        let uniform = (self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        let factor = (uniform * 2.0 - 1.0) * self.config.relay_timing.jitter;
        let total = f64::from(nominal) + (f64::from(nominal) * factor).round();
        let (tick_ms, generation) = relay.begin_travel(travel, total.max(1.0) as u32);
        self.scheduler
            .schedule(tick_ms, Task::RelayTick { relay: id, generation });
    }

    pub(crate) fn relay_tick(&mut self, id: RelayId, generation: u64) {
        let Some(relay) = self.relays.get_mut(id) else {
            warn!(relay = %id, "tick for a removed relay dropped");
            return;
        };
        let Some(outcome) = relay.tick(generation) else {
            return;
        };

        if let Some(state) = outcome.changed {
            debug!(relay = %id, name = relay.name(), ?state, "relay state changed");
            let contacts = relay.contacts().to_vec();
            self.outbox
                .push(NetworkEvent::RelayStateChanged { relay: id, state });
            for contact in contacts {
                self.set_relay_contact_position(contact, state.into());
            }
        }

        // Contacts may have re-powered a coil and started a new travel.
        if outcome.keep_going {
            if let Some(relay) = self.relays.get(id) {
                if relay.generation() == generation {
                    let interval = relay.tick_interval();
                    self.scheduler
                        .schedule(interval, Task::RelayTick { relay: id, generation });
                }
            }
        }
    }

    pub(crate) fn set_relay_contact_position(&mut self, id: NodeId, new: ContactPosition) {
        let Some(NodeKind::Deviator(d)) = self.nodes.get_mut(id).map(|n| n.kind_mut()) else {
            return;
        };
        if let DeviatorDriver::Relay { position, .. } = d.driver_mut() {
            *position = new;
        }
        self.refresh_deviator(id);
    }

    // ── Deviators ──────────────────────────────────────────────────

    /// Bring a deviator's contacts in line with its driver.
    pub(crate) fn refresh_deviator(&mut self, id: NodeId) {
        let Some(NodeKind::Deviator(d)) = self.nodes.get(id).map(|n| n.kind()) else {
            return;
        };
        let (up, down) = d.desired_state();
        let (up, down) = d.stored(up, down);
        if d.on == [up, down] {
            return;
        }
        self.set_contact_state(id, up, down);
    }

    fn set_contact_state(&mut self, id: NodeId, up: bool, down: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let had_circuits = node.accounting().has_any_circuits();
        let NodeKind::Deviator(d) = node.kind_mut() else {
            return;
        };
        let gained = (up && !d.on[0]) || (down && !d.on[1]);
        d.on = [up, down];

        if !up && !down {
            self.cut_circuits_at(id, None);
        } else {
            if !up {
                self.cut_circuits_at(id, Some(UP));
            }
            if !down {
                self.cut_circuits_at(id, Some(DOWN));
            }
        }
        if gained {
            self.create_from_other(id);
        }
        if had_circuits {
            self.default_reach(id);
        }
        debug!(node = %id, up, down, "contact state changed");
        self.outbox
            .push(NetworkEvent::DeviatorStateChanged { node: id, up, down });
    }

    // ── Transformers ───────────────────────────────────────────────

    /// Start or stop feeding a transformer's secondary to match its
    /// primary and enable flag.
    pub(crate) fn refresh_transformer(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            warn!(node = %id, "transformer refresh for a removed node dropped");
            return;
        };
        let primary_closed = node.accounting().has_circuit(0, CircuitType::Closed);
        let pole = if node
            .accounting()
            .has_exit_on_pole(0, CircuitPole::First, CircuitType::Closed)
        {
            CircuitPole::Second
        } else {
            CircuitPole::First
        };
        let NodeKind::Transformer(t) = node.kind_mut() else {
            return;
        };
        let feed = t.enabled && primary_closed;
        if feed == t.really_enabled {
            return;
        }
        t.really_enabled = feed;
        let code = t.code;
        debug!(node = %id, feed, "transformer secondary switched");
        if feed {
            self.seed(id, pole, 1, code);
        } else {
            self.cut_circuits_at(id, Some(1));
        }
    }
}
