//! Operator controls: sources, switches, diodes, levers and buttons.
//!
//! Each control changes one node's state, runs the tracer on that node
//! only, and settles the zero-delay tasks it queued.

use tracing::{debug, info};

use interlock_core::{CircuitFlags, CircuitPole, NodeId, TopologyError};

use crate::events::NetworkEvent;
use crate::node::{sanitize_conditions, ButtonState, DeviatorDriver, LeverCondition, NodeKind};

use super::Network;

impl Network {
    // ── Sources ────────────────────────────────────────────────────

    /// Switch a power source, transformer or remote bridge on or off.
    ///
    /// Enabling a power source seeds its circuits; disabling it drops
    /// them. A transformer feeds its secondary only while enabled and
    /// powered on its primary. A bridge joins the handshake with its peer.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] for any other variant.
    pub fn set_source_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), TopologyError> {
        let changed = match self
            .nodes
            .get_mut(id)
            .ok_or(TopologyError::UnknownNode(id))?
            .kind_mut()
        {
            NodeKind::PowerSource(s) => {
                let changed = s.enabled != enabled;
                s.enabled = enabled;
                if changed {
                    if enabled {
                        self.seed(id, CircuitPole::First, 0, CircuitFlags::NONE);
                    } else {
                        self.cut_circuits_at(id, None);
                    }
                }
                changed
            }
            NodeKind::Transformer(t) => {
                let changed = t.enabled != enabled;
                t.enabled = enabled;
                if changed {
                    self.refresh_transformer(id);
                }
                changed
            }
            NodeKind::RemoteBridge(_) => self.set_remote_enabled(id, enabled),
            _ => {
                return Err(TopologyError::WrongNodeKind {
                    node: id,
                    expected: "power source",
                })
            }
        };
        if changed {
            debug!(node = %id, enabled, "source switched");
            self.outbox
                .push(NetworkEvent::SourceEnabledChanged { node: id, enabled });
        }
        self.settle();
        Ok(())
    }

    // ── Two-contact parts ──────────────────────────────────────────

    /// Close or open an on/off switch.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `id` is a switch.
    pub fn set_switch(&mut self, id: NodeId, on: bool) -> Result<(), TopologyError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(TopologyError::UnknownNode(id))?;
        let NodeKind::OnOffSwitch(switch) = node.kind_mut() else {
            return Err(TopologyError::WrongNodeKind {
                node: id,
                expected: "on/off switch",
            });
        };
        if switch.on == on {
            return Ok(());
        }
        switch.on = on;
        if on {
            self.create_from_other(id);
        } else {
            self.cut_circuits_at(id, None);
            self.default_reach(id);
        }
        self.settle();
        Ok(())
    }

    /// Flip a diode's conducting direction in place.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `id` is a diode.
    pub fn set_diode_reversed(&mut self, id: NodeId, reversed: bool) -> Result<(), TopologyError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(TopologyError::UnknownNode(id))?;
        let NodeKind::Diode(diode) = node.kind_mut() else {
            return Err(TopologyError::WrongNodeKind {
                node: id,
                expected: "diode",
            });
        };
        if diode.reversed == reversed {
            return Ok(());
        }
        diode.reversed = reversed;
        self.cut_circuits_at(id, None);
        self.create_from_other(id);
        self.default_reach(id);
        self.settle();
        Ok(())
    }

    // ── Deviators ──────────────────────────────────────────────────

    /// Press, release or pull out a button.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `id` is a button.
    pub fn set_button(&mut self, id: NodeId, new: ButtonState) -> Result<(), TopologyError> {
        match self.driver_mut(id, "button")? {
            DeviatorDriver::Button { state, .. } => *state = new,
            _ => {
                return Err(TopologyError::WrongNodeKind {
                    node: id,
                    expected: "button",
                })
            }
        }
        self.refresh_deviator(id);
        self.settle();
        Ok(())
    }

    /// Move a lever contact's lever. `None` disconnects the lever and
    /// opens both contacts; positions are clamped into the lever range.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `id` is a lever contact.
    pub fn set_lever_position(
        &mut self,
        id: NodeId,
        new: Option<i32>,
    ) -> Result<(), TopologyError> {
        match self.driver_mut(id, "lever contact")? {
            DeviatorDriver::Lever {
                position, range, ..
            } => *position = new.map(|p| p.clamp(range.min, range.max.max(range.min))),
            _ => {
                return Err(TopologyError::WrongNodeKind {
                    node: id,
                    expected: "lever contact",
                })
            }
        }
        self.refresh_deviator(id);
        self.settle();
        Ok(())
    }

    /// Replace a lever contact's conditions. They are sanitized against
    /// the lever range first.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `id` is a lever contact.
    pub fn set_lever_conditions(
        &mut self,
        id: NodeId,
        new: &[LeverCondition],
    ) -> Result<(), TopologyError> {
        match self.driver_mut(id, "lever contact")? {
            DeviatorDriver::Lever {
                range, conditions, ..
            } => *conditions = sanitize_conditions(new, *range),
            _ => {
                return Err(TopologyError::WrongNodeKind {
                    node: id,
                    expected: "lever contact",
                })
            }
        }
        self.refresh_deviator(id);
        self.settle();
        Ok(())
    }

    fn driver_mut(
        &mut self,
        id: NodeId,
        expected: &'static str,
    ) -> Result<&mut DeviatorDriver, TopologyError> {
        match self
            .nodes
            .get_mut(id)
            .ok_or(TopologyError::UnknownNode(id))?
            .kind_mut()
        {
            NodeKind::Deviator(d) => Ok(d.driver_mut()),
            _ => Err(TopologyError::WrongNodeKind { node: id, expected }),
        }
    }

    // ── Tracer entry points ────────────────────────────────────────

    /// Seed every circuit fed by an enabled power source.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `id` is a power source.
    pub fn create_circuits_from_power_node(&mut self, id: NodeId) -> Result<(), TopologyError> {
        match self.checked_node(id)?.kind() {
            NodeKind::PowerSource(s) if s.is_enabled() => {
                self.seed(id, CircuitPole::First, 0, CircuitFlags::NONE);
            }
            NodeKind::PowerSource(_) => {}
            _ => {
                return Err(TopologyError::WrongNodeKind {
                    node: id,
                    expected: "power source",
                })
            }
        }
        self.settle();
        Ok(())
    }

    /// Extend open circuits through `id` along connections its current
    /// state allows.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownNode`] for a stale id.
    pub fn create_circuits_from_other_node(&mut self, id: NodeId) -> Result<(), TopologyError> {
        self.checked_node(id)?;
        self.create_from_other(id);
        self.settle();
        Ok(())
    }

    /// Feed unpowered contacts of `id` from neighbouring live circuits.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownNode`] for a stale id.
    pub fn default_reach_next_open_circuit(&mut self, id: NodeId) -> Result<(), TopologyError> {
        self.checked_node(id)?;
        self.default_reach(id);
        self.settle();
        Ok(())
    }

    /// Recompute every circuit from scratch: drop what each enabled power
    /// source feeds, then seed them again in node order.
    pub fn calculate_connections(&mut self) {
        let sources: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind(), NodeKind::PowerSource(s) if s.is_enabled()))
            .map(|(id, _)| id)
            .collect();
        for &source in &sources {
            self.cut_circuits_at(source, None);
        }
        self.settle();
        for &source in &sources {
            self.seed(source, CircuitPole::First, 0, CircuitFlags::NONE);
        }
        self.settle();
        info!(
            sources = sources.len(),
            circuits = self.circuits().count(),
            "connections recalculated"
        );
    }
}
