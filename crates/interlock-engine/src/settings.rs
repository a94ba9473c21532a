//! Persistent per-node settings.
//!
//! [`NodeSettings`] is the record an editor stores for each node: the
//! variant plus its configuration, never its runtime state (switch
//! positions, coil timers, circuits). Relays are referenced by name so a
//! record can be written before the relay exists. Records round-trip
//! through JSON with [`to_json`](NodeSettings::to_json) and
//! [`from_json`](NodeSettings::from_json).

use serde::{Deserialize, Serialize};

use interlock_core::{CircuitFlags, NodeId, RelayId, TopologyError};

use crate::network::Network;
use crate::node::deviator::DEFAULT_BUTTON_CONTACTS;
use crate::node::transformer::code_for_rate;
use crate::node::{
    sanitize_conditions, Activation, ActivationKind, Bifilarizator, ButtonState,
    ContactPosition, Deviator, DeviatorDriver, Diode, Junction, LeverCondition, LeverRange,
    NodeKind, OnOffSwitch, PolarityInversion, PowerSource, RelayCoil, RemoteBridge, Resistor,
    Transformer,
};

fn yes() -> bool {
    true
}

fn default_button_contacts() -> [[bool; 2]; 3] {
    DEFAULT_BUTTON_CONTACTS
}

// ── NodeSettings ───────────────────────────────────────────────────

/// Configuration record of one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSettings {
    /// Battery / feeder.
    PowerSource,
    /// Four-way star point.
    Junction {
        /// Contact taken out of service.
        #[serde(default)]
        disabled_contact: Option<usize>,
    },
    /// Manual on/off switch.
    OnOffSwitch,
    /// One-way valve.
    Diode {
        /// Conducts from contact 1 to contact 0 instead.
        #[serde(default)]
        reversed: bool,
    },
    /// Series resistor.
    Resistor,
    /// Pole swap.
    PolarityInversion,
    /// Lamp, sound or electromagnet.
    Activation {
        /// What it drives.
        #[serde(default)]
        kind: ActivationKind,
    },
    /// Unifilar-to-bifilar adapter.
    Bifilarizator,
    /// Relay coil.
    RelayCoil {
        /// Name of the driven relay.
        #[serde(default)]
        relay: Option<String>,
        /// Pickup delay in seconds.
        #[serde(default)]
        delay_up_s: u32,
        /// Drop delay in seconds.
        #[serde(default)]
        delay_down_s: u32,
        /// Contact 1 is a second winding.
        #[serde(default)]
        has_second_connector: bool,
        /// Which winding a combinator coil drives.
        #[serde(default)]
        combinator_second_coil: bool,
    },
    /// Contact moved by a relay.
    RelayContact {
        /// Name of the relay.
        #[serde(default)]
        relay: Option<String>,
        /// Exchange up and down.
        #[serde(default)]
        swap_state: bool,
        /// Up contact wired through the central connector.
        #[serde(default = "yes")]
        has_central_connector: bool,
        /// Keep one side closed while a combinator armature travels.
        #[serde(default)]
        active_while_middle: bool,
    },
    /// Contact moved by a lever.
    LeverContact {
        /// Range of the lever.
        #[serde(default)]
        range: LeverRange,
        /// Positions that close the down contact.
        #[serde(default)]
        conditions: Vec<LeverCondition>,
        /// Exchange up and down.
        #[serde(default)]
        swap_state: bool,
        /// Up contact wired through the central connector.
        #[serde(default = "yes")]
        has_central_connector: bool,
    },
    /// Push button.
    Button {
        /// `[straight, central]` per state: normal, pressed, extracted.
        #[serde(default = "default_button_contacts")]
        contacts: [[bool; 2]; 3],
        /// Exchange up and down.
        #[serde(default)]
        swap_state: bool,
        /// Up contact wired through the central connector.
        #[serde(default = "yes")]
        has_central_connector: bool,
    },
    /// Coded-current transformer.
    Transformer {
        /// Code rate in pulses per minute (75, 120, 180 or 270).
        #[serde(default)]
        code_rate: Option<u32>,
    },
    /// One end of a remote bridge pair.
    RemoteBridge {
        /// Whether this is the A end.
        #[serde(default = "yes")]
        is_node_a: bool,
    },
}

impl NodeSettings {
    /// A lamp.
    pub fn lamp() -> Self {
        NodeSettings::Activation {
            kind: ActivationKind::Lamp,
        }
    }

    /// A coil driving `relay` without delays.
    pub fn coil(relay: impl Into<String>) -> Self {
        NodeSettings::RelayCoil {
            relay: Some(relay.into()),
            delay_up_s: 0,
            delay_down_s: 0,
            has_second_connector: false,
            combinator_second_coil: false,
        }
    }

    /// A plain contact of `relay`.
    pub fn relay_contact(relay: impl Into<String>) -> Self {
        NodeSettings::RelayContact {
            relay: Some(relay.into()),
            swap_state: false,
            has_central_connector: true,
            active_while_middle: false,
        }
    }

    /// JSON text of this record.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a record from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] on malformed input or an unknown
    /// `type` tag.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Name of the variant this record builds, as reported by
    /// [`NodeKind::name`].
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeSettings::PowerSource => "power source",
            NodeSettings::Junction { .. } => "junction",
            NodeSettings::OnOffSwitch => "on/off switch",
            NodeSettings::Diode { .. } => "diode",
            NodeSettings::Resistor => "resistor",
            NodeSettings::PolarityInversion => "polarity inversion",
            NodeSettings::Activation { .. } => "activation",
            NodeSettings::Bifilarizator => "bifilarizator",
            NodeSettings::RelayCoil { .. } => "relay coil",
            NodeSettings::RelayContact { .. }
            | NodeSettings::LeverContact { .. }
            | NodeSettings::Button { .. } => "deviator",
            NodeSettings::Transformer { .. } => "transformer",
            NodeSettings::RemoteBridge { .. } => "remote bridge",
        }
    }

    /// Relay name this record links to, if any.
    pub fn relay_name(&self) -> Option<&str> {
        match self {
            NodeSettings::RelayCoil { relay, .. } | NodeSettings::RelayContact { relay, .. } => {
                relay.as_deref()
            }
            _ => None,
        }
    }

    /// A fresh, unlinked variant in its rest state.
    pub(crate) fn build(&self) -> NodeKind {
        match self {
            NodeSettings::PowerSource => NodeKind::PowerSource(PowerSource::default()),
            NodeSettings::Junction { disabled_contact } => {
                NodeKind::Junction(Junction::with_disabled(*disabled_contact))
            }
            NodeSettings::OnOffSwitch => NodeKind::OnOffSwitch(OnOffSwitch::default()),
            NodeSettings::Diode { reversed } => NodeKind::Diode(Diode {
                reversed: *reversed,
            }),
            NodeSettings::Resistor => NodeKind::Resistor(Resistor),
            NodeSettings::PolarityInversion => NodeKind::PolarityInversion(PolarityInversion),
            NodeSettings::Activation { kind } => NodeKind::Activation(Activation::new(*kind)),
            NodeSettings::Bifilarizator => NodeKind::Bifilarizator(Bifilarizator),
            NodeSettings::RelayCoil {
                delay_up_s,
                delay_down_s,
                has_second_connector,
                combinator_second_coil,
                ..
            } => NodeKind::RelayCoil(RelayCoil::new(
                *delay_up_s,
                *delay_down_s,
                *has_second_connector,
                *combinator_second_coil,
            )),
            NodeSettings::RelayContact {
                swap_state,
                has_central_connector,
                active_while_middle,
                ..
            } => NodeKind::Deviator(Deviator::new(
                DeviatorDriver::Relay {
                    relay: None,
                    position: ContactPosition::Middle,
                    active_while_middle: *active_while_middle,
                    combinator: false,
                },
                *swap_state,
                *has_central_connector,
            )),
            NodeSettings::LeverContact {
                range,
                conditions,
                swap_state,
                has_central_connector,
            } => NodeKind::Deviator(Deviator::new(
                DeviatorDriver::Lever {
                    position: None,
                    range: *range,
                    conditions: sanitize_conditions(conditions, *range),
                },
                *swap_state,
                *has_central_connector,
            )),
            NodeSettings::Button {
                contacts,
                swap_state,
                has_central_connector,
            } => NodeKind::Deviator(Deviator::new(
                DeviatorDriver::Button {
                    state: ButtonState::Normal,
                    contacts: *contacts,
                },
                *swap_state,
                *has_central_connector,
            )),
            NodeSettings::Transformer { code_rate } => NodeKind::Transformer(Transformer::new(
                (*code_rate)
                    .and_then(code_for_rate)
                    .unwrap_or(CircuitFlags::NONE),
            )),
            NodeSettings::RemoteBridge { is_node_a } => {
                NodeKind::RemoteBridge(RemoteBridge::new(*is_node_a))
            }
        }
    }
}

// ── SettingsError ──────────────────────────────────────────────────

/// Errors from reading or applying a settings record.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The record is not valid JSON for [`NodeSettings`].
    #[error("invalid settings record: {0}")]
    Json(#[from] serde_json::Error),
    /// The record describes a different variant than the node.
    #[error("node {node} is a {found}, record describes a {expected}")]
    KindMismatch {
        /// Node addressed.
        node: NodeId,
        /// Variant of the record.
        expected: &'static str,
        /// Variant of the node.
        found: &'static str,
    },
    /// The node could not be updated.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

// ── Network integration ────────────────────────────────────────────

impl Network {
    /// The settings record of a node.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownNode`] for a stale id.
    pub fn node_settings(&self, id: NodeId) -> Result<NodeSettings, TopologyError> {
        let node = self.checked_node(id)?;
        let relay_name = |relay: Option<RelayId>| {
            relay
                .and_then(|r| self.relays.get(r))
                .map(|r| r.name().to_owned())
        };
        Ok(match node.kind() {
            NodeKind::PowerSource(_) => NodeSettings::PowerSource,
            NodeKind::Junction(j) => NodeSettings::Junction {
                disabled_contact: j.disabled_contact(),
            },
            NodeKind::OnOffSwitch(_) => NodeSettings::OnOffSwitch,
            NodeKind::Diode(d) => NodeSettings::Diode {
                reversed: d.is_reversed(),
            },
            NodeKind::Resistor(_) => NodeSettings::Resistor,
            NodeKind::PolarityInversion(_) => NodeSettings::PolarityInversion,
            NodeKind::Activation(a) => NodeSettings::Activation { kind: a.kind() },
            NodeKind::Bifilarizator(_) => NodeSettings::Bifilarizator,
            NodeKind::RelayCoil(c) => NodeSettings::RelayCoil {
                relay: relay_name(c.relay()),
                delay_up_s: c.delay_up_s(),
                delay_down_s: c.delay_down_s(),
                has_second_connector: c.has_second_connector(),
                combinator_second_coil: c.combinator_second_coil,
            },
            NodeKind::Deviator(d) => match d.driver() {
                DeviatorDriver::Relay {
                    relay,
                    active_while_middle,
                    ..
                } => NodeSettings::RelayContact {
                    relay: relay_name(*relay),
                    swap_state: d.swaps_state(),
                    has_central_connector: d.has_central_connector(),
                    active_while_middle: *active_while_middle,
                },
                DeviatorDriver::Lever {
                    range, conditions, ..
                } => NodeSettings::LeverContact {
                    range: *range,
                    conditions: conditions.clone(),
                    swap_state: d.swaps_state(),
                    has_central_connector: d.has_central_connector(),
                },
                DeviatorDriver::Button { contacts, .. } => NodeSettings::Button {
                    contacts: *contacts,
                    swap_state: d.swaps_state(),
                    has_central_connector: d.has_central_connector(),
                },
            },
            NodeKind::Transformer(t) => NodeSettings::Transformer {
                code_rate: t.code().code_rate(),
            },
            NodeKind::RemoteBridge(b) => NodeSettings::RemoteBridge {
                is_node_a: b.is_node_a(),
            },
        })
    }

    /// Reconfigure a node from a record of the same variant.
    ///
    /// Runtime state (switch position, source enable, lever position,
    /// button state, bridge pairing) is kept. The node must not carry
    /// circuits.
    ///
    /// # Errors
    ///
    /// [`SettingsError::KindMismatch`] if the record describes another
    /// variant, [`SettingsError::Topology`] if the node is unknown or
    /// energized.
    pub fn apply_settings(
        &mut self,
        id: NodeId,
        settings: &NodeSettings,
    ) -> Result<(), SettingsError> {
        let node = self.checked_node(id)?;
        let found = node.kind().name();
        let same_driver = match (node.kind(), settings) {
            (NodeKind::Deviator(d), _) => matches!(
                (d.driver(), settings),
                (DeviatorDriver::Relay { .. }, NodeSettings::RelayContact { .. })
                    | (DeviatorDriver::Lever { .. }, NodeSettings::LeverContact { .. })
                    | (DeviatorDriver::Button { .. }, NodeSettings::Button { .. })
            ),
            _ => true,
        };
        if found != settings.kind_name() || !same_driver {
            return Err(SettingsError::KindMismatch {
                node: id,
                expected: settings.kind_name(),
                found,
            });
        }
        if node.accounting().has_any_circuits() {
            return Err(TopologyError::NodeEnergized(id).into());
        }

        // Unlink before replacing so the relay forgets this node.
        match settings {
            NodeSettings::RelayCoil { .. } => self.link_relay_coil(id, None)?,
            NodeSettings::RelayContact { .. } => self.link_relay_contact(id, None)?,
            _ => {}
        }

        let mut kind = settings.build();
        let Some(node) = self.nodes.get_mut(id) else {
            return Err(TopologyError::UnknownNode(id).into());
        };
        carry_runtime_state(node.kind(), &mut kind);
        *node.kind_mut() = kind;

        self.link_by_name(id, settings.relay_name())?;
        self.refresh_deviator(id);
        self.settle();
        Ok(())
    }
}

/// Copy runtime state from the variant being replaced.
fn carry_runtime_state(old: &NodeKind, new: &mut NodeKind) {
    match (old, new) {
        (NodeKind::PowerSource(o), NodeKind::PowerSource(n)) => n.enabled = o.enabled,
        (NodeKind::OnOffSwitch(o), NodeKind::OnOffSwitch(n)) => n.on = o.on,
        (NodeKind::Activation(o), NodeKind::Activation(n)) => n.active = o.active,
        (NodeKind::Transformer(o), NodeKind::Transformer(n)) => n.enabled = o.enabled,
        (NodeKind::RemoteBridge(o), NodeKind::RemoteBridge(n)) => {
            n.peer = o.peer;
            n.enabled = o.enabled;
            n.last_peer_mode = o.last_peer_mode;
            n.recv_pole = o.recv_pole;
        }
        (NodeKind::Deviator(o), NodeKind::Deviator(n)) => {
            n.on = o.on;
            match (&o.driver, &mut n.driver) {
                (
                    DeviatorDriver::Lever { position: op, .. },
                    DeviatorDriver::Lever { position: np, .. },
                ) => *np = *op,
                (
                    DeviatorDriver::Button { state: os, .. },
                    DeviatorDriver::Button { state: ns, .. },
                ) => *ns = *os,
                _ => {}
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_round_trip_through_json() {
        let records = vec![
            NodeSettings::PowerSource,
            NodeSettings::Junction {
                disabled_contact: Some(3),
            },
            NodeSettings::coil("R1"),
            NodeSettings::LeverContact {
                range: LeverRange::default(),
                conditions: vec![LeverCondition::Exact { position: 4 }],
                swap_state: true,
                has_central_connector: false,
            },
            NodeSettings::Transformer {
                code_rate: Some(180),
            },
        ];
        for record in records {
            let text = record.to_json().unwrap();
            assert_eq!(NodeSettings::from_json(&text).unwrap(), record);
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s = NodeSettings::from_json(r#"{"type":"relay_contact","relay":"R2"}"#).unwrap();
        assert_eq!(s, NodeSettings::relay_contact("R2"));
        let s = NodeSettings::from_json(r#"{"type":"button"}"#).unwrap();
        match s {
            NodeSettings::Button {
                contacts,
                has_central_connector: true,
                ..
            } => assert_eq!(contacts, DEFAULT_BUTTON_CONTACTS),
            other => panic!("expected Button, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_a_json_error() {
        match NodeSettings::from_json(r#"{"type":"capacitor"}"#) {
            Err(SettingsError::Json(_)) => {}
            other => panic!("expected Json error, got {other:?}"),
        }
    }

    #[test]
    fn kind_names_match_built_variants() {
        for record in [
            NodeSettings::lamp(),
            NodeSettings::relay_contact("R"),
            NodeSettings::RemoteBridge { is_node_a: false },
            NodeSettings::Diode { reversed: true },
        ] {
            assert_eq!(record.kind_name(), record.build().name());
        }
    }
}
