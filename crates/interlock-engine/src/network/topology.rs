//! Topology editing: nodes, cables, wiring and relays.
//!
//! Edits that would strand live circuits are refused with
//! [`TopologyError::NodeEnergized`] or [`TopologyError::CableEnergized`].
//! Wiring changes do not retrace on their own; call
//! [`calculate_connections()`](Network::calculate_connections) once the
//! layout is in place.

use tracing::warn;

use interlock_core::{
    Cable, CableEnd, CableId, CableMode, CableSide, CircuitPole, NodeId, RelayId, TopologyError,
};

use crate::node::{ContactPosition, DeviatorDriver, Node, NodeKind};
use crate::relay::{Relay, RelaySettings, RelayType};
use crate::settings::NodeSettings;

use super::Network;

impl Network {
    // ── Nodes ──────────────────────────────────────────────────────

    /// Place a node built from `settings`.
    ///
    /// A relay named by the record is linked if it exists; an unknown
    /// name leaves the node unlinked. Buttons and relay contacts start in
    /// the position their driver asks for.
    pub fn add_node(&mut self, name: impl Into<String>, settings: &NodeSettings) -> NodeId {
        let id = self.nodes.insert(Node::new(name, settings.build()));
        if let Err(error) = self.link_by_name(id, settings.relay_name()) {
            warn!(node = %id, %error, "relay link skipped");
        }
        self.refresh_deviator(id);
        id
    }

    /// Take a node out of the network, releasing its cables, relay link
    /// and bridge pairing.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownNode`] for a stale id,
    /// [`TopologyError::NodeEnergized`] while it carries circuits.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, TopologyError> {
        let node = self.checked_node(id)?;
        if node.accounting().has_any_circuits() {
            return Err(TopologyError::NodeEnergized(id));
        }
        let is_coil = matches!(node.kind(), NodeKind::RelayCoil(_));
        let peer = match node.kind() {
            NodeKind::RemoteBridge(b) => b.peer,
            _ => None,
        };
        if is_coil {
            self.link_relay_coil(id, None)?;
        } else if self.is_relay_contact(id) {
            self.link_relay_contact(id, None)?;
        }
        if let Some(NodeKind::RemoteBridge(bridge)) =
            peer.and_then(|p| self.nodes.get_mut(p)).map(Node::kind_mut)
        {
            bridge.peer = None;
        }

        let mut node = self
            .nodes
            .remove(id)
            .ok_or(TopologyError::UnknownNode(id))?;
        for contact in 0..node.accounting().contact_count() {
            if let Some((cable, side)) = node.accounting_mut().detach_all(contact) {
                if let Some(cable) = self.cables.get_mut(cable) {
                    cable.set_end(side, None);
                }
            }
        }
        Ok(node)
    }

    // ── Cables ─────────────────────────────────────────────────────

    /// A new cable with both sides free.
    pub fn add_cable(&mut self) -> CableId {
        self.cables.insert(Cable::new())
    }

    /// Take a cable out of the network, freeing the contacts it held.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownCable`] for a stale id,
    /// [`TopologyError::CableEnergized`] while it carries circuits.
    pub fn remove_cable(&mut self, id: CableId) -> Result<Cable, TopologyError> {
        let cable = self.cables.get(id).ok_or(TopologyError::UnknownCable(id))?;
        if !cable.is_idle() {
            return Err(TopologyError::CableEnergized(id));
        }
        let cable = self.cables.remove(id).ok_or(TopologyError::UnknownCable(id))?;
        for side in [CableSide::A, CableSide::B] {
            let Some(end) = cable.end(side) else {
                continue;
            };
            if let Some(node) = self.nodes.get_mut(end.node) {
                let holds = node
                    .accounting()
                    .contact(end.contact)
                    .and_then(|c| c.wire())
                    == Some((id, side));
                if holds {
                    node.accounting_mut().detach_all(end.contact);
                }
            }
        }
        Ok(cable)
    }

    /// Wire `pole` of `side` of a cable to a node contact.
    ///
    /// Both poles of one side must go to the same contact.
    ///
    /// # Errors
    ///
    /// Unknown ids, [`TopologyError::CableSideOccupied`] if the side already
    /// ends elsewhere, plus whatever the contact refuses
    /// ([`TopologyError::ContactOutOfRange`],
    /// [`TopologyError::ContactOccupied`],
    /// [`TopologyError::PoleAlreadyConnected`]).
    pub fn attach_cable(
        &mut self,
        cable: CableId,
        side: CableSide,
        node: NodeId,
        contact: usize,
        pole: CircuitPole,
    ) -> Result<(), TopologyError> {
        let c = self.cables.get(cable).ok_or(TopologyError::UnknownCable(cable))?;
        let end = CableEnd { node, contact };
        if c.end(side).is_some_and(|e| e != end) {
            return Err(TopologyError::CableSideOccupied { cable, side });
        }
        let n = self
            .nodes
            .get_mut(node)
            .ok_or(TopologyError::UnknownNode(node))?;
        if n.accounting_mut().attach_cable(contact, cable, side, pole)? {
            if let Some(c) = self.cables.get_mut(cable) {
                c.set_end(side, Some(end));
            }
        }
        Ok(())
    }

    /// Unwire `pole` of `side` of a cable. Detaching a side that ends
    /// nowhere does nothing.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownCable`], [`TopologyError::CableEnergized`]
    /// while the cable carries circuits, [`TopologyError::PoleNotConnected`]
    /// if that pole is not wired.
    pub fn detach_cable(
        &mut self,
        cable: CableId,
        side: CableSide,
        pole: CircuitPole,
    ) -> Result<(), TopologyError> {
        let c = self.cables.get(cable).ok_or(TopologyError::UnknownCable(cable))?;
        if !c.is_idle() {
            return Err(TopologyError::CableEnergized(cable));
        }
        let Some(end) = c.end(side) else {
            return Ok(());
        };
        let n = self
            .nodes
            .get_mut(end.node)
            .ok_or(TopologyError::UnknownNode(end.node))?;
        if n.accounting_mut().detach_cable(end.contact, cable, pole)? {
            if let Some(c) = self.cables.get_mut(cable) {
                c.set_end(side, None);
            }
        }
        Ok(())
    }

    /// Mark a wired pole as passthrough (or back to connected).
    ///
    /// # Errors
    ///
    /// [`TopologyError::NodeEnergized`] while the node carries circuits,
    /// [`TopologyError::PoleNotConnected`] if the pole is not wired.
    pub fn set_passthrough(
        &mut self,
        node: NodeId,
        contact: usize,
        pole: CircuitPole,
        passthrough: bool,
    ) -> Result<(), TopologyError> {
        let n = self
            .nodes
            .get_mut(node)
            .ok_or(TopologyError::UnknownNode(node))?;
        if n.accounting().has_any_circuits() {
            return Err(TopologyError::NodeEnergized(node));
        }
        n.accounting_mut().set_passthrough(contact, pole, passthrough)
    }

    /// Drawing mode of a cable.
    pub fn cable_mode(&self, cable: CableId) -> Option<CableMode> {
        self.cables.get(cable).map(Cable::mode)
    }

    /// Change the drawing mode of a cable. Routing is unaffected.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownCable`] for a stale id.
    pub fn set_cable_mode(&mut self, cable: CableId, mode: CableMode) -> Result<(), TopologyError> {
        self.cables
            .get_mut(cable)
            .ok_or(TopologyError::UnknownCable(cable))?
            .set_mode(mode);
        Ok(())
    }

    // ── Relays ─────────────────────────────────────────────────────

    /// Register a relay.
    ///
    /// # Errors
    ///
    /// [`TopologyError::RelayNameTaken`] if another relay has that name.
    pub fn add_relay(&mut self, settings: RelaySettings) -> Result<RelayId, TopologyError> {
        if self.relay_names.contains_key(&settings.name) {
            return Err(TopologyError::RelayNameTaken {
                name: settings.name,
            });
        }
        let name = settings.name.clone();
        let id = self.relays.insert(Relay::new(settings));
        self.relay_names.insert(name, id);
        Ok(id)
    }

    /// Remove a relay, unlinking its coils and contacts. Linked contacts
    /// fall back to the middle position.
    ///
    /// # Errors
    ///
    /// [`TopologyError::UnknownRelay`] for a stale id,
    /// [`TopologyError::NodeEnergized`] while a linked coil carries
    /// circuits.
    pub fn remove_relay(&mut self, id: RelayId) -> Result<Relay, TopologyError> {
        let relay = self.relays.get(id).ok_or(TopologyError::UnknownRelay(id))?;
        if let Some(&coil) = relay.coils().iter().find(|&&coil| {
            self.nodes
                .get(coil)
                .is_some_and(|n| n.accounting().has_any_circuits())
        }) {
            return Err(TopologyError::NodeEnergized(coil));
        }
        let relay = self.relays.remove(id).ok_or(TopologyError::UnknownRelay(id))?;
        self.relay_names.shift_remove(relay.name());

        for &coil in relay.coils() {
            if let Some(NodeKind::RelayCoil(c)) = self.nodes.get_mut(coil).map(Node::kind_mut) {
                c.relay = None;
                c.relay_type = None;
                c.is_up = [false; 2];
                c.stop_timer(0);
                c.stop_timer(1);
            }
        }
        for &contact in relay.contacts() {
            self.unlink_contact_driver(contact);
            self.refresh_deviator(contact);
        }
        self.settle();
        Ok(relay)
    }

    /// Point a coil at `relay`, or unlink it with `None`.
    ///
    /// Windings holding the old relay up release it at once; pending
    /// delays are cancelled.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `node` is a coil,
    /// [`TopologyError::NodeEnergized`] while it carries circuits,
    /// [`TopologyError::UnknownRelay`] for a stale relay.
    pub fn link_relay_coil(
        &mut self,
        node: NodeId,
        relay: Option<RelayId>,
    ) -> Result<(), TopologyError> {
        let n = self.checked_node(node)?;
        let NodeKind::RelayCoil(coil) = n.kind() else {
            return Err(TopologyError::WrongNodeKind {
                node,
                expected: "relay coil",
            });
        };
        if n.accounting().has_any_circuits() {
            return Err(TopologyError::NodeEnergized(node));
        }
        let relay_type = match relay {
            Some(r) => Some(
                self.relays
                    .get(r)
                    .ok_or(TopologyError::UnknownRelay(r))?
                    .relay_type(),
            ),
            None => None,
        };
        let old = coil.relay;
        let held = coil.is_up;

        if let Some(old) = old {
            for (winding, up) in held.into_iter().enumerate() {
                if up {
                    self.power_relay(old, false, winding == 1);
                }
            }
            if let Some(r) = self.relays.get_mut(old) {
                r.unlink_coil(node);
            }
        }
        if let Some(NodeKind::RelayCoil(c)) = self.nodes.get_mut(node).map(Node::kind_mut) {
            c.stop_timer(0);
            c.stop_timer(1);
            c.is_up = [false; 2];
            c.relay = relay;
            c.relay_type = relay_type;
        }
        if let Some(r) = relay.and_then(|r| self.relays.get_mut(r)) {
            r.link_coil(node);
        }
        self.settle();
        Ok(())
    }

    /// Point a relay contact at `relay`, or unlink it with `None`. The
    /// contact takes the relay's current position at once.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless `node` is a relay contact,
    /// [`TopologyError::UnknownRelay`] for a stale relay.
    pub fn link_relay_contact(
        &mut self,
        node: NodeId,
        relay: Option<RelayId>,
    ) -> Result<(), TopologyError> {
        let old = match self.checked_node(node)?.kind() {
            NodeKind::Deviator(d) => match d.driver() {
                DeviatorDriver::Relay { relay, .. } => *relay,
                _ => None,
            },
            _ => None,
        };
        if !self.is_relay_contact(node) {
            return Err(TopologyError::WrongNodeKind {
                node,
                expected: "relay contact",
            });
        }
        let linked = match relay {
            Some(r) => {
                let relay = self.relays.get(r).ok_or(TopologyError::UnknownRelay(r))?;
                Some((
                    r,
                    ContactPosition::from(relay.state()),
                    relay.relay_type() == RelayType::Combinator,
                ))
            }
            None => None,
        };

        if let Some(r) = old.and_then(|old| self.relays.get_mut(old)) {
            r.unlink_contact(node);
        }
        match linked {
            Some((r, state, is_combinator)) => {
                if let Some(NodeKind::Deviator(d)) = self.nodes.get_mut(node).map(Node::kind_mut) {
                    if let DeviatorDriver::Relay {
                        relay,
                        position,
                        combinator,
                        ..
                    } = d.driver_mut()
                    {
                        *relay = Some(r);
                        *position = state;
                        *combinator = is_combinator;
                    }
                }
                if let Some(relay) = self.relays.get_mut(r) {
                    relay.link_contact(node);
                }
            }
            None => self.unlink_contact_driver(node),
        }
        self.refresh_deviator(node);
        self.settle();
        Ok(())
    }

    fn is_relay_contact(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node).map(Node::kind),
            Some(NodeKind::Deviator(d)) if matches!(d.driver(), DeviatorDriver::Relay { .. })
        )
    }

    fn unlink_contact_driver(&mut self, node: NodeId) {
        if let Some(NodeKind::Deviator(d)) = self.nodes.get_mut(node).map(Node::kind_mut) {
            if let DeviatorDriver::Relay {
                relay,
                position,
                combinator,
                ..
            } = d.driver_mut()
            {
                *relay = None;
                *position = ContactPosition::Middle;
                *combinator = false;
            }
        }
    }

    /// Link a coil or relay contact to the relay called `name`.
    pub(crate) fn link_by_name(
        &mut self,
        node: NodeId,
        name: Option<&str>,
    ) -> Result<(), TopologyError> {
        let Some(name) = name else {
            return Ok(());
        };
        let Some(relay) = self.relay_by_name(name) else {
            warn!(%node, relay = name, "no relay with that name");
            return Ok(());
        };
        if matches!(self.checked_node(node)?.kind(), NodeKind::RelayCoil(_)) {
            self.link_relay_coil(node, Some(relay))
        } else {
            self.link_relay_contact(node, Some(relay))
        }
    }

    // ── Remote bridges ─────────────────────────────────────────────

    /// Pair two remote bridges, dropping any previous pairing of either.
    ///
    /// # Errors
    ///
    /// [`TopologyError::WrongNodeKind`] unless both are bridges,
    /// [`TopologyError::NodeEnergized`] while either carries circuits.
    pub fn link_remote(&mut self, a: NodeId, b: NodeId) -> Result<(), TopologyError> {
        let mut old_peers = Vec::with_capacity(2);
        for id in [a, b] {
            let node = self.checked_node(id)?;
            let NodeKind::RemoteBridge(bridge) = node.kind() else {
                return Err(TopologyError::WrongNodeKind {
                    node: id,
                    expected: "remote bridge",
                });
            };
            if node.accounting().has_any_circuits() {
                return Err(TopologyError::NodeEnergized(id));
            }
            old_peers.extend(bridge.peer);
        }
        for old in old_peers {
            if let Some(NodeKind::RemoteBridge(bridge)) =
                self.nodes.get_mut(old).map(Node::kind_mut)
            {
                bridge.peer = None;
            }
        }
        for (id, peer) in [(a, b), (b, a)] {
            if let Some(NodeKind::RemoteBridge(bridge)) =
                self.nodes.get_mut(id).map(Node::kind_mut)
            {
                bridge.peer = Some(peer);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use interlock_core::CablePower;

    fn net() -> Network {
        Network::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn attach_records_both_ends() {
        let mut net = net();
        let s = net.add_node("S", &NodeSettings::PowerSource);
        let l = net.add_node("L", &NodeSettings::lamp());
        let c = net.add_cable();
        net.attach_cable(c, CableSide::A, s, 0, CircuitPole::First).unwrap();
        net.attach_cable(c, CableSide::A, s, 0, CircuitPole::Second).unwrap();
        net.attach_cable(c, CableSide::B, l, 0, CircuitPole::First).unwrap();
        let cable = net.cable(c).unwrap();
        assert_eq!(cable.end(CableSide::A), Some(CableEnd { node: s, contact: 0 }));
        assert_eq!(cable.end(CableSide::B), Some(CableEnd { node: l, contact: 0 }));
        assert_eq!(net.cable_power(c), Some(CablePower::NONE));
    }

    #[test]
    fn cable_side_cannot_end_on_two_contacts() {
        let mut net = net();
        let j = net.add_node("J", &NodeSettings::Junction { disabled_contact: None });
        let c = net.add_cable();
        net.attach_cable(c, CableSide::A, j, 0, CircuitPole::First).unwrap();
        match net.attach_cable(c, CableSide::A, j, 1, CircuitPole::Second) {
            Err(TopologyError::CableSideOccupied { side: CableSide::A, .. }) => {}
            other => panic!("expected CableSideOccupied, got {other:?}"),
        }
    }

    #[test]
    fn contact_out_of_range_is_reported() {
        let mut net = net();
        let l = net.add_node("L", &NodeSettings::lamp());
        let c = net.add_cable();
        match net.attach_cable(c, CableSide::A, l, 3, CircuitPole::First) {
            Err(TopologyError::ContactOutOfRange { contact: 3, count: 1 }) => {}
            other => panic!("expected ContactOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn detaching_last_pole_frees_the_side() {
        let mut net = net();
        let l = net.add_node("L", &NodeSettings::lamp());
        let c = net.add_cable();
        net.attach_cable(c, CableSide::B, l, 0, CircuitPole::First).unwrap();
        net.attach_cable(c, CableSide::B, l, 0, CircuitPole::Second).unwrap();
        net.detach_cable(c, CableSide::B, CircuitPole::First).unwrap();
        assert!(net.cable(c).unwrap().end(CableSide::B).is_some());
        net.detach_cable(c, CableSide::B, CircuitPole::Second).unwrap();
        assert!(net.cable(c).unwrap().end(CableSide::B).is_none());
        assert_eq!(net.node(l).unwrap().accounting().contact(0).unwrap().wire(), None);
    }

    #[test]
    fn removing_a_node_frees_its_cables() {
        let mut net = net();
        let l = net.add_node("L", &NodeSettings::lamp());
        let c = net.add_cable();
        net.attach_cable(c, CableSide::A, l, 0, CircuitPole::First).unwrap();
        let node = net.remove_node(l).unwrap();
        assert_eq!(node.name(), "L");
        assert!(net.cable(c).unwrap().end(CableSide::A).is_none());
        match net.remove_node(l) {
            Err(TopologyError::UnknownNode(_)) => {}
            other => panic!("expected UnknownNode, got {other:?}"),
        }
    }

    #[test]
    fn removing_a_cable_frees_its_contacts() {
        let mut net = net();
        let l = net.add_node("L", &NodeSettings::lamp());
        let c = net.add_cable();
        net.attach_cable(c, CableSide::A, l, 0, CircuitPole::First).unwrap();
        net.remove_cable(c).unwrap();
        assert_eq!(net.node(l).unwrap().accounting().contact(0).unwrap().wire(), None);
    }

    #[test]
    fn relay_names_are_unique() {
        let mut net = net();
        net.add_relay(RelaySettings::named("R1")).unwrap();
        match net.add_relay(RelaySettings::named("R1")) {
            Err(TopologyError::RelayNameTaken { name }) => assert_eq!(name, "R1"),
            other => panic!("expected RelayNameTaken, got {other:?}"),
        }
    }

    #[test]
    fn nodes_link_to_relays_by_name() {
        let mut net = net();
        let r = net.add_relay(RelaySettings::named("R1")).unwrap();
        let coil = net.add_node("K", &NodeSettings::coil("R1"));
        let contact = net.add_node("C", &NodeSettings::relay_contact("R1"));
        let orphan = net.add_node("X", &NodeSettings::coil("missing"));
        let relay = net.relay(r).unwrap();
        assert_eq!(relay.coils(), &[coil]);
        assert_eq!(relay.contacts(), &[contact]);
        match net.node(orphan).unwrap().kind() {
            NodeKind::RelayCoil(c) => assert_eq!(c.relay(), None),
            other => panic!("expected RelayCoil, got {other:?}"),
        }
    }

    #[test]
    fn linked_contact_follows_resting_relay() {
        let mut net = net();
        net.add_relay(RelaySettings::named("R1")).unwrap();
        let contact = net.add_node("C", &NodeSettings::relay_contact("R1"));
        match net.node(contact).unwrap().kind() {
            NodeKind::Deviator(d) => {
                assert!(!d.is_up_on());
                assert!(d.is_down_on());
            }
            other => panic!("expected Deviator, got {other:?}"),
        }
    }

    #[test]
    fn removing_a_relay_unlinks_its_nodes() {
        let mut net = net();
        let r = net.add_relay(RelaySettings::named("R1")).unwrap();
        let coil = net.add_node("K", &NodeSettings::coil("R1"));
        let contact = net.add_node("C", &NodeSettings::relay_contact("R1"));
        net.remove_relay(r).unwrap();
        assert_eq!(net.relay_by_name("R1"), None);
        match net.node(coil).unwrap().kind() {
            NodeKind::RelayCoil(c) => assert_eq!(c.relay(), None),
            other => panic!("expected RelayCoil, got {other:?}"),
        }
        match net.node(contact).unwrap().kind() {
            NodeKind::Deviator(d) => assert!(!d.is_up_on() && !d.is_down_on()),
            other => panic!("expected Deviator, got {other:?}"),
        }
    }

    #[test]
    fn link_remote_requires_bridges() {
        let mut net = net();
        let a = net.add_node("A", &NodeSettings::RemoteBridge { is_node_a: true });
        let b = net.add_node("B", &NodeSettings::RemoteBridge { is_node_a: false });
        let l = net.add_node("L", &NodeSettings::lamp());
        match net.link_remote(a, l) {
            Err(TopologyError::WrongNodeKind { expected: "remote bridge", .. }) => {}
            other => panic!("expected WrongNodeKind, got {other:?}"),
        }
        net.link_remote(a, b).unwrap();
        match net.node(a).unwrap().kind() {
            NodeKind::RemoteBridge(bridge) => assert_eq!(bridge.peer(), Some(b)),
            other => panic!("expected RemoteBridge, got {other:?}"),
        }
        net.remove_node(b).unwrap();
        match net.node(a).unwrap().kind() {
            NodeKind::RemoteBridge(bridge) => assert_eq!(bridge.peer(), None),
            other => panic!("expected RemoteBridge, got {other:?}"),
        }
    }
}
