//! Canonical layouts.
//!
//! Cables are bifilar unless a layout says otherwise: both poles of side A
//! go to one contact, both poles of side B to another. Sources start
//! disabled unless a fixture says otherwise, so tests decide when current
//! starts to flow.

use interlock_core::{CableId, CableSide, CircuitPole, NodeId, RelayId};
use interlock_engine::{EngineConfig, Network, NodeSettings, RelaySettings};

/// An empty network with the default configuration.
pub fn network() -> Network {
    Network::new(EngineConfig::default()).expect("default config is valid")
}

/// Wire contact `a.1` of node `a.0` to contact `b.1` of node `b.0` on
/// both poles.
pub fn wire(net: &mut Network, a: (NodeId, usize), b: (NodeId, usize)) -> CableId {
    let cable = net.add_cable();
    for pole in CircuitPole::ALL {
        net.attach_cable(cable, CableSide::A, a.0, a.1, pole)
            .expect("side A attaches");
        net.attach_cable(cable, CableSide::B, b.0, b.1, pole)
            .expect("side B attaches");
    }
    cable
}

/// Wire contact `a.1` of node `a.0` to contact `b.1` of node `b.0` on one
/// pole only.
pub fn wire_pole(
    net: &mut Network,
    a: (NodeId, usize),
    b: (NodeId, usize),
    pole: CircuitPole,
) -> CableId {
    let cable = net.add_cable();
    net.attach_cable(cable, CableSide::A, a.0, a.1, pole)
        .expect("side A attaches");
    net.attach_cable(cable, CableSide::B, b.0, b.1, pole)
        .expect("side B attaches");
    cable
}

fn junction(net: &mut Network, name: &str) -> NodeId {
    net.add_node(
        name,
        &NodeSettings::Junction {
            disabled_contact: Some(3),
        },
    )
}

// ── Switch loop ────────────────────────────────────────────────────

/// Source → switch → lamp, returning the same way.
pub struct SwitchLoop {
    pub net: Network,
    pub source: NodeId,
    pub switch: NodeId,
    pub lamp: NodeId,
    /// Source to switch.
    pub feed: CableId,
    /// Switch to lamp.
    pub load: CableId,
}

pub fn switch_loop() -> SwitchLoop {
    let mut net = network();
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let switch = net.add_node("SW", &NodeSettings::OnOffSwitch);
    let lamp = net.add_node("L", &NodeSettings::lamp());
    let feed = wire(&mut net, (source, 0), (switch, 0));
    let load = wire(&mut net, (switch, 1), (lamp, 0));
    SwitchLoop {
        net,
        source,
        switch,
        lamp,
        feed,
        load,
    }
}

// ── Diode loop ─────────────────────────────────────────────────────

/// Source → diode (forward) → lamp, with the return bypassing the diode.
///
/// ```text
/// S ══ J0 ─(First)─ D ─(First)─ J1 ══ L
///       └──────────(Second)──────┘
/// ```
pub struct DiodeLoop {
    pub net: Network,
    pub source: NodeId,
    pub diode: NodeId,
    pub lamp: NodeId,
}

pub fn diode_loop() -> DiodeLoop {
    let mut net = network();
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let feed = junction(&mut net, "J0");
    let diode = net.add_node("D", &NodeSettings::Diode { reversed: false });
    let tail = junction(&mut net, "J1");
    let lamp = net.add_node("L", &NodeSettings::lamp());
    wire(&mut net, (source, 0), (feed, 0));
    wire_pole(&mut net, (feed, 1), (diode, 0), CircuitPole::First);
    wire_pole(&mut net, (diode, 1), (tail, 0), CircuitPole::First);
    wire(&mut net, (tail, 1), (lamp, 0));
    wire_pole(&mut net, (tail, 2), (feed, 2), CircuitPole::Second);
    DiodeLoop {
        net,
        source,
        diode,
        lamp,
    }
}

// ── Relay loop ─────────────────────────────────────────────────────

/// A source feeding, through a junction, the coil of relay `K1` and the
/// common of a `K1` contact whose up side lights a lamp.
pub struct RelayLoop {
    pub net: Network,
    pub source: NodeId,
    pub coil: NodeId,
    pub contact: NodeId,
    pub lamp: NodeId,
    pub relay: RelayId,
}

pub fn relay_loop(delay_up_s: u32, delay_down_s: u32) -> RelayLoop {
    let mut net = network();
    let relay = net
        .add_relay(RelaySettings::named("K1"))
        .expect("fresh relay name");
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let hub = junction(&mut net, "J");
    let coil = net.add_node(
        "K1-coil",
        &NodeSettings::RelayCoil {
            relay: Some("K1".into()),
            delay_up_s,
            delay_down_s,
            has_second_connector: false,
            combinator_second_coil: false,
        },
    );
    let contact = net.add_node("K1-contact", &NodeSettings::relay_contact("K1"));
    let lamp = net.add_node("L", &NodeSettings::lamp());
    wire(&mut net, (source, 0), (hub, 0));
    wire(&mut net, (hub, 1), (coil, 0));
    wire(&mut net, (hub, 2), (contact, 0));
    wire(&mut net, (contact, 1), (lamp, 0));
    RelayLoop {
        net,
        source,
        coil,
        contact,
        lamp,
        relay,
    }
}

// ── Two sources ────────────────────────────────────────────────────

/// Two sources facing each other through two switches, both on.
pub struct TwoSourceLoop {
    pub net: Network,
    pub sources: [NodeId; 2],
    pub switches: [NodeId; 2],
}

pub fn two_source_loop() -> TwoSourceLoop {
    let mut net = network();
    let s1 = net.add_node("S1", &NodeSettings::PowerSource);
    let s2 = net.add_node("S2", &NodeSettings::PowerSource);
    let sw1 = net.add_node("SW1", &NodeSettings::OnOffSwitch);
    let sw2 = net.add_node("SW2", &NodeSettings::OnOffSwitch);
    wire(&mut net, (s1, 0), (sw1, 0));
    wire(&mut net, (sw1, 1), (sw2, 1));
    wire(&mut net, (sw2, 0), (s2, 0));
    net.set_switch(sw1, true).expect("switch");
    net.set_switch(sw2, true).expect("switch");
    TwoSourceLoop {
        net,
        sources: [s1, s2],
        switches: [sw1, sw2],
    }
}

// ── Transformer ────────────────────────────────────────────────────

/// A source powering a transformer primary; the secondary lights a lamp.
pub struct TransformerLoop {
    pub net: Network,
    pub source: NodeId,
    pub transformer: NodeId,
    pub lamp: NodeId,
}

pub fn transformer_loop(code_rate: Option<u32>) -> TransformerLoop {
    let mut net = network();
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let transformer = net.add_node("T", &NodeSettings::Transformer { code_rate });
    let lamp = net.add_node("L", &NodeSettings::lamp());
    wire(&mut net, (source, 0), (transformer, 0));
    wire(&mut net, (transformer, 1), (lamp, 0));
    TransformerLoop {
        net,
        source,
        transformer,
        lamp,
    }
}

// ── Remote bridge ──────────────────────────────────────────────────

/// A source feeding bridge A; bridge B, its peer, feeds a lamp.
pub struct RemotePair {
    pub net: Network,
    pub source: NodeId,
    pub a: NodeId,
    pub b: NodeId,
    pub lamp: NodeId,
}

pub fn remote_pair() -> RemotePair {
    let mut net = network();
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let a = net.add_node("RA", &NodeSettings::RemoteBridge { is_node_a: true });
    let b = net.add_node("RB", &NodeSettings::RemoteBridge { is_node_a: false });
    let lamp = net.add_node("L", &NodeSettings::lamp());
    wire(&mut net, (source, 0), (a, 0));
    wire(&mut net, (b, 0), (lamp, 0));
    net.link_remote(a, b).expect("two bridges");
    RemotePair {
        net,
        source,
        a,
        b,
        lamp,
    }
}

// ── Ladder ─────────────────────────────────────────────────────────

/// A chain of junctions off one source, each with a switched lamp rung.
///
/// ```text
/// S ── J1 ── J2 ── … ── Jn
///      │     │          │
///      SW1   SW2        SWn
///      │     │          │
///      L1    L2         Ln
/// ```
pub struct Ladder {
    pub net: Network,
    pub source: NodeId,
    pub junctions: Vec<NodeId>,
    pub switches: Vec<NodeId>,
    pub lamps: Vec<NodeId>,
}

/// A ladder of `rungs` rungs, switches open, source enabled.
pub fn ladder(rungs: usize) -> Ladder {
    let mut net = network();
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let mut junctions = Vec::with_capacity(rungs);
    let mut switches = Vec::with_capacity(rungs);
    let mut lamps = Vec::with_capacity(rungs);
    let mut upstream = (source, 0);
    for i in 0..rungs {
        let j = junction(&mut net, &format!("J{i}"));
        let sw = net.add_node(format!("SW{i}"), &NodeSettings::OnOffSwitch);
        let lamp = net.add_node(format!("L{i}"), &NodeSettings::lamp());
        wire(&mut net, upstream, (j, 0));
        wire(&mut net, (j, 1), (sw, 0));
        wire(&mut net, (sw, 1), (lamp, 0));
        upstream = (j, 2);
        junctions.push(j);
        switches.push(sw);
        lamps.push(lamp);
    }
    net.set_source_enabled(source, true).expect("power source");
    Ladder {
        net,
        source,
        junctions,
        switches,
        lamps,
    }
}
