//! Integration test: the four reference layouts.
//!
//! Each scenario wires a small network, drives it through the public
//! controls and checks both what an operator would see (lamps, relay
//! state, circuit counts) and that the per-node and per-cable bookkeeping
//! still agrees with the circuits after every step.

use interlock_core::{CircuitPole, CircuitType, Item, NodeId};
use interlock_engine::{Network, RelayState};
use interlock_test_utils::{
    assert_consistent, diode_loop, relay_loop, switch_loop, two_source_loop, DiodeLoop, RelayLoop,
    SwitchLoop, TwoSourceLoop,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn lamp_entrances(net: &Network, lamp: NodeId) -> u16 {
    let Some(contact) = net.node(lamp).and_then(|n| n.accounting().contact(0)) else {
        return 0;
    };
    CircuitPole::ALL
        .iter()
        .map(|&pole| contact.entrance_count(CircuitType::Closed, pole))
        .sum()
}

fn last_node_of_open(net: &Network) -> Vec<String> {
    net.circuits()
        .filter(|(_, c)| c.circuit_type() == CircuitType::Open)
        .filter_map(|(_, c)| {
            c.items().iter().rev().find_map(|item| match item {
                Item::Node(n) => net.node(n.node).map(|node| node.name().to_owned()),
                Item::Cable(_) => None,
            })
        })
        .collect()
}

// ── Switch loop ────────────────────────────────────────────────────

#[test]
fn switch_loop_closes_only_when_switched_on() {
    init_tracing();
    let SwitchLoop {
        mut net,
        source,
        switch,
        lamp,
        load,
        ..
    } = switch_loop();

    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    let stats = net.stats();
    assert_eq!(stats.closed_circuits, 0);
    assert_eq!(stats.open_circuits, 1);
    assert_eq!(last_node_of_open(&net), vec!["SW".to_owned()]);
    assert!(!net.is_active(lamp));
    assert_eq!(lamp_entrances(&net, lamp), 0);

    net.set_switch(switch, true).unwrap();
    assert_consistent(&net);
    let stats = net.stats();
    assert_eq!(stats.closed_circuits, 1);
    assert_eq!(stats.open_circuits, 0);
    assert!(net.is_active(lamp));
    assert_eq!(lamp_entrances(&net, lamp), 1);
    assert!(net.cable_power(load).unwrap().is_closed());

    net.set_switch(switch, false).unwrap();
    assert_consistent(&net);
    let stats = net.stats();
    assert_eq!(stats.closed_circuits, 0);
    assert_eq!(stats.open_circuits, 1);
    assert!(!net.is_active(lamp));
    assert_eq!(lamp_entrances(&net, lamp), 0);
    assert!(!net.cable_power(load).unwrap().is_closed());
}

#[test]
fn disabling_the_source_clears_every_circuit() {
    let SwitchLoop {
        mut net,
        source,
        switch,
        lamp,
        ..
    } = switch_loop();
    net.set_switch(switch, true).unwrap();
    net.set_source_enabled(source, true).unwrap();
    assert!(net.is_active(lamp));

    net.set_source_enabled(source, false).unwrap();
    assert_consistent(&net);
    assert_eq!(net.circuits().count(), 0);
    assert!(!net.is_active(lamp));
}

// ── Diode loop ─────────────────────────────────────────────────────

#[test]
fn diode_blocks_the_return_when_reversed() {
    let DiodeLoop {
        mut net,
        source,
        diode,
        lamp,
    } = diode_loop();

    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 1);
    assert!(net.is_active(lamp));
    assert_eq!(lamp_entrances(&net, lamp), 1);

    net.set_diode_reversed(diode, true).unwrap();
    assert_consistent(&net);
    let stats = net.stats();
    assert_eq!(stats.closed_circuits, 0);
    assert_eq!(stats.open_circuits, 1);
    assert_eq!(last_node_of_open(&net), vec!["D".to_owned()]);
    assert!(!net.is_active(lamp));
    assert_eq!(lamp_entrances(&net, lamp), 0);

    net.set_diode_reversed(diode, false).unwrap();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 1);
    assert!(net.is_active(lamp));
}

#[test]
fn reversed_diode_rejects_a_fresh_seed() {
    let DiodeLoop {
        mut net,
        source,
        diode,
        lamp,
    } = diode_loop();
    net.set_diode_reversed(diode, true).unwrap();
    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 0);
    assert!(net.stats().open_circuits > 0);
    assert!(!net.is_active(lamp));

    net.set_source_enabled(source, false).unwrap();
    net.set_diode_reversed(diode, false).unwrap();
    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 1);
    assert!(net.is_active(lamp));
}

// ── Two sources ────────────────────────────────────────────────────

#[test]
fn facing_sources_never_close_through_each_other() {
    let TwoSourceLoop {
        mut net, sources, ..
    } = two_source_loop();

    net.set_source_enabled(sources[0], true).unwrap();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 0);

    net.set_source_enabled(sources[1], true).unwrap();
    assert_consistent(&net);
    let stats = net.stats();
    assert_eq!(stats.closed_circuits, 0);
    assert!(stats.foreign_source_rejections > 0);

    net.calculate_connections();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 0);
}

// ── Relay loop ─────────────────────────────────────────────────────

#[test]
fn relay_picks_up_after_its_coil_delay() {
    init_tracing();
    let RelayLoop {
        mut net,
        source,
        lamp,
        relay,
        ..
    } = relay_loop(5, 0);

    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    assert_eq!(net.stats().closed_circuits, 1);
    assert_eq!(net.relay(relay).unwrap().state(), RelayState::Down);
    assert!(!net.relay(relay).unwrap().is_moving());
    assert!(!net.is_active(lamp));

    net.advance(4_999);
    assert_eq!(net.relay(relay).unwrap().state(), RelayState::Down);
    assert!(!net.relay(relay).unwrap().is_moving());

    net.advance(1);
    assert!(net.relay(relay).unwrap().is_moving());

    net.advance(2_000);
    assert_consistent(&net);
    let k1 = net.relay(relay).unwrap();
    assert_eq!(k1.state(), RelayState::Up);
    assert!(!k1.is_moving());
    assert!(net.is_active(lamp));
    assert_eq!(net.stats().closed_circuits, 2);
}

#[test]
fn relay_drops_when_its_feed_goes_away() {
    let RelayLoop {
        mut net,
        source,
        lamp,
        relay,
        ..
    } = relay_loop(0, 0);
    net.set_source_enabled(source, true).unwrap();
    net.advance(2_000);
    assert_eq!(net.relay(relay).unwrap().state(), RelayState::Up);
    assert!(net.is_active(lamp));

    net.set_source_enabled(source, false).unwrap();
    assert!(!net.is_active(lamp));
    net.advance(2_000);
    assert_consistent(&net);
    assert_eq!(net.relay(relay).unwrap().state(), RelayState::Down);
    assert_eq!(net.circuits().count(), 0);
    assert_eq!(net.pending_tasks(), 0);
}
