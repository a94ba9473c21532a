//! Integration test: editing a live layout and observing it.
//!
//! Covers the settings records an editor stores per node, the guards that
//! stop wiring edits from tearing through live circuits, and the event
//! stream observers read after each mutation.

use interlock_core::{CableSide, CircuitPole, TopologyError};
use interlock_engine::{
    EngineConfig, Network, NetworkEvent, NodeSettings, RelaySettings, RelayState, SettingsError,
};
use interlock_test_utils::{
    assert_consistent, diode_loop, relay_loop, switch_loop, wire, DiodeLoop, RelayLoop, SwitchLoop,
};

// ── Settings ───────────────────────────────────────────────────────

#[test]
fn stored_records_round_trip_through_json() {
    let RelayLoop { net, .. } = relay_loop(2, 1);
    for (id, node) in net.nodes() {
        let record = net.node_settings(id).unwrap();
        let text = record.to_json().unwrap();
        let back = NodeSettings::from_json(&text).unwrap();
        assert_eq!(back, record, "record of {}", node.name());
        assert_eq!(record.kind_name(), node.kind().name());
    }
}

#[test]
fn coil_record_keeps_its_relay_name() {
    let RelayLoop { net, coil, .. } = relay_loop(2, 1);
    match net.node_settings(coil).unwrap() {
        NodeSettings::RelayCoil {
            relay,
            delay_up_s,
            delay_down_s,
            ..
        } => {
            assert_eq!(relay.as_deref(), Some("K1"));
            assert_eq!((delay_up_s, delay_down_s), (2, 1));
        }
        other => panic!("expected RelayCoil, got {other:?}"),
    }
}

#[test]
fn applied_record_changes_conduction() {
    let DiodeLoop {
        mut net,
        source,
        diode,
        lamp,
    } = diode_loop();
    let record = NodeSettings::from_json(r#"{"type":"diode","reversed":true}"#).unwrap();
    net.apply_settings(diode, &record).unwrap();
    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    assert!(!net.is_active(lamp));
    assert_eq!(net.node_settings(diode).unwrap(), record);
}

#[test]
fn applying_to_a_live_node_is_refused() {
    let DiodeLoop {
        mut net,
        source,
        diode,
        ..
    } = diode_loop();
    net.set_source_enabled(source, true).unwrap();
    match net.apply_settings(diode, &NodeSettings::Diode { reversed: true }) {
        Err(SettingsError::Topology(TopologyError::NodeEnergized(n))) if n == diode => {}
        other => panic!("expected NodeEnergized, got {other:?}"),
    }
    match net.apply_settings(diode, &NodeSettings::lamp()) {
        Err(SettingsError::KindMismatch { found: "diode", .. }) => {}
        other => panic!("expected KindMismatch, got {other:?}"),
    }
    assert_consistent(&net);
}

#[test]
fn coil_relinks_by_name() {
    let RelayLoop {
        mut net,
        source,
        coil,
        lamp,
        relay,
        ..
    } = relay_loop(0, 0);
    let k2 = net.add_relay(RelaySettings::named("K2")).unwrap();
    net.apply_settings(coil, &NodeSettings::coil("K2")).unwrap();
    assert!(net.relay(relay).unwrap().coils().is_empty());
    assert_eq!(net.relay(k2).unwrap().coils(), &[coil]);

    net.set_source_enabled(source, true).unwrap();
    net.advance(2_000);
    assert_consistent(&net);
    assert_eq!(net.relay(k2).unwrap().state(), RelayState::Up);
    assert_eq!(net.relay(relay).unwrap().state(), RelayState::Down);
    assert!(!net.is_active(lamp));
}

#[test]
fn malformed_record_is_a_json_error() {
    match NodeSettings::from_json(r#"{"type":"flux_capacitor"}"#) {
        Err(SettingsError::Json(_)) => {}
        other => panic!("expected Json error, got {other:?}"),
    }
}

// ── Wiring guards ──────────────────────────────────────────────────

#[test]
fn live_wiring_cannot_be_pulled() {
    let SwitchLoop {
        mut net,
        source,
        switch,
        lamp,
        load,
        ..
    } = switch_loop();
    net.set_switch(switch, true).unwrap();
    net.set_source_enabled(source, true).unwrap();

    match net.detach_cable(load, CableSide::B, CircuitPole::First) {
        Err(TopologyError::CableEnergized(c)) if c == load => {}
        other => panic!("expected CableEnergized, got {other:?}"),
    }
    match net.remove_cable(load) {
        Err(TopologyError::CableEnergized(_)) => {}
        other => panic!("expected CableEnergized, got {other:?}"),
    }
    match net.remove_node(lamp) {
        Err(TopologyError::NodeEnergized(n)) if n == lamp => {}
        other => panic!("expected NodeEnergized, got {other:?}"),
    }
    assert!(net.is_active(lamp));
    assert_consistent(&net);
}

#[test]
fn dead_wiring_can_be_reworked() {
    let SwitchLoop {
        mut net,
        source,
        switch,
        lamp,
        load,
        ..
    } = switch_loop();
    net.set_switch(switch, true).unwrap();
    net.set_source_enabled(source, true).unwrap();
    net.set_source_enabled(source, false).unwrap();

    net.remove_cable(load).unwrap();
    net.remove_node(lamp).unwrap();
    net.set_source_enabled(source, true).unwrap();
    assert_consistent(&net);
    let stats = net.stats();
    assert_eq!(stats.closed_circuits, 0);
    assert_eq!(stats.open_circuits, 1);
}

#[test]
fn recalculation_picks_up_wiring_changes() {
    let SwitchLoop {
        mut net,
        source,
        switch,
        lamp,
        load,
        ..
    } = switch_loop();
    net.set_switch(switch, true).unwrap();
    for pole in CircuitPole::ALL {
        net.detach_cable(load, CableSide::B, pole).unwrap();
    }
    net.set_source_enabled(source, true).unwrap();
    assert!(!net.is_active(lamp));

    for pole in CircuitPole::ALL {
        net.attach_cable(load, CableSide::B, lamp, 0, pole).unwrap();
    }
    net.calculate_connections();
    assert_consistent(&net);
    assert!(net.is_active(lamp));
}

// ── Events ─────────────────────────────────────────────────────────

#[test]
fn switching_reports_lamp_and_cable_changes() {
    let SwitchLoop {
        mut net,
        source,
        switch,
        lamp,
        load,
        ..
    } = switch_loop();
    net.set_source_enabled(source, true).unwrap();
    assert!(net
        .drain_events()
        .contains(&NetworkEvent::SourceEnabledChanged {
            node: source,
            enabled: true,
        }));

    net.set_switch(switch, true).unwrap();
    let events = net.drain_events();
    assert!(events.contains(&NetworkEvent::ActivationChanged {
        node: lamp,
        active: true,
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        NetworkEvent::CablePowerChanged { cable, power } if *cable == load && power.is_closed()
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, NetworkEvent::NodeCircuitsChanged { node } if *node == lamp)));
    assert!(net.drain_events().is_empty());
}

#[test]
fn subscribers_see_relay_travel() {
    let RelayLoop {
        mut net,
        source,
        relay,
        ..
    } = relay_loop(0, 0);
    let rx = net.subscribe();
    net.set_source_enabled(source, true).unwrap();
    net.advance(2_000);

    let states: Vec<RelayState> = rx
        .try_iter()
        .filter_map(|e| match e {
            NetworkEvent::RelayStateChanged { relay: r, state } if r == relay => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(states.first(), Some(&RelayState::GoingUp));
    assert_eq!(states.last(), Some(&RelayState::Up));
}

#[test]
fn undrained_queue_stops_at_capacity() {
    let mut net = Network::new(EngineConfig {
        event_capacity: Some(3),
        ..EngineConfig::default()
    })
    .unwrap();
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let switch = net.add_node("SW", &NodeSettings::OnOffSwitch);
    let lamp = net.add_node("L", &NodeSettings::lamp());
    wire(&mut net, (source, 0), (switch, 0));
    wire(&mut net, (switch, 1), (lamp, 0));
    net.set_source_enabled(source, true).unwrap();
    net.drain_events();
    let dropped_before = net.stats().events_dropped;

    for on in [true, false, true, false] {
        net.set_switch(switch, on).unwrap();
    }
    assert_consistent(&net);
    assert!(net.stats().events_dropped > dropped_before);
    assert_eq!(net.drain_events().len(), 3);

    net.set_switch(switch, true).unwrap();
    let events = net.drain_events();
    assert!(!events.is_empty() && events.len() <= 3);
    assert!(net.is_active(lamp));
}
