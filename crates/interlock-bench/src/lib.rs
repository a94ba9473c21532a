//! Benchmark profiles for the Interlock relay simulator.
//!
//! Provides pre-built layouts sized for benchmarking:
//!
//! - [`ladder_profile`]: one source, a chain of junctions, a switched lamp
//!   on every junction
//! - [`relay_bank_profile`]: one source feeding a chain of relay coils
//!
//! Both are wired with bifilar cables (both poles of a side on the same
//! contact), so every lamp or coil closes through its own return path.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use interlock_core::{CableSide, CircuitPole, NodeId, RelayId, TopologyError};
use interlock_engine::{ConfigError, EngineConfig, Network, NodeSettings, RelaySettings};

/// Errors while assembling a profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The engine configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A wiring step failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// A built ladder.
pub struct LadderProfile {
    /// The network, source enabled.
    pub net: Network,
    /// The source feeding the chain.
    pub source: NodeId,
    /// One switch per rung, in chain order.
    pub switches: Vec<NodeId>,
    /// One lamp per rung, in chain order.
    pub lamps: Vec<NodeId>,
}

/// A built relay bank.
pub struct RelayBankProfile {
    /// The network, source disabled.
    pub net: Network,
    /// The source feeding the chain.
    pub source: NodeId,
    /// One relay per coil, in chain order.
    pub relays: Vec<RelayId>,
}

fn wire(net: &mut Network, a: (NodeId, usize), b: (NodeId, usize)) -> Result<(), TopologyError> {
    let cable = net.add_cable();
    for pole in CircuitPole::ALL {
        net.attach_cable(cable, CableSide::A, a.0, a.1, pole)?;
        net.attach_cable(cable, CableSide::B, b.0, b.1, pole)?;
    }
    Ok(())
}

fn junction(net: &mut Network, name: String) -> NodeId {
    net.add_node(
        name,
        &NodeSettings::Junction {
            disabled_contact: Some(3),
        },
    )
}

/// Build a ladder of `rungs` switched lamps with the source enabled.
///
/// With `switched_on` every rung starts closed, so the network holds one
/// closed circuit per lamp.
pub fn ladder_profile(rungs: usize, switched_on: bool) -> Result<LadderProfile, ProfileError> {
    let mut net = Network::new(EngineConfig::default())?;
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let mut switches = Vec::with_capacity(rungs);
    let mut lamps = Vec::with_capacity(rungs);
    let mut upstream = (source, 0);
    for i in 0..rungs {
        let j = junction(&mut net, format!("J{i}"));
        let sw = net.add_node(format!("SW{i}"), &NodeSettings::OnOffSwitch);
        let lamp = net.add_node(format!("L{i}"), &NodeSettings::lamp());
        wire(&mut net, upstream, (j, 0))?;
        wire(&mut net, (j, 1), (sw, 0))?;
        wire(&mut net, (sw, 1), (lamp, 0))?;
        if switched_on {
            net.set_switch(sw, true)?;
        }
        upstream = (j, 2);
        switches.push(sw);
        lamps.push(lamp);
    }
    net.set_source_enabled(source, true)?;
    Ok(LadderProfile {
        net,
        source,
        switches,
        lamps,
    })
}

/// Build a chain of `count` relay coils behind one disabled source.
///
/// Enabling the source energizes every coil at once; each relay then
/// travels on its own timer.
pub fn relay_bank_profile(count: usize) -> Result<RelayBankProfile, ProfileError> {
    let mut net = Network::new(EngineConfig::default())?;
    let source = net.add_node("S", &NodeSettings::PowerSource);
    let mut relays = Vec::with_capacity(count);
    let mut upstream = (source, 0);
    for i in 0..count {
        let name = format!("K{i}");
        relays.push(net.add_relay(RelaySettings::named(name.clone()))?);
        let j = junction(&mut net, format!("J{i}"));
        let coil = net.add_node(format!("{name}-coil"), &NodeSettings::coil(name));
        wire(&mut net, upstream, (j, 0))?;
        wire(&mut net, (j, 1), (coil, 0))?;
        upstream = (j, 2);
    }
    Ok(RelayBankProfile {
        net,
        source,
        relays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interlock_engine::RelayState;

    #[test]
    fn ladder_lights_every_rung() {
        let p = ladder_profile(5, true).unwrap();
        assert_eq!(p.net.stats().closed_circuits, 5);
        assert!(p.lamps.iter().all(|&l| p.net.is_active(l)));
    }

    #[test]
    fn dark_ladder_has_no_closed_circuits() {
        let p = ladder_profile(5, false).unwrap();
        assert_eq!(p.net.stats().closed_circuits, 0);
        assert!(p.lamps.iter().all(|&l| !p.net.is_active(l)));
    }

    #[test]
    fn relay_bank_picks_up() {
        let mut p = relay_bank_profile(4).unwrap();
        p.net.set_source_enabled(p.source, true).unwrap();
        p.net.advance(2_000);
        for &r in &p.relays {
            assert_eq!(p.net.relay(r).unwrap().state(), RelayState::Up);
        }
    }
}
