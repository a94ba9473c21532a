//! Bookkeeping cross-checks.
//!
//! The engine keeps three redundant views of the same circuits: the
//! circuit paths themselves, per-node lists and counters, and per-cable
//! slots. [`check_consistency`] recomputes the second and third from the
//! first and reports the first disagreement.

use std::fmt::Write;

use interlock_core::{Circuit, CircuitId, CircuitPole, CircuitType, Item, NodeId, NodeItem};
use interlock_engine::Network;

fn pole_mark(pole: CircuitPole) -> char {
    match pole {
        CircuitPole::First => '+',
        CircuitPole::Second => '-',
    }
}

fn name(net: &Network, node: NodeId) -> String {
    net.node(node)
        .map_or_else(|| format!("{node}"), |n| n.name().to_owned())
}

/// One circuit as text: type, then every node passage as
/// `name[in>out]` with `*` for a missing contact.
pub fn render(net: &Network, circuit: &Circuit) -> String {
    let mut out = format!("{}:", circuit.circuit_type());
    for item in circuit.items() {
        let Item::Node(n) = item else {
            continue;
        };
        let from = n
            .from_contact
            .map_or_else(|| "*".to_owned(), |c| format!("{c}{}", pole_mark(n.from_pole)));
        let to = n
            .to_contact
            .map_or_else(|| "*".to_owned(), |c| format!("{c}{}", pole_mark(n.to_pole)));
        let _ = write!(out, " {}[{from}>{to}]", name(net, n.node));
    }
    out
}

/// Every registered circuit, rendered and sorted.
pub fn circuit_signatures(net: &Network) -> Vec<String> {
    let mut out: Vec<String> = net.circuits().map(|(_, c)| render(net, c)).collect();
    out.sort();
    out
}

/// Every registered closed circuit, rendered and sorted.
pub fn closed_signatures(net: &Network) -> Vec<String> {
    let mut out: Vec<String> = net
        .circuits()
        .filter(|(_, c)| c.circuit_type() == CircuitType::Closed)
        .map(|(_, c)| render(net, c))
        .collect();
    out.sort();
    out
}

fn passages(circuit: &Circuit, node: NodeId) -> Vec<NodeItem> {
    circuit.occurrences(node).into_iter().collect()
}

/// Check that node lists, contact counters and cable slots agree with
/// the registered circuits.
pub fn check_consistency(net: &Network) -> Result<(), String> {
    // Circuits → nodes and cables.
    for (id, circuit) in net.circuits() {
        let t = circuit.circuit_type();
        for item in circuit.items() {
            match item {
                Item::Node(n) => {
                    let node = net
                        .node(n.node)
                        .ok_or_else(|| format!("circuit {id} passes removed node {}", n.node))?;
                    if !node.accounting().is_registered(id, t) {
                        return Err(format!(
                            "{t} circuit {id} is not registered on {}",
                            node.name()
                        ));
                    }
                }
                Item::Cable(c) => {
                    let cable = net
                        .cable(c.cable)
                        .ok_or_else(|| format!("circuit {id} uses removed cable {}", c.cable))?;
                    if !cable.circuits(t, c.pole).any(|other| other == id) {
                        return Err(format!(
                            "{t} circuit {id} missing from {} pole {:?}",
                            c.cable, c.pole
                        ));
                    }
                }
            }
        }
    }

    // Nodes → circuits, and counters.
    for (node_id, node) in net.nodes() {
        let accounting = node.accounting();
        for t in CircuitType::ALL {
            let registered: Vec<(CircuitId, &Circuit)> = accounting
                .circuits(t)
                .iter()
                .map(|&id| {
                    net.circuit(id)
                        .filter(|c| c.is_enabled() && c.circuit_type() == t)
                        .map(|c| (id, c))
                        .ok_or_else(|| {
                            format!("{} lists stale {t} circuit {id}", node.name())
                        })
                })
                .collect::<Result<_, _>>()?;
            for &(id, circuit) in &registered {
                if circuit.occurrences(node_id).is_empty() {
                    return Err(format!(
                        "{} lists {t} circuit {id} that never passes it",
                        node.name()
                    ));
                }
            }
            for (index, contact) in accounting.contacts().iter().enumerate() {
                for pole in CircuitPole::ALL {
                    let mut entrances = 0usize;
                    let mut exits = 0usize;
                    for &(_, circuit) in &registered {
                        for p in passages(circuit, node_id) {
                            if p.from_contact == Some(index) && p.from_pole == pole {
                                entrances += 1;
                            }
                            if p.to_contact == Some(index) && p.to_pole == pole {
                                exits += 1;
                            }
                        }
                    }
                    let (e, x) = (
                        usize::from(contact.entrance_count(t, pole)),
                        usize::from(contact.exit_count(t, pole)),
                    );
                    if (e, x) != (entrances, exits) {
                        return Err(format!(
                            "{} contact {index} {pole:?} {t}: counters in/out {e}/{x}, \
                             circuits say {entrances}/{exits}",
                            node.name()
                        ));
                    }
                }
            }
        }
    }

    // Cables → circuits.
    for (cable_id, cable) in net.cables() {
        for t in CircuitType::ALL {
            for pole in CircuitPole::ALL {
                for id in cable.circuits(t, pole) {
                    let uses = net.circuit(id).is_some_and(|c| {
                        c.is_enabled()
                            && c.circuit_type() == t
                            && c.items().iter().any(|item| {
                                matches!(item, Item::Cable(ci)
                                    if ci.cable == cable_id && ci.pole == pole)
                            })
                    });
                    if !uses {
                        return Err(format!(
                            "{cable_id} pole {pole:?} lists {t} circuit {id} that does not use it"
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Panic with a readable report if [`check_consistency`] fails.
pub fn assert_consistent(net: &Network) {
    if let Err(report) = check_consistency(net) {
        let circuits = circuit_signatures(net).join("\n  ");
        panic!("inconsistent bookkeeping: {report}\ncircuits:\n  {circuits}");
    }
}
