//! Turns circuit wiring into an ordered list of point-to-point connections.

use crate::circuit::CircuitDb;
use crate::resolver::NodeKind;
use patchbay_common::{NodeId, TerminalId};
use std::collections::{HashMap, HashSet};

/// One connection the router must realize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Source terminal.
    pub from: TerminalId,
    /// Destination terminal.
    pub to: TerminalId,
}

fn is_junction(db: &dyn CircuitDb, node: NodeId) -> bool {
    NodeKind::parse(&db.node_descriptor(node).kind) == Some(NodeKind::Junction)
}

/// Collects every net and daisy-chains its terminals.
///
/// A net is grown with an explicit worklist over one-hop wiring; junction
/// nodes are transparent, so all their terminals join the net but none is
/// routed to. A net with `k` routable terminals yields `k - 1` connections
/// in node enumeration order, then terminal order.
pub fn plan_connections(db: &dyn CircuitDb) -> Vec<Connection> {
    let nodes = db.enumerate_nodes();
    let junctions: HashSet<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&node| is_junction(db, node))
        .collect();
    let order: HashMap<TerminalId, usize> = nodes
        .iter()
        .flat_map(|&node| db.enumerate_terminals(node))
        .enumerate()
        .map(|(position, terminal)| (terminal, position))
        .collect();

    let mut seen = HashSet::new();
    let mut connections = Vec::new();
    for &node in nodes.iter().filter(|n| !junctions.contains(n)) {
        for terminal in db.enumerate_terminals(node) {
            if !seen.insert(terminal) {
                continue;
            }
            let mut net = Vec::new();
            let mut worklist = vec![terminal];
            while let Some(current) = worklist.pop() {
                let owner = db.owner_node(current);
                if junctions.contains(&owner) {
                    for sibling in db.enumerate_terminals(owner) {
                        if seen.insert(sibling) {
                            worklist.push(sibling);
                        }
                    }
                } else {
                    net.push(current);
                }
                for next in db.connected_terminals(current) {
                    if seen.insert(next) {
                        worklist.push(next);
                    }
                }
            }

            net.sort_by_key(|t| order.get(t).copied().unwrap_or(usize::MAX));
            connections.extend(net.windows(2).map(|pair| Connection {
                from: pair[0],
                to: pair[1],
            }));
        }
    }
    tracing::debug!(connections = connections.len(), "planned connections");
    connections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::InMemoryCircuit;

    fn labels(circuit: &InMemoryCircuit, plan: &[Connection]) -> Vec<(String, String)> {
        plan.iter()
            .map(|c| (circuit.terminal_label(c.from), circuit.terminal_label(c.to)))
            .collect()
    }

    #[test]
    fn single_wire_is_one_connection() {
        let circuit = InMemoryCircuit::from_json_str(
            r#"{ "nodes": [
                { "name": "U1", "kind": "amplifier", "terminals": ["out"] },
                { "name": "P1", "kind": "pad", "terminals": ["x"] }
            ], "wires": [["P1.x", "U1.out"]] }"#,
        )
        .unwrap();
        let plan = plan_connections(&circuit);
        assert_eq!(labels(&circuit, &plan), vec![("U1.out".into(), "P1.x".into())]);
    }

    #[test]
    fn junctions_merge_nets_and_daisy_chain() {
        let circuit = InMemoryCircuit::from_json_str(
            r#"{ "nodes": [
                { "name": "U1", "kind": "amplifier", "terminals": ["inp", "out"] },
                { "name": "J1", "kind": "junction", "terminals": ["a", "b", "c"] },
                { "name": "R1", "kind": "resistor", "terminals": ["a", "b"] },
                { "name": "P1", "kind": "pad", "terminals": ["x"] }
            ], "wires": [
                ["U1.out", "J1.a"], ["J1.b", "R1.a"], ["J1.c", "P1.x"], ["R1.b", "U1.inp"]
            ] }"#,
        )
        .unwrap();
        let plan = plan_connections(&circuit);
        assert_eq!(
            labels(&circuit, &plan),
            vec![
                ("U1.inp".into(), "R1.b".into()),
                ("U1.out".into(), "R1.a".into()),
                ("R1.a".into(), "P1.x".into()),
            ]
        );
    }

    #[test]
    fn unwired_terminals_yield_nothing() {
        let circuit = InMemoryCircuit::from_json_str(
            r#"{ "nodes": [{ "name": "U1", "kind": "amplifier", "terminals": ["inp", "out"] }] }"#,
        )
        .unwrap();
        assert!(plan_connections(&circuit).is_empty());
    }
}
