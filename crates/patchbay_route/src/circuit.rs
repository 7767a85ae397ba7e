//! The circuit database interface and an in-memory implementation.
//!
//! The router never owns a design database. It reads nodes, terminals and
//! one-hop wiring through [`CircuitDb`]; [`InMemoryCircuit`] provides that
//! interface over a small JSON description for the CLI and for tests.

use patchbay_common::{NodeId, TerminalId};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// What the router needs to know about one circuit node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// The node name, e.g. `U1`.
    pub name: String,
    /// The node kind name, e.g. `amplifier`.
    pub kind: String,
    /// A block the node is pinned to, if any.
    pub block: Option<String>,
    /// Kind-specific parameters such as a resistor's `value`.
    pub params: BTreeMap<String, String>,
}

/// Read access to a circuit design.
///
/// Ids handed out by one implementation are only meaningful to it.
pub trait CircuitDb {
    /// Every node, in a stable order.
    fn enumerate_nodes(&self) -> Vec<NodeId>;

    /// The terminals of `node`, in a stable order.
    fn enumerate_terminals(&self, node: NodeId) -> Vec<TerminalId>;

    /// The full terminal label, e.g. `U1.out`.
    fn terminal_label(&self, terminal: TerminalId) -> String;

    /// The terminal name within its node, e.g. `out`.
    fn terminal_name(&self, terminal: TerminalId) -> String;

    /// Terminals wired directly to `terminal`.
    fn connected_terminals(&self, terminal: TerminalId) -> Vec<TerminalId>;

    /// The node `terminal` belongs to.
    fn owner_node(&self, terminal: TerminalId) -> NodeId;

    /// Kind, pinned block and parameters of `node`.
    fn node_descriptor(&self, node: NodeId) -> NodeDescriptor;
}

/// Errors raised while reading a circuit description.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The circuit file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The JSON is malformed.
    #[error("invalid circuit description: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two nodes share a name.
    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    /// A wire names a terminal no node declares.
    #[error("wire endpoint '{0}' is not a declared terminal")]
    UnknownWireEnd(String),
}

#[derive(Debug, Deserialize)]
struct CircuitFile {
    nodes: Vec<NodeSpec>,
    #[serde(default)]
    wires: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct NodeSpec {
    name: String,
    kind: String,
    #[serde(default)]
    block: Option<String>,
    terminals: Vec<String>,
    #[serde(default)]
    params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
struct TerminalEntry {
    owner: NodeId,
    name: String,
    label: String,
}

/// A circuit held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCircuit {
    nodes: Vec<NodeDescriptor>,
    node_terminals: Vec<Vec<TerminalId>>,
    terminals: Vec<TerminalEntry>,
    links: Vec<Vec<TerminalId>>,
}

impl InMemoryCircuit {
    /// Parses a JSON circuit description.
    pub fn from_json_str(text: &str) -> Result<Self, CircuitError> {
        let file: CircuitFile = serde_json::from_str(text)?;
        let mut circuit = Self::default();
        let mut by_label = HashMap::new();

        for spec in file.nodes {
            if circuit.nodes.iter().any(|n| n.name == spec.name) {
                return Err(CircuitError::DuplicateNode(spec.name));
            }
            let node = NodeId::from_raw(circuit.nodes.len() as u32);
            let mut owned = Vec::with_capacity(spec.terminals.len());
            for name in spec.terminals {
                let id = TerminalId::from_raw(circuit.terminals.len() as u32);
                let label = format!("{}.{}", spec.name, name);
                by_label.insert(label.clone(), id);
                circuit.terminals.push(TerminalEntry {
                    owner: node,
                    name,
                    label,
                });
                circuit.links.push(Vec::new());
                owned.push(id);
            }
            circuit.node_terminals.push(owned);
            circuit.nodes.push(NodeDescriptor {
                name: spec.name,
                kind: spec.kind,
                block: spec.block,
                params: spec
                    .params
                    .into_iter()
                    .map(|(key, value)| (key, param_text(value)))
                    .collect(),
            });
        }

        for [a, b] in file.wires {
            let lookup = |label: &str| {
                by_label
                    .get(label)
                    .copied()
                    .ok_or_else(|| CircuitError::UnknownWireEnd(label.to_string()))
            };
            let (a, b) = (lookup(&a)?, lookup(&b)?);
            circuit.links[a.index()].push(b);
            circuit.links[b.index()].push(a);
        }
        Ok(circuit)
    }

    /// Reads and parses a JSON circuit file.
    pub fn load(path: &Path) -> Result<Self, CircuitError> {
        let text = std::fs::read_to_string(path).map_err(|source| CircuitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// The terminal with the given label, e.g. `U1.out`.
    pub fn terminal_by_label(&self, label: &str) -> Option<TerminalId> {
        self.terminals
            .iter()
            .position(|t| t.label == label)
            .map(|i| TerminalId::from_raw(i as u32))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn param_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

impl CircuitDb for InMemoryCircuit {
    fn enumerate_nodes(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(|i| NodeId::from_raw(i as u32))
            .collect()
    }

    fn enumerate_terminals(&self, node: NodeId) -> Vec<TerminalId> {
        self.node_terminals[node.index()].clone()
    }

    fn terminal_label(&self, terminal: TerminalId) -> String {
        self.terminals[terminal.index()].label.clone()
    }

    fn terminal_name(&self, terminal: TerminalId) -> String {
        self.terminals[terminal.index()].name.clone()
    }

    fn connected_terminals(&self, terminal: TerminalId) -> Vec<TerminalId> {
        self.links[terminal.index()].clone()
    }

    fn owner_node(&self, terminal: TerminalId) -> NodeId {
        self.terminals[terminal.index()].owner
    }

    fn node_descriptor(&self, node: NodeId) -> NodeDescriptor {
        self.nodes[node.index()].clone()
    }
}
