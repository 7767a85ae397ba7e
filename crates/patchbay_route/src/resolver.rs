//! Maps circuit terminals to search patterns over fabric port labels.
//!
//! Each node kind owns a pin map from terminal names to boundary terminals.
//! A node pinned to a block (by the circuit or by an earlier landing in the
//! same attempt) targets that block only; an unpinned node targets every
//! block of its class and is bound to whichever block it first lands on.

use crate::circuit::CircuitDb;
use crate::error::FunctionalError;
use crate::search::Lane;
use patchbay_common::{NodeId, TerminalId};
use patchbay_fabric::{BlockKind, Port};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Resistor taps in ohms, in boundary terminal order starting at `n2`.
const RESISTOR_TAPS: [u32; 7] = [1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000];

/// The circuit node kinds the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Operational amplifier on a `CAU` block.
    Amplifier,
    /// Resistor on a `RES` tap array.
    Resistor,
    /// Capacitor on a `CAP` array.
    Capacitor,
    /// External pad on a `PPC` block.
    Pad,
    /// Shared reference on an `SPM` block.
    Reference,
    /// Ion-lane endpoint on an `ION` block.
    Ion,
    /// Wiring junction; traversed by the planner, never routed to.
    Junction,
}

impl NodeKind {
    /// Parses a kind name as written in circuit descriptions.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "amplifier" => Self::Amplifier,
            "resistor" => Self::Resistor,
            "capacitor" => Self::Capacitor,
            "pad" => Self::Pad,
            "reference" => Self::Reference,
            "ion" => Self::Ion,
            "junction" => Self::Junction,
            _ => return None,
        })
    }

    /// The block kind nodes of this kind are placed on.
    pub fn block_kind(self) -> Option<BlockKind> {
        match self {
            Self::Amplifier => Some(BlockKind::Amplifier),
            Self::Resistor => Some(BlockKind::ResistorArray),
            Self::Capacitor => Some(BlockKind::CapacitorArray),
            Self::Pad => Some(BlockKind::Pad),
            Self::Reference => Some(BlockKind::SharedReference),
            Self::Ion => Some(BlockKind::Ion),
            Self::Junction => None,
        }
    }
}

/// Where one circuit terminal may land in the fabric.
#[derive(Debug, Clone)]
pub struct Target {
    /// The circuit terminal.
    pub terminal: TerminalId,
    /// Its owning node.
    pub node: NodeId,
    /// The owning node's kind.
    pub kind: NodeKind,
    /// Pattern over port labels.
    pub pattern: Regex,
    /// The pin part of the pattern, e.g. `n1$` or `PX`.
    pub pin: String,
    /// Whether the node is pinned to a single block.
    pub bound: bool,
}

impl Target {
    /// Whether the target ranges over a whole block class.
    pub fn is_class(&self) -> bool {
        !self.bound
    }

    /// The used-block registry entry to record once this target lands on
    /// `port_label`. Reference blocks are shared and never recorded.
    pub fn used_entry(&self, port_label: &str) -> Option<String> {
        if self.kind == NodeKind::Reference {
            return None;
        }
        let port = Port::parse(port_label);
        let block = port.block_label()?;
        if self.kind == NodeKind::Pad {
            Some(format!(r"{}\.{}", regex::escape(block), self.pin))
        } else {
            Some(block.to_string())
        }
    }
}

/// The lane a connection between two targets must use.
pub fn lane_for(from: &Target, to: &Target) -> Lane {
    if from.kind == NodeKind::Ion || to.kind == NodeKind::Ion {
        Lane::Ion
    } else {
        Lane::Standard
    }
}

/// Whether shared-reference chains on the connection's path are affected
/// rather than consumed.
pub fn affects_references(from: &Target, to: &Target) -> bool {
    from.kind == NodeKind::Reference || to.kind == NodeKind::Reference
}

/// Resolves terminals to targets and remembers per-attempt block bindings.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    bindings: HashMap<NodeId, String>,
}

impl Resolver {
    /// Creates a resolver with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every binding made during the previous attempt.
    pub fn reset(&mut self) {
        self.bindings.clear();
    }

    /// Pins `node` to `block` for the rest of the attempt.
    pub fn bind(&mut self, node: NodeId, block: &str) {
        self.bindings
            .entry(node)
            .or_insert_with(|| block.to_string());
    }

    /// The block `node` was bound to during this attempt.
    pub fn binding(&self, node: NodeId) -> Option<&str> {
        self.bindings.get(&node).map(String::as_str)
    }

    /// The target for `terminal`, or `None` for junction terminals.
    pub fn resolve(
        &self,
        db: &dyn CircuitDb,
        terminal: TerminalId,
    ) -> Result<Option<Target>, FunctionalError> {
        let node = db.owner_node(terminal);
        let descriptor = db.node_descriptor(node);
        let kind = NodeKind::parse(&descriptor.kind).ok_or_else(|| {
            FunctionalError::UnknownNodeKind {
                node: descriptor.name.clone(),
                kind: descriptor.kind.clone(),
            }
        })?;
        let Some(block_kind) = kind.block_kind() else {
            return Ok(None);
        };

        let name = db.terminal_name(terminal);
        let pin = pin_pattern(kind, &name, &descriptor.name, &descriptor.params)?;
        let block = self
            .binding(node)
            .map(str::to_string)
            .or_else(|| descriptor.block.clone());
        let pattern = match &block {
            Some(block) => format!(r"^{}\.{}", regex::escape(block), pin),
            None => format!(r"^{}<\d+\.{}", block_kind.prefix(), pin),
        };

        Ok(Some(Target {
            terminal,
            node,
            kind,
            pattern: Regex::new(&pattern)?,
            pin,
            bound: block.is_some(),
        }))
    }
}

fn pin_pattern(
    kind: NodeKind,
    terminal: &str,
    node: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, FunctionalError> {
    let unknown = || FunctionalError::UnknownTerminal {
        node: node.to_string(),
        terminal: terminal.to_string(),
    };
    let exact = |boundary: &str| format!("{boundary}$");

    match (kind, terminal) {
        (NodeKind::Amplifier, "inp") => Ok(exact("n1")),
        (NodeKind::Amplifier, "inn") => Ok(exact("n2")),
        (NodeKind::Amplifier, "out") => Ok(exact("n3")),
        (NodeKind::Resistor, "a") => Ok(exact("n1")),
        (NodeKind::Resistor, "b") => {
            let tap = resistor_tap(node, params)?;
            Ok(exact(&format!("n{}", tap + 2)))
        }
        (NodeKind::Capacitor, "a") => {
            capacitance(node, params)?;
            Ok(exact("n1"))
        }
        (NodeKind::Capacitor, "b") => {
            capacitance(node, params)?;
            Ok(exact("n2"))
        }
        (NodeKind::Pad, "x") => Ok("PX".to_string()),
        (NodeKind::Pad, "y") => Ok("PY".to_string()),
        (NodeKind::Reference, "ref") => Ok(exact("n1")),
        (NodeKind::Ion, "io") => Ok(exact("n1")),
        _ => Err(unknown()),
    }
}

fn illegal(node: &str, parameter: &str, value: Option<&String>) -> FunctionalError {
    FunctionalError::IllegalParameter {
        node: node.to_string(),
        parameter: parameter.to_string(),
        value: value.map_or_else(|| "<missing>".to_string(), String::clone),
    }
}

/// Index into [`RESISTOR_TAPS`] for the node's `value` parameter.
fn resistor_tap(
    node: &str,
    params: &BTreeMap<String, String>,
) -> Result<usize, FunctionalError> {
    let raw = params.get("value");
    let ohms = raw
        .and_then(|v| parse_scaled(v, &[('k', 1e3), ('K', 1e3), ('M', 1e6)]))
        .ok_or_else(|| illegal(node, "resistance", raw))?;
    RESISTOR_TAPS
        .iter()
        .position(|&tap| (f64::from(tap) - ohms).abs() < 1e-6)
        .ok_or_else(|| illegal(node, "resistance", raw))
}

/// The node's `value` parameter in farads; must be positive.
fn capacitance(
    node: &str,
    params: &BTreeMap<String, String>,
) -> Result<f64, FunctionalError> {
    let raw = params.get("value");
    raw.and_then(|v| {
        parse_scaled(
            v,
            &[('p', 1e-12), ('n', 1e-9), ('u', 1e-6), ('m', 1e-3)],
        )
    })
    .filter(|farads| *farads > 0.0)
    .ok_or_else(|| illegal(node, "capacitance", raw))
}

/// Parses a number with an optional one-letter scale suffix.
fn parse_scaled(text: &str, scales: &[(char, f64)]) -> Option<f64> {
    let text = text.trim();
    let (digits, scale) = match text.chars().last() {
        Some(last) => match scales.iter().find(|(suffix, _)| *suffix == last) {
            Some(&(_, scale)) => (&text[..text.len() - last.len_utf8()], scale),
            None => (text, 1.0),
        },
        None => return None,
    };
    let value: f64 = digits.trim().parse().ok()?;
    value.is_finite().then_some(value * scale)
}
