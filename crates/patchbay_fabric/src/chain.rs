//! Chains: the vertices of the global search.

use crate::error::FabricError;
use crate::kind::BlockKind;
use crate::port::{BlockRef, Port};
use crate::vertex::Vertex;

/// Capacity of the global chain arena.
pub const MAX_CHAINS: usize = 950;

/// Starting traversal weight of every chain.
pub const BASE_WEIGHT: u32 = 1;

/// Extra weight for chains bundling more than [`WIDE_CHAIN_PORTS`] ports.
pub const WIDE_CHAIN_PENALTY: u32 = 4;

/// Port count above which a chain is considered wide.
pub const WIDE_CHAIN_PORTS: usize = 8;

/// A bundle of electrically equivalent fabric ports, used as one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    vertex: Vertex,
    ports: Vec<Port>,
    weight: u32,
    is_ion: bool,
    is_spm: bool,
    affected: bool,
}

impl Chain {
    /// Parses one line of the global chain description.
    ///
    /// `line_no` is only used for error reporting.
    pub fn parse(line: &str, line_no: usize) -> Result<Self, FabricError> {
        let ports: Vec<Port> = line.split_whitespace().map(Port::parse).collect();
        let Some(first) = ports.first() else {
            return Err(FabricError::EmptyChain { line: line_no });
        };

        let mut weight = BASE_WEIGHT;
        if ports.len() > WIDE_CHAIN_PORTS {
            weight += WIDE_CHAIN_PENALTY;
        }
        let is_ion = ports.iter().any(|p| p.kind() == BlockKind::Ion);
        let is_spm = ports.iter().any(|p| p.kind() == BlockKind::SharedReference);

        Ok(Self {
            vertex: Vertex::new(first.label.clone()),
            ports,
            weight,
            is_ion,
            is_spm,
            affected: false,
        })
    }

    /// The chain label (its first port label).
    pub fn label(&self) -> &str {
        &self.vertex.label
    }

    /// The underlying vertex.
    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    /// Mutable access to the underlying vertex.
    pub fn vertex_mut(&mut self) -> &mut Vertex {
        &mut self.vertex
    }

    /// The ports of this chain, in description order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Current traversal weight.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Raises the traversal weight.
    pub fn add_weight(&mut self, amount: u32) {
        self.weight = self.weight.saturating_add(amount);
    }

    /// Whether the chain touches an ION block.
    pub fn is_ion(&self) -> bool {
        self.is_ion
    }

    /// Whether the chain touches a shared reference block.
    pub fn is_spm(&self) -> bool {
        self.is_spm
    }

    /// Whether the chain has been restricted to crossbar/reference ports.
    pub fn is_affected(&self) -> bool {
        self.affected
    }

    /// Restricts the chain to ports on crossbar and shared-reference blocks.
    ///
    /// The chain stays alive as a pass-through. If no port would survive, the
    /// ports are left untouched so the chain is never empty.
    pub fn affect(&mut self) {
        if self.ports.iter().any(|p| p.kind().survives_affect()) {
            self.ports.retain(|p| p.kind().survives_affect());
        }
        self.affected = true;
    }

    /// Distinct blocks referenced by this chain, in first-seen order.
    pub fn blocks(&self) -> Vec<&BlockRef> {
        let mut blocks: Vec<&BlockRef> = Vec::new();
        for block in self.ports.iter().filter_map(|p| p.block.as_ref()) {
            if !blocks.iter().any(|b| b.label == block.label) {
                blocks.push(block);
            }
        }
        blocks
    }

    /// The first port of this chain that sits on `block_label`.
    pub fn port_in_block(&self, block_label: &str) -> Option<&Port> {
        self.ports
            .iter()
            .find(|p| p.block_label() == Some(block_label))
    }

    /// Labels of the blocks both chains reference, in this chain's order.
    pub fn shared_blocks<'a>(&'a self, other: &Chain) -> Vec<&'a str> {
        self.blocks()
            .into_iter()
            .map(|b| b.label.as_str())
            .filter(|label| other.port_in_block(label).is_some())
            .collect()
    }

    /// Whether any port label of this chain equals `label`.
    pub fn has_port(&self, label: &str) -> bool {
        self.ports.iter().any(|p| p.label == label)
    }
}
