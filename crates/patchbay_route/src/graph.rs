//! The global chain graph and its per-block local graph cache.
//!
//! Chains live in a fixed arena indexed by [`ChainId`]. A consumed chain
//! leaves an empty slot behind so ids stay stable across snapshots. There is
//! no stored adjacency: two chains are neighbors when they share a block,
//! and that relation is cached per chain until the next mutation.

use crate::error::{FunctionalError, RouteError};
use crate::registry::UsedBlockRegistry;
use patchbay_common::{ChainId, ContentHash, Fingerprinter};
use patchbay_config::RouterConfig;
use patchbay_fabric::{read_chain_description, BlockLibrary, Chain, LocalBlockGraph, UNREACHED};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// The top-level routing graph over chains.
///
/// Cloning (see [`snapshot`](Self::snapshot)) yields a fully independent
/// graph: chains, used-block registry, cached local graphs and pending
/// mutation queues are all deep-copied. Only the immutable block library is
/// shared.
#[derive(Debug, Clone)]
pub struct GlobalChainGraph {
    label: String,
    pub(crate) chains: Vec<Option<Chain>>,
    library: Arc<BlockLibrary>,
    pub(crate) local_graphs: BTreeMap<String, LocalBlockGraph>,
    pub(crate) used: UsedBlockRegistry,
    pub(crate) neighbor_cache: HashMap<ChainId, Vec<ChainId>>,
    pub(crate) to_delete: Vec<ChainId>,
    pub(crate) to_affect: Vec<ChainId>,
    pub(crate) to_reinforce: Vec<ChainId>,
}

impl GlobalChainGraph {
    /// Creates a graph over `chains`, drawing block graphs from `library`.
    pub fn new(label: impl Into<String>, chains: Vec<Chain>, library: Arc<BlockLibrary>) -> Self {
        Self {
            label: label.into(),
            chains: chains.into_iter().map(Some).collect(),
            library,
            local_graphs: BTreeMap::new(),
            used: UsedBlockRegistry::new(),
            neighbor_cache: HashMap::new(),
            to_delete: Vec::new(),
            to_affect: Vec::new(),
            to_reinforce: Vec::new(),
        }
    }

    /// Returns an independent deep copy of this graph.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// The graph label (the project name for loaded fabrics).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The shared block library.
    pub fn library(&self) -> &BlockLibrary {
        &self.library
    }

    /// Arena size, including consumed slots.
    pub fn capacity(&self) -> usize {
        self.chains.len()
    }

    /// Number of chains not yet consumed.
    pub fn live_count(&self) -> usize {
        self.chains.iter().flatten().count()
    }

    /// The chain in slot `id`, if it is still live.
    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id.index())?.as_ref()
    }

    pub(crate) fn chain_mut(&mut self, id: ChainId) -> Option<&mut Chain> {
        self.chains.get_mut(id.index())?.as_mut()
    }

    /// Live chains in index order.
    pub fn live_chains(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chains
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((chain_id(i), slot.as_ref()?)))
    }

    /// The chain id whose label is `label`, if live.
    pub fn chain_by_label(&self, label: &str) -> Option<ChainId> {
        self.live_chains()
            .find(|(_, chain)| chain.label() == label)
            .map(|(id, _)| id)
    }

    /// Distance assigned to `id` by the most recent search.
    pub fn distance_of(&self, id: ChainId) -> Option<u32> {
        let distance = self.chain(id)?.vertex().distance;
        (distance != UNREACHED).then_some(distance)
    }

    /// The used-block registry.
    pub fn used_blocks(&self) -> &UsedBlockRegistry {
        &self.used
    }

    /// The cached local graph for `block`, if one has been instantiated.
    pub fn local_graph(&self, block: &str) -> Option<&LocalBlockGraph> {
        self.local_graphs.get(block)
    }

    /// Instantiates the local graph for `block` from the library if needed.
    ///
    /// Returns whether the block has a local graph.
    pub(crate) fn ensure_local(&mut self, block: &str) -> bool {
        if self.local_graphs.contains_key(block) {
            return true;
        }
        match self.library.instantiate(block) {
            Some(graph) => {
                tracing::trace!(block, "instantiated block graph");
                self.local_graphs.insert(block.to_string(), graph);
                true
            }
            None => false,
        }
    }

    /// Instantiates the local graphs of every block `id` touches.
    pub(crate) fn ensure_blocks_of(&mut self, id: ChainId) {
        let Some(chain) = self.chain(id) else {
            return;
        };
        let labels: Vec<String> = chain.blocks().iter().map(|b| b.label.clone()).collect();
        for label in labels {
            self.ensure_local(&label);
        }
    }

    /// Live chains sharing at least one block with `id`, in index order.
    ///
    /// The set ignores search state and is cached until the next mutation.
    pub(crate) fn static_neighbors(&mut self, id: ChainId) -> Vec<ChainId> {
        if let Some(cached) = self.neighbor_cache.get(&id) {
            return cached.clone();
        }
        let Some(chain) = self.chain(id) else {
            return Vec::new();
        };
        let blocks: HashSet<&str> = chain.blocks().iter().map(|b| b.label.as_str()).collect();
        let neighbors: Vec<ChainId> = self
            .live_chains()
            .filter(|(other, _)| *other != id)
            .filter(|(_, other)| {
                other
                    .ports()
                    .iter()
                    .any(|p| p.block_label().is_some_and(|b| blocks.contains(b)))
            })
            .map(|(other, _)| other)
            .collect();
        self.neighbor_cache.insert(id, neighbors.clone());
        neighbors
    }

    /// A content hash over live chains, their weights and local graph sizes.
    ///
    /// Two graphs with equal fingerprints route identically.
    pub fn fingerprint(&self) -> ContentHash {
        let mut f = Fingerprinter::new();
        for (id, chain) in self.live_chains() {
            f.number(id.as_raw())
                .number(chain.weight())
                .flag(chain.is_affected());
            for port in chain.ports() {
                f.label(&port.label);
            }
        }
        for (label, graph) in &self.local_graphs {
            f.label(label).number(graph.live_vertex_count() as u32);
        }
        for entry in self.used.entries() {
            f.label(entry);
        }
        f.finish()
    }
}

pub(crate) fn chain_id(index: usize) -> ChainId {
    ChainId::from_raw(index as u32)
}

/// Loads the fabric a configuration describes and spends its reserved keys.
///
/// Relative paths are resolved against `base_dir`.
pub fn load_fabric(config: &RouterConfig, base_dir: &Path) -> Result<GlobalChainGraph, RouteError> {
    let chains_path = RouterConfig::resolve_path(base_dir, &config.fabric.chains);
    let chains = read_chain_description(&chains_path).map_err(FunctionalError::from)?;

    let mut library = BlockLibrary::new();
    for block in &config.fabric.blocks {
        let path = RouterConfig::resolve_path(base_dir, &block.adjacency);
        library
            .load(&block.label, &path)
            .map_err(FunctionalError::from)?;
    }
    tracing::info!(
        chains = chains.len(),
        blocks = library.len(),
        "loaded fabric"
    );

    let mut graph = GlobalChainGraph::new(config.project.name.clone(), chains, Arc::new(library));
    for reserved in &config.fabric.reserved {
        let removed = graph.consume_key(&reserved.block, reserved.key)?;
        tracing::debug!(
            block = %reserved.block,
            key = reserved.key,
            removed,
            "spent reserved key"
        );
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_fabric::parse_chain_description;

    fn sample_graph() -> GlobalChainGraph {
        let chains = parse_chain_description(
            "CAU<10.n1 PPC<20.PX1\nCAU<10.n2 PPC<20.PY1\nRES<30.n1 PPC<21.PX1\n",
        )
        .unwrap();
        let mut library = BlockLibrary::new();
        library.insert("CAU<10", "n1 -- n2 : 3\n").unwrap();
        GlobalChainGraph::new("sample", chains, Arc::new(library))
    }

    #[test]
    fn arena_accessors() {
        let graph = sample_graph();
        assert_eq!(graph.capacity(), 3);
        assert_eq!(graph.live_count(), 3);
        assert_eq!(graph.chain_by_label("CAU<10.n2"), Some(ChainId::from_raw(1)));
        assert!(graph.chain(ChainId::from_raw(7)).is_none());
    }

    #[test]
    fn local_graphs_are_instantiated_lazily() {
        let mut graph = sample_graph();
        assert!(graph.local_graph("CAU<10").is_none());
        graph.ensure_blocks_of(ChainId::from_raw(0));
        assert!(graph.local_graph("CAU<10").is_some());
        assert!(graph.local_graph("PPC<20").is_none());
    }

    #[test]
    fn static_neighbors_share_a_block() {
        let mut graph = sample_graph();
        let neighbors = graph.static_neighbors(ChainId::from_raw(0));
        assert_eq!(neighbors, vec![ChainId::from_raw(1)]);
        assert!(graph.static_neighbors(ChainId::from_raw(2)).is_empty());
    }

    #[test]
    fn snapshots_are_independent() {
        let graph = sample_graph();
        let mut copy = graph.snapshot();
        copy.chains[0] = None;
        assert_eq!(graph.live_count(), 3);
        assert_eq!(copy.live_count(), 2);
        assert_ne!(graph.fingerprint(), copy.fingerprint());
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(sample_graph().fingerprint(), sample_graph().fingerprint());
    }
}
