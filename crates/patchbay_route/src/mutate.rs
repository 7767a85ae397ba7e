//! Mutations of the global chain graph: consumption, affect and weight
//! reinforcement.
//!
//! Searches only queue their consumption. Nothing changes until
//! [`GlobalChainGraph::commit_pending_mutations`] runs, so a failed search
//! never leaves a half-consumed path behind.

use crate::graph::{chain_id, GlobalChainGraph};
use patchbay_common::{ChainId, PatchbayResult};
use std::collections::BTreeSet;

/// What one commit changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Chains removed from the arena.
    pub deleted: usize,
    /// Chains stripped to their crossbar and shared-reference ports.
    pub affected: usize,
    /// Local vertices removed across all cached block graphs.
    pub local_vertices: usize,
}

impl GlobalChainGraph {
    /// Queues a chain for deletion at the next commit.
    pub fn queue_deletion(&mut self, id: ChainId) {
        self.to_delete.push(id);
    }

    /// Drops a queued deletion so the chain survives the next commit.
    ///
    /// Returns whether a deletion was queued.
    pub fn cancel_deletion(&mut self, id: ChainId) -> bool {
        let queued = self.to_delete.len();
        self.to_delete.retain(|&pending| pending != id);
        self.to_delete.len() != queued
    }

    /// Queues a chain to be affected at the next commit.
    pub fn queue_affect(&mut self, id: ChainId) {
        self.to_affect.push(id);
    }

    /// Whether any deletion or affect is waiting for a commit.
    pub fn has_pending_mutations(&self) -> bool {
        !self.to_delete.is_empty() || !self.to_affect.is_empty()
    }

    /// Applies every queued deletion and affect.
    ///
    /// Deleted chains release their boundary terminals in the cached local
    /// graphs, local path vertices queued by writes are removed, and every
    /// touched boundary table is refreshed. Neighbor caches are dropped.
    pub fn commit_pending_mutations(&mut self) -> PatchbayResult<CommitSummary> {
        let mut summary = CommitSummary::default();
        let mut touched = BTreeSet::new();

        for id in std::mem::take(&mut self.to_delete) {
            let Some(chain) = self.chains.get_mut(id.index()).and_then(Option::take) else {
                continue;
            };
            summary.deleted += 1;
            for port in chain.ports() {
                let Some(block) = port.block_label() else {
                    continue;
                };
                if let Some(graph) = self.local_graphs.get_mut(block) {
                    if graph.remove_vertex(&port.terminal) {
                        summary.local_vertices += 1;
                        touched.insert(block.to_string());
                    }
                }
            }
        }

        for id in std::mem::take(&mut self.to_affect) {
            if let Some(chain) = self.chain_mut(id) {
                if !chain.is_affected() {
                    chain.affect();
                    summary.affected += 1;
                }
            }
        }

        for (label, graph) in self.local_graphs.iter_mut() {
            if graph.has_pending_removals() || touched.contains(label) {
                summary.local_vertices += graph.apply_pending_removals()?;
            }
        }

        self.neighbor_cache.clear();
        tracing::debug!(
            deleted = summary.deleted,
            affected = summary.affected,
            local_vertices = summary.local_vertices,
            "committed graph mutations"
        );
        Ok(summary)
    }

    /// Records a block label or pad pattern in the used-block registry.
    ///
    /// Returns `false` if it was already recorded.
    pub fn mark_block_used(&mut self, entry: &str) -> Result<bool, regex::Error> {
        self.used.insert(entry)
    }

    /// Queues a chain for a weight increase. Duplicates collapse.
    pub fn queue_reinforcement(&mut self, id: ChainId) {
        if !self.to_reinforce.contains(&id) {
            self.to_reinforce.push(id);
        }
    }

    /// Adds `step` to the weight of every queued chain and clears the queue.
    ///
    /// Returns the number of chains reinforced.
    pub fn apply_weight_reinforcement(&mut self, step: u32) -> usize {
        let mut reinforced = 0;
        for id in std::mem::take(&mut self.to_reinforce) {
            if let Some(chain) = self.chain_mut(id) {
                chain.add_weight(step);
                reinforced += 1;
            }
        }
        reinforced
    }

    /// Spends `key` in `block` and drops every chain attached to a boundary
    /// terminal the key freed.
    ///
    /// Returns the number of chains removed. A block without a description
    /// has no keys to spend.
    pub fn consume_key(&mut self, block: &str, key: u32) -> PatchbayResult<usize> {
        if !self.ensure_local(block) {
            tracing::warn!(block, key, "cannot spend key of undescribed block");
            return Ok(0);
        }
        let freed = match self.local_graphs.get_mut(block) {
            Some(graph) => graph.delete_key(key, true)?,
            None => return Ok(0),
        };

        let labels: Vec<String> = freed.iter().map(|t| format!("{block}.{t}")).collect();
        let mut removed = 0;
        for index in 0..self.chains.len() {
            let doomed = self
                .chain(chain_id(index))
                .is_some_and(|chain| labels.iter().any(|l| chain.has_port(l)));
            if doomed {
                self.chains[index] = None;
                removed += 1;
            }
        }
        self.neighbor_cache.clear();
        Ok(removed)
    }
}
