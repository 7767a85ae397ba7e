//! Dijkstra searches over the global chain graph.
//!
//! Edge costs are never stored. When a search relaxes the edge between two
//! chains it looks up the cached boundary distance of every block the chains
//! share and adds the destination chain's weight. Paths are rebuilt
//! backwards by the tight-edge test, taking the first settled predecessor in
//! index order, so equal-cost searches always yield the same path.

use crate::graph::{chain_id, GlobalChainGraph};
use patchbay_common::{ChainId, InternalError, PatchbayResult};
use patchbay_fabric::{Chain, PriorityQueue, MAX_CHAINS, UNREACHED};
use regex::Regex;

/// Every chain is settled at most once per search.
const GLOBAL_ITERATION_CAP: usize = MAX_CHAINS;

/// Which family of chains a search may pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lane {
    /// Chains without ion ports.
    #[default]
    Standard,
    /// Chains with ion ports.
    Ion,
}

impl Lane {
    /// Whether a chain may be entered by a search in this lane.
    pub fn admits(self, chain: &Chain) -> bool {
        chain.is_ion() == (self == Lane::Ion)
    }
}

/// Parameters of a pattern-directed search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Pattern a port of the destination chain must match.
    pub target: Regex,
    /// Chain family the search stays in.
    pub lane: Lane,
    /// Skip ports covered by the used-block registry.
    pub respect_used: bool,
    /// Queue every path chain for deletion (or affect) on success.
    pub do_delete: bool,
    /// Realize the path in the local graphs and return its keys.
    pub do_write: bool,
    /// Affect, rather than delete, shared-reference chains on the path.
    pub spm_affected: bool,
}

impl SearchRequest {
    /// A read-only standard-lane search for `target`.
    pub fn new(target: Regex) -> Self {
        Self {
            target,
            lane: Lane::Standard,
            respect_used: false,
            do_delete: false,
            do_write: false,
            spm_affected: false,
        }
    }

    /// Sets the lane.
    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = lane;
        self
    }

    /// Skips registry-covered ports when matching the target.
    pub fn respecting_used(mut self, respect: bool) -> Self {
        self.respect_used = respect;
        self
    }

    /// Affects shared-reference chains instead of deleting them.
    pub fn affecting_spm(mut self, affected: bool) -> Self {
        self.spm_affected = affected;
        self
    }

    /// Turns a probe into a committing search that writes and deletes.
    pub fn committing(mut self) -> Self {
        self.do_write = true;
        self.do_delete = true;
        self
    }
}

/// A successful pattern-directed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// The chain where the target matched.
    pub vertex: ChainId,
    /// The matching port label.
    pub label: String,
    /// Total path cost from the start chain.
    pub cost: u32,
    /// Chains from start to destination, both included.
    pub path: Vec<ChainId>,
    /// Keys realizing the path, in traversal order. Empty unless writing.
    pub keys: Vec<u32>,
}

/// The cheapest way across one global edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeVia {
    /// The block the edge crosses.
    pub block: String,
    /// Boundary terminal on the source chain's side.
    pub from_terminal: String,
    /// Boundary terminal on the destination chain's side.
    pub to_terminal: String,
    /// Block distance plus the destination chain's weight.
    pub weight: u32,
}

impl GlobalChainGraph {
    /// The first live chain with a port matching `pattern`.
    pub fn find_first_matching(&self, pattern: &Regex) -> Option<ChainId> {
        self.live_chains()
            .find(|(_, chain)| chain.ports().iter().any(|p| pattern.is_match(&p.label)))
            .map(|(id, _)| id)
    }

    /// Every live chain with a port matching `pattern`, in index order.
    pub fn find_all_matching(&self, pattern: &Regex) -> Vec<ChainId> {
        self.live_chains()
            .filter(|(_, chain)| chain.ports().iter().any(|p| pattern.is_match(&p.label)))
            .map(|(id, _)| id)
            .collect()
    }

    /// The first port of `id` matching `pattern`, optionally skipping ports
    /// covered by the used-block registry.
    pub fn matching_port(&self, id: ChainId, pattern: &Regex, respect_used: bool) -> Option<&str> {
        self.chain(id)?
            .ports()
            .iter()
            .map(|p| p.label.as_str())
            .find(|label| pattern.is_match(label) && !(respect_used && self.used.covers(label)))
    }

    /// Live chains sharing a block with `id` and not settled by the current search.
    pub fn neighbors(&mut self, id: ChainId) -> Vec<ChainId> {
        let mut neighbors = self.static_neighbors(id);
        neighbors.retain(|&n| self.chain(n).is_some_and(|c| !c.vertex().visited));
        neighbors
    }

    /// The cheapest crossing from `u` to `v`, or `None` if no shared block
    /// currently connects them.
    pub fn edge_weight(&mut self, u: ChainId, v: ChainId) -> Option<EdgeVia> {
        self.ensure_blocks_of(u);
        self.cached_edge(u, v)
    }

    fn cached_edge(&self, u: ChainId, v: ChainId) -> Option<EdgeVia> {
        let (from, to) = (self.chain(u)?, self.chain(v)?);
        let mut best: Option<EdgeVia> = None;
        for block in from.shared_blocks(to) {
            let Some(graph) = self.local_graphs.get(block) else {
                continue;
            };
            let on_block = |chain: &Chain| {
                chain
                    .ports()
                    .iter()
                    .filter(|p| p.block_label() == Some(block))
                    .map(|p| p.terminal.clone())
                    .collect::<Vec<_>>()
            };
            for a in on_block(from) {
                for b in on_block(to) {
                    let distance = graph.get_weight(&a, &b);
                    if distance == 0 {
                        continue;
                    }
                    let weight = distance.saturating_add(to.weight());
                    if best.as_ref().map_or(true, |e| weight < e.weight) {
                        best = Some(EdgeVia {
                            block: block.to_string(),
                            from_terminal: a.clone(),
                            to_terminal: b,
                            weight,
                        });
                    }
                }
            }
        }
        best
    }

    fn reset_vertices(&mut self) {
        for chain in self.chains.iter_mut().flatten() {
            chain.vertex_mut().reset();
        }
    }

    fn distance(&self, id: ChainId) -> u32 {
        self.chain(id).map_or(UNREACHED, |c| c.vertex().distance)
    }

    fn is_settled(&self, id: ChainId) -> bool {
        self.chain(id).is_some_and(|c| c.vertex().visited)
    }

    /// Settles chains outward from `start` until `goal` accepts one.
    ///
    /// `goal` sees each chain as it is dequeued, the start chain included,
    /// and returns the matching label to stop the search.
    fn settle_until<G>(
        &mut self,
        start: ChainId,
        lane: Option<Lane>,
        mut goal: G,
    ) -> PatchbayResult<Option<(ChainId, String)>>
    where
        G: FnMut(&Self, ChainId) -> Option<String>,
    {
        self.reset_vertices();
        let Some(origin) = self.chain_mut(start) else {
            return Ok(None);
        };
        origin.vertex_mut().distance = 0;

        let mut queue = PriorityQueue::with_capacity(self.chains.len());
        queue.insert_or_decrease(start.index(), 0);
        let mut iterations = 0;

        while let Some(raw) = queue.extract_min() {
            iterations += 1;
            if iterations > GLOBAL_ITERATION_CAP {
                return Err(InternalError::iteration_cap(
                    "global chain search",
                    GLOBAL_ITERATION_CAP,
                ));
            }
            let u = chain_id(raw);
            let du = match self.chain_mut(u) {
                Some(chain) if !chain.vertex().visited => {
                    chain.vertex_mut().visited = true;
                    chain.vertex().distance
                }
                _ => continue,
            };
            if let Some(label) = goal(&*self, u) {
                return Ok(Some((u, label)));
            }

            self.ensure_blocks_of(u);
            for v in self.neighbors(u) {
                if let (Some(lane), Some(chain)) = (lane, self.chain(v)) {
                    if !lane.admits(chain) {
                        continue;
                    }
                }
                let Some(edge) = self.cached_edge(u, v) else {
                    continue;
                };
                let candidate = du.saturating_add(edge.weight);
                if let Some(chain) = self.chain_mut(v) {
                    let vertex = chain.vertex_mut();
                    if !vertex.visited && candidate < vertex.distance {
                        vertex.distance = candidate;
                        queue.insert_or_decrease(v.index(), candidate);
                    }
                }
            }
        }
        Ok(None)
    }

    /// Walks tight edges back from `end` to `start` after a search.
    fn reconstruct_path(&mut self, start: ChainId, end: ChainId) -> PatchbayResult<Vec<ChainId>> {
        let mut path = vec![end];
        let mut current = end;
        while current != start {
            if path.len() > self.chains.len() {
                return Err(InternalError::iteration_cap(
                    "global path walk",
                    self.chains.len(),
                ));
            }
            let here = self.distance(current);
            let predecessor = self
                .static_neighbors(current)
                .into_iter()
                .filter(|&p| self.is_settled(p))
                .find(|&p| {
                    let there = self.distance(p);
                    self.cached_edge(p, current)
                        .is_some_and(|e| here.checked_sub(there) == Some(e.weight))
                });
            let Some(predecessor) = predecessor else {
                return Err(InternalError::new(format!(
                    "no tight predecessor for chain {current} on the path from {start}"
                )));
            };
            path.push(predecessor);
            current = predecessor;
        }
        path.reverse();
        Ok(path)
    }

    fn queue_path_mutations(&mut self, path: &[ChainId], spm_affected: bool) {
        for &id in path {
            let affect = spm_affected && self.chain(id).is_some_and(Chain::is_spm);
            if affect {
                self.to_affect.push(id);
            } else {
                self.to_delete.push(id);
            }
        }
    }

    /// Runs the crossing of every path edge in its block's local graph.
    ///
    /// Edges are resolved before any crossing is written, since writing
    /// claims local vertices. A later crossing of the same block cannot
    /// reuse a vertex an earlier one claimed.
    fn write_path(&mut self, path: &[ChainId]) -> PatchbayResult<Vec<u32>> {
        let edges = path
            .windows(2)
            .map(|pair| {
                self.cached_edge(pair[0], pair[1]).ok_or_else(|| {
                    InternalError::new(format!("path edge {} -> {} vanished", pair[0], pair[1]))
                })
            })
            .collect::<PatchbayResult<Vec<_>>>()?;

        let mut keys = Vec::new();
        for edge in edges {
            let graph = self.local_graphs.get_mut(&edge.block).ok_or_else(|| {
                InternalError::new(format!("block {} left the cache mid-search", edge.block))
            })?;
            let crossing = graph.write_config_path(&edge.from_terminal, &edge.to_terminal)?;
            if crossing.is_empty() {
                return Err(InternalError::new(format!(
                    "block {}: crossing {} -> {} collides with an earlier hop",
                    edge.block, edge.from_terminal, edge.to_terminal
                )));
            }
            keys.extend(crossing);
        }
        Ok(keys)
    }

    /// Shortest path between two fixed chains.
    ///
    /// Returns whether `end` was reached. With `do_delete`, every chain on
    /// the path is queued for deletion.
    pub fn dijkstra_to_target(
        &mut self,
        start: ChainId,
        end: ChainId,
        do_delete: bool,
    ) -> PatchbayResult<bool> {
        let found = self.settle_until(start, None, |_, id| (id == end).then(String::new))?;
        if found.is_none() {
            return Ok(false);
        }
        let path = self.reconstruct_path(start, end)?;
        if do_delete {
            self.queue_path_mutations(&path, false);
        }
        Ok(true)
    }

    /// Shortest path from `start` to the nearest chain with a port matching
    /// the request's target.
    ///
    /// `None` means no such chain is reachable.
    pub fn dijkstra_to_pattern(
        &mut self,
        start: ChainId,
        request: &SearchRequest,
    ) -> PatchbayResult<Option<PatternMatch>> {
        let target = &request.target;
        let respect_used = request.respect_used;
        let found = self.settle_until(start, Some(request.lane), |graph, id| {
            graph
                .matching_port(id, target, respect_used)
                .map(str::to_string)
        })?;
        let Some((vertex, label)) = found else {
            tracing::trace!(start = %start, target = %target, "pattern unreachable");
            return Ok(None);
        };

        let cost = self.distance(vertex);
        let path = self.reconstruct_path(start, vertex)?;
        let keys = if request.do_write {
            self.write_path(&path)?
        } else {
            Vec::new()
        };
        if request.do_delete {
            self.queue_path_mutations(&path, request.spm_affected);
        }
        tracing::debug!(
            start = %start,
            matched = %label,
            cost,
            hops = path.len(),
            keys = keys.len(),
            "pattern search landed"
        );
        Ok(Some(PatternMatch {
            vertex,
            label,
            cost,
            path,
            keys,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_fabric::{parse_chain_description, BlockLibrary};
    use std::sync::Arc;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    fn graph(chains: &str, blocks: &[(&str, &str)]) -> GlobalChainGraph {
        let chains = parse_chain_description(chains).unwrap();
        let mut library = BlockLibrary::new();
        for (label, description) in blocks {
            library.insert(label, description).unwrap();
        }
        GlobalChainGraph::new("test", chains, Arc::new(library))
    }

    fn id(raw: u32) -> ChainId {
        ChainId::from_raw(raw)
    }

    /// Four chains around two crossbars; the CB<1 route is shorter.
    fn diamond() -> GlobalChainGraph {
        graph(
            "PPC<20.PX1 CB<1.n1 CB<2.n1\n\
             CB<1.n2 CAU<10.n1\n\
             CB<2.n2 CAU<10.n2\n\
             CB<1.n3 CB<2.n3 PPC<21.PY1\n",
            &[
                ("CB<1", "n1 -- n2 : 1\nn2 -- n3 : 2\nn1 -- n3 : 5\n"),
                ("CB<2", "n1 -- h1 -- h2 -- n3 : 1\nn1 -- n2 : 2\n"),
            ],
        )
    }

    #[test]
    fn find_matching_in_index_order() {
        let g = diamond();
        assert_eq!(g.find_first_matching(&re(r"^CB<2\.")), Some(id(0)));
        assert_eq!(g.find_all_matching(&re(r"^CB<2\.")), vec![id(0), id(2), id(3)]);
        assert_eq!(g.find_first_matching(&re("^ION")), None);
    }

    #[test]
    fn matching_port_honours_registry() {
        let mut g = diamond();
        g.used.insert("CB<1").unwrap();
        assert_eq!(g.matching_port(id(0), &re("^CB<"), false), Some("CB<1.n1"));
        assert_eq!(g.matching_port(id(0), &re("^CB<"), true), Some("CB<2.n1"));
    }

    #[test]
    fn edge_weight_takes_cheapest_block() {
        let mut g = diamond();
        let edge = g.edge_weight(id(0), id(3)).unwrap();
        // CB<1: n1 -- n3 direct (1) beats CB<2's three hops.
        assert_eq!(edge.block, "CB<1");
        assert_eq!((edge.from_terminal.as_str(), edge.to_terminal.as_str()), ("n1", "n3"));
        assert_eq!(edge.weight, 2);
        assert!(g.edge_weight(id(1), id(2)).is_none());
    }

    #[test]
    fn neighbors_exclude_self_and_settled() {
        let mut g = diamond();
        assert_eq!(g.neighbors(id(0)), vec![id(1), id(2), id(3)]);
        g.chain_mut(id(1)).unwrap().vertex_mut().visited = true;
        assert_eq!(g.neighbors(id(0)), vec![id(2), id(3)]);
    }

    #[test]
    fn target_search_is_repeatable() {
        let mut a = diamond();
        let mut b = a.snapshot();
        assert!(a.dijkstra_to_target(id(0), id(3), false).unwrap());
        assert!(b.dijkstra_to_target(id(0), id(3), false).unwrap());
        assert_eq!(a.distance_of(id(3)), Some(2));
        assert_eq!(a.distance_of(id(3)), b.distance_of(id(3)));
        assert!(a.dijkstra_to_target(id(0), id(3), false).unwrap());
        assert_eq!(a.distance_of(id(3)), Some(2));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn target_search_queues_deletion() {
        let mut g = diamond();
        assert!(g.dijkstra_to_target(id(0), id(3), true).unwrap());
        assert_eq!(g.to_delete, vec![id(0), id(3)]);
    }

    #[test]
    fn start_chain_can_match_itself() {
        let mut g = diamond();
        let found = g
            .dijkstra_to_pattern(id(0), &SearchRequest::new(re(r"^PPC<20\.PX")))
            .unwrap()
            .unwrap();
        assert_eq!(found.cost, 0);
        assert_eq!(found.path, vec![id(0)]);
    }

    #[test]
    fn pattern_search_writes_keys_in_order() {
        let mut g = diamond();
        let request = SearchRequest::new(re(r"^CAU<10\.n1$")).committing();
        let found = g.dijkstra_to_pattern(id(0), &request).unwrap().unwrap();
        assert_eq!(found.vertex, id(1));
        assert_eq!(found.path, vec![id(0), id(1)]);
        assert_eq!(found.cost, 2);
        assert_eq!(found.keys, vec![2]);
        assert_eq!(g.to_delete, vec![id(0), id(1)]);
    }

    #[test]
    fn unreachable_pattern_is_none() {
        let mut g = diamond();
        let request = SearchRequest::new(re("^RES<"));
        assert!(g.dijkstra_to_pattern(id(0), &request).unwrap().is_none());
        assert!(g.to_delete.is_empty());
    }

    #[test]
    fn ion_lane_skips_standard_chains() {
        let mut g = graph(
            "ION<40.n1 CB<1.n1\nCB<1.n2 PPC<20.PX1\nCB<1.n3 ION<41.n1 PPC<21.PX1\n",
            &[("CB<1", "n1 -- n2 : 1\nn1 -- h -- n3 : 2\n")],
        );
        let standard = g
            .dijkstra_to_pattern(id(0), &SearchRequest::new(re("^PPC<")))
            .unwrap()
            .unwrap();
        assert_eq!(standard.label, "PPC<20.PX1");

        let ion = SearchRequest::new(re("^PPC<")).with_lane(Lane::Ion);
        let found = g.dijkstra_to_pattern(id(0), &ion).unwrap().unwrap();
        assert_eq!(found.label, "PPC<21.PX1");
        assert_eq!(found.cost, 3);
    }

    /// A path that leaves CB<1, crosses CB<2 and re-enters CB<1.
    const REENTRANT: &str = "CB<1.n1\nCB<1.n2 CB<2.n1\nCB<2.n2 CB<1.n3\nCB<1.n4 PPC<20.PX1\n";
    const HUB: &str = "n1 -- h1 : 1\nh1 -- n2 : 2\nn3 -- h1 : 3\nh1 -- n4 : 4\n";

    fn reentrant(cb1: &str) -> GlobalChainGraph {
        let mut g = graph(REENTRANT, &[("CB<1", cb1), ("CB<2", "n1 -- n2 : 1\n")]);
        g.edge_weight(id(0), id(1)).unwrap();
        g.edge_weight(id(1), id(2)).unwrap();
        g
    }

    #[test]
    fn second_crossing_of_a_block_avoids_claimed_vertices() {
        let path = [id(0), id(1), id(2), id(3)];

        let mut shared = reentrant(HUB);
        let err = shared.write_path(&path).unwrap_err();
        assert!(err.message.contains("collides"), "{}", err.message);

        let mut g = reentrant(&format!("{HUB}n3 -- h2 -- n4 : 5\n"));
        assert_eq!(g.write_path(&path).unwrap(), vec![2, 3, 3, 6, 6]);
    }

    #[test]
    fn spm_chains_are_affected() {
        let mut g = graph(
            "PPC<20.PX1 CB<1.n1\nCB<1.n2 SPM<50.n1 CB<2.n1\nCB<2.n2 PPC<21.PX1\n",
            &[("CB<1", "n1 -- n2 : 1\n"), ("CB<2", "n1 -- n2 : 1\n")],
        );
        let request = SearchRequest::new(re(r"^PPC<21\."))
            .affecting_spm(true)
            .committing();
        let found = g.dijkstra_to_pattern(id(0), &request).unwrap().unwrap();
        assert_eq!(found.keys, vec![2, 3]);
        assert_eq!(g.to_delete, vec![id(0), id(2)]);
        assert_eq!(g.to_affect, vec![id(1)]);
    }
}
