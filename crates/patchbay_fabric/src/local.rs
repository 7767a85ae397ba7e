//! The switch fabric inside one functional block.
//!
//! A [`LocalBlockGraph`] holds at most [`MAX_LOCAL_VERTICES`] vertices. The
//! first [`BOUNDARY_TERMINALS`] slots are reserved for the boundary terminals
//! `n1`..`n26`, which are the points chains attach to; internal vertices take
//! the remaining slots. Every edge has unit weight and carries the key that
//! closes the corresponding switch.
//!
//! The global search never runs a local search on its hot path: it reads the
//! cached boundary distance table through [`LocalBlockGraph::get_weight`].
//! The table is recomputed by [`LocalBlockGraph::refresh_boundary_distances`]
//! after every deletion.

use crate::error::FabricError;
use crate::heap::PriorityQueue;
use crate::kind::BlockKind;
use crate::port::BlockRef;
use crate::vertex::{Vertex, UNREACHED};
use patchbay_common::{InternalError, PatchbayResult};
use std::collections::{BTreeSet, HashMap};

/// Vertex capacity of a block graph.
pub const MAX_LOCAL_VERTICES: usize = 54;

/// Number of boundary terminals (`n1`..`n26`).
pub const BOUNDARY_TERMINALS: usize = 26;

/// Every local search settles each vertex once; anything beyond this is a bug.
const LOCAL_ITERATION_CAP: usize = MAX_LOCAL_VERTICES * MAX_LOCAL_VERTICES;

type Matrix<T> = [[T; MAX_LOCAL_VERTICES]; MAX_LOCAL_VERTICES];

/// Maps a boundary terminal label (`n1`..`n26`) to its slot.
pub fn boundary_index(label: &str) -> Option<usize> {
    let number: usize = label.strip_prefix('n')?.parse().ok()?;
    if label.starts_with("n0") || !(1..=BOUNDARY_TERMINALS).contains(&number) {
        return None;
    }
    Some(number - 1)
}

fn boundary_label(slot: usize) -> String {
    format!("n{}", slot + 1)
}

/// A fixed-size graph internal to one block.
#[derive(Debug, Clone)]
pub struct LocalBlockGraph {
    label: String,
    base_id: u32,
    kind: BlockKind,
    vertices: Vec<Option<Vertex>>,
    index: HashMap<String, usize>,
    adjacency: Box<Matrix<u32>>,
    edge_keys: Box<Matrix<Option<u32>>>,
    boundary: Box<[[u32; BOUNDARY_TERMINALS]; BOUNDARY_TERMINALS]>,
    pending_removals: BTreeSet<usize>,
}

impl LocalBlockGraph {
    /// Builds a block graph from its adjacency description.
    ///
    /// Each line has the form `A -- B [-- C ...] : key`; every pair of
    /// contiguous node tokens becomes a unit-weight edge carrying `key`.
    /// Blank lines and `#` comments are skipped.
    pub fn build(label: &str, description: &str) -> Result<Self, FabricError> {
        let block =
            BlockRef::parse(label).ok_or_else(|| FabricError::BadBlockLabel(label.to_string()))?;
        let mut graph = Self {
            label: block.label,
            base_id: block.base_id,
            kind: block.kind,
            vertices: vec![None; MAX_LOCAL_VERTICES],
            index: HashMap::new(),
            adjacency: Box::new([[0; MAX_LOCAL_VERTICES]; MAX_LOCAL_VERTICES]),
            edge_keys: Box::new([[None; MAX_LOCAL_VERTICES]; MAX_LOCAL_VERTICES]),
            boundary: Box::new([[0; BOUNDARY_TERMINALS]; BOUNDARY_TERMINALS]),
            pending_removals: BTreeSet::new(),
        };

        for (line_no, raw) in description.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            graph.parse_line(line, line_no + 1)?;
        }

        graph.refresh_boundary_distances()?;
        tracing::debug!(
            block = %graph.label,
            vertices = graph.live_vertex_count(),
            "built block graph"
        );
        Ok(graph)
    }

    fn parse_line(&mut self, line: &str, line_no: usize) -> Result<(), FabricError> {
        let block = self.label.clone();
        let malformed = |reason: &str| FabricError::MalformedAdjacency {
            block: block.clone(),
            line: line_no,
            reason: reason.to_string(),
        };

        let (nodes, key) = line
            .rsplit_once(':')
            .ok_or_else(|| malformed("missing ':' before key"))?;
        let key: u32 = key
            .trim()
            .parse()
            .map_err(|_| malformed("key is not a non-negative integer"))?;
        let nodes: Vec<&str> = nodes.split_whitespace().filter(|t| *t != "--").collect();
        if nodes.len() < 2 {
            return Err(malformed("an edge needs at least two nodes"));
        }

        for pair in nodes.windows(2) {
            if pair[0] == pair[1] {
                return Err(malformed("self-loop"));
            }
            let a = self.intern(pair[0])?;
            let b = self.intern(pair[1])?;
            self.adjacency[a][b] = 1;
            self.adjacency[b][a] = 1;
            self.edge_keys[a][b] = Some(key);
            self.edge_keys[b][a] = Some(key);
        }
        Ok(())
    }

    fn intern(&mut self, label: &str) -> Result<usize, FabricError> {
        if let Some(&slot) = self.index.get(label) {
            return Ok(slot);
        }
        let slot = match boundary_index(label) {
            Some(slot) => slot,
            None => (BOUNDARY_TERMINALS..MAX_LOCAL_VERTICES)
                .find(|&slot| self.vertices[slot].is_none())
                .ok_or_else(|| FabricError::TooManyVertices {
                    block: self.label.clone(),
                    limit: MAX_LOCAL_VERTICES,
                })?,
        };
        self.vertices[slot] = Some(Vertex::new(label));
        self.index.insert(label.to_string(), slot);
        Ok(slot)
    }

    /// The block label, e.g. `CAU<10`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The numeric base id added to every emitted key.
    pub fn base_id(&self) -> u32 {
        self.base_id
    }

    /// The block kind.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Number of vertices not yet deleted.
    pub fn live_vertex_count(&self) -> usize {
        self.vertices
            .iter()
            .flatten()
            .filter(|v| v.is_live())
            .count()
    }

    /// Whether `label` names a live vertex.
    pub fn has_vertex(&self, label: &str) -> bool {
        self.live_slot(label).is_some()
    }

    /// The key on the edge between two vertices, if the edge exists.
    pub fn edge_key(&self, a: &str, b: &str) -> Option<u32> {
        let (a, b) = (self.live_slot(a)?, self.live_slot(b)?);
        if self.adjacency[a][b] == 0 {
            return None;
        }
        self.edge_keys[a][b]
    }

    fn live_slot(&self, label: &str) -> Option<usize> {
        let slot = *self.index.get(label)?;
        self.is_live(slot).then_some(slot)
    }

    fn is_live(&self, slot: usize) -> bool {
        self.vertices[slot].as_ref().is_some_and(Vertex::is_live)
    }

    /// Live and not claimed by a path written since the last removal pass.
    fn is_free(&self, slot: usize) -> bool {
        self.is_live(slot) && !self.pending_removals.contains(&slot)
    }

    fn free_slot(&self, label: &str) -> Option<usize> {
        let slot = *self.index.get(label)?;
        self.is_free(slot).then_some(slot)
    }

    fn distance(&self, slot: usize) -> u32 {
        self.vertices[slot].as_ref().map_or(UNREACHED, |v| v.distance)
    }

    /// Unit-weight Dijkstra from `source` over the live vertex set.
    fn run_dijkstra(&mut self, source: usize) -> PatchbayResult<()> {
        for vertex in self.vertices.iter_mut().flatten() {
            vertex.reset();
        }
        let Some(origin) = self.vertices[source].as_mut() else {
            return Ok(());
        };
        origin.distance = 0;

        let mut queue = PriorityQueue::with_capacity(MAX_LOCAL_VERTICES);
        queue.insert_or_decrease(source, 0);
        let mut iterations = 0;

        while let Some(u) = queue.extract_min() {
            iterations += 1;
            if iterations > LOCAL_ITERATION_CAP {
                return Err(InternalError::iteration_cap(
                    &format!("block {} search", self.label),
                    LOCAL_ITERATION_CAP,
                ));
            }
            let du = match self.vertices[u].as_mut() {
                Some(vertex) if !vertex.visited => {
                    vertex.visited = true;
                    vertex.distance
                }
                _ => continue,
            };
            for v in 0..MAX_LOCAL_VERTICES {
                let weight = self.adjacency[u][v];
                if weight == 0 || !self.is_free(v) {
                    continue;
                }
                let Some(vertex) = self.vertices[v].as_mut() else {
                    continue;
                };
                let candidate = du + weight;
                if !vertex.visited && candidate < vertex.distance {
                    vertex.distance = candidate;
                    queue.insert_or_decrease(v, candidate);
                }
            }
        }
        Ok(())
    }

    /// Length of the shortest live path between two vertices, or 0 if none.
    pub fn shortest_path(&mut self, from: &str, to: &str) -> PatchbayResult<u32> {
        let (Some(from), Some(to)) = (self.live_slot(from), self.live_slot(to)) else {
            return Ok(0);
        };
        self.run_dijkstra(from)?;
        let distance = self.distance(to);
        Ok(if distance == UNREACHED { 0 } else { distance })
    }

    /// Emits the keys realizing a shortest path from `from` to `to`.
    ///
    /// Keys come back in traversal order from `from` to `to`, each offset by
    /// the block's base id. Every vertex on the path is queued for removal by
    /// [`apply_pending_removals`](Self::apply_pending_removals) and cannot be
    /// reused by another write before then. An unreachable pair emits
    /// nothing.
    pub fn write_config_path(&mut self, from: &str, to: &str) -> PatchbayResult<Vec<u32>> {
        let (Some(from), Some(to)) = (self.free_slot(from), self.free_slot(to)) else {
            return Ok(Vec::new());
        };
        self.run_dijkstra(from)?;
        if self.distance(to) == UNREACHED {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            if path.len() > MAX_LOCAL_VERTICES {
                return Err(InternalError::iteration_cap(
                    &format!("block {} path walk", self.label),
                    MAX_LOCAL_VERTICES,
                ));
            }
            let here = self.distance(current);
            let predecessor = (0..MAX_LOCAL_VERTICES).find(|&p| {
                let weight = self.adjacency[current][p];
                weight > 0
                    && self.is_free(p)
                    && self.distance(p) != UNREACHED
                    && here.checked_sub(self.distance(p)) == Some(weight)
            });
            let Some(predecessor) = predecessor else {
                return Err(InternalError::new(format!(
                    "block {}: no tight predecessor for vertex {}",
                    self.label, current
                )));
            };
            let key = self.edge_keys[current][predecessor].ok_or_else(|| {
                InternalError::new(format!("block {}: edge without a key", self.label))
            })?;
            keys.push(self.base_id + key);
            path.push(predecessor);
            current = predecessor;
        }

        keys.reverse();
        self.pending_removals.extend(path);
        Ok(keys)
    }

    /// Deletes every vertex incident to an edge carrying `key`.
    ///
    /// Refreshes the boundary table. When `cascade_to_global` is set, the
    /// labels of the freed boundary terminals are returned so the owner can
    /// drop the chains attached to them; otherwise the result is empty.
    pub fn delete_key(&mut self, key: u32, cascade_to_global: bool) -> PatchbayResult<Vec<String>> {
        let mut doomed = BTreeSet::new();
        for a in 0..MAX_LOCAL_VERTICES {
            for b in 0..MAX_LOCAL_VERTICES {
                if self.adjacency[a][b] > 0 && self.edge_keys[a][b] == Some(key) {
                    doomed.insert(a);
                    doomed.insert(b);
                }
            }
        }
        for &slot in &doomed {
            self.remove_slot(slot);
        }
        self.refresh_boundary_distances()?;

        tracing::debug!(block = %self.label, key, removed = doomed.len(), "deleted key");
        if !cascade_to_global {
            return Ok(Vec::new());
        }
        Ok(doomed
            .into_iter()
            .filter(|&slot| slot < BOUNDARY_TERMINALS)
            .map(boundary_label)
            .collect())
    }

    /// Removes one vertex by label without refreshing the boundary table.
    ///
    /// Returns whether a live vertex was removed.
    pub fn remove_vertex(&mut self, label: &str) -> bool {
        match self.live_slot(label) {
            Some(slot) => {
                self.remove_slot(slot);
                true
            }
            None => false,
        }
    }

    fn remove_slot(&mut self, slot: usize) {
        for other in 0..MAX_LOCAL_VERTICES {
            self.adjacency[slot][other] = 0;
            self.adjacency[other][slot] = 0;
        }
        if let Some(vertex) = self.vertices[slot].as_mut() {
            vertex.deleted = true;
        }
    }

    /// Whether any vertices are queued by [`write_config_path`](Self::write_config_path).
    pub fn has_pending_removals(&self) -> bool {
        !self.pending_removals.is_empty()
    }

    /// Removes every queued vertex and refreshes the boundary table.
    ///
    /// Returns the number of vertices removed.
    pub fn apply_pending_removals(&mut self) -> PatchbayResult<usize> {
        let pending = std::mem::take(&mut self.pending_removals);
        let mut removed = 0;
        for slot in pending {
            if self.is_live(slot) {
                self.remove_slot(slot);
                removed += 1;
            }
        }
        self.refresh_boundary_distances()?;
        Ok(removed)
    }

    /// Recomputes the distance table between all boundary terminals.
    pub fn refresh_boundary_distances(&mut self) -> PatchbayResult<()> {
        for i in 0..BOUNDARY_TERMINALS {
            if !self.is_live(i) {
                self.boundary[i] = [0; BOUNDARY_TERMINALS];
                continue;
            }
            self.run_dijkstra(i)?;
            for j in 0..BOUNDARY_TERMINALS {
                let distance = self.distance(j);
                self.boundary[i][j] = if i != j && self.is_live(j) && distance != UNREACHED {
                    distance
                } else {
                    0
                };
            }
        }
        Ok(())
    }

    /// Cached boundary distance between two terminals; 0 means no path.
    ///
    /// Labels that are not boundary terminals also yield 0.
    pub fn get_weight(&self, from: &str, to: &str) -> u32 {
        match (boundary_index(from), boundary_index(to)) {
            (Some(i), Some(j)) => self.boundary[i][j],
            _ => 0,
        }
    }
}
