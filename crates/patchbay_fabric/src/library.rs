//! Pristine block graph templates, keyed by block label.

use crate::description::read_block_description;
use crate::error::FabricError;
use crate::local::LocalBlockGraph;
use std::collections::BTreeMap;
use std::path::Path;

/// Validated block graphs as built from their descriptions.
///
/// Templates are never mutated. A routing session clones a template into its
/// own cache the first time it touches the block.
#[derive(Debug, Clone, Default)]
pub struct BlockLibrary {
    templates: BTreeMap<String, LocalBlockGraph>,
}

impl BlockLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and stores the graph for `label`, replacing any earlier one.
    pub fn insert(&mut self, label: &str, description: &str) -> Result<(), FabricError> {
        let graph = LocalBlockGraph::build(label, description)?;
        self.templates.insert(graph.label().to_string(), graph);
        Ok(())
    }

    /// Reads a block description file and stores its graph under `label`.
    pub fn load(&mut self, label: &str, path: &Path) -> Result<(), FabricError> {
        let description = read_block_description(path)?;
        self.insert(label, &description)
    }

    /// Returns a fresh copy of the template for `label`.
    pub fn instantiate(&self, label: &str) -> Option<LocalBlockGraph> {
        self.templates.get(label).cloned()
    }

    /// The template for `label`, for read-only inspection.
    pub fn template(&self, label: &str) -> Option<&LocalBlockGraph> {
        self.templates.get(label)
    }

    /// Whether a description exists for `label`.
    pub fn contains(&self, label: &str) -> bool {
        self.templates.contains_key(label)
    }

    /// All block labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
