//! Configuration types deserialized from `patchbay.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The top-level router configuration parsed from `patchbay.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Project metadata.
    pub project: ProjectMeta,
    /// Fabric description sources.
    pub fabric: FabricConfig,
    /// Retry-loop parameters.
    #[serde(default)]
    pub search: SearchConfig,
    /// Ledger output paths.
    #[serde(default)]
    pub output: OutputConfig,
}

impl RouterConfig {
    /// Resolves a path from the configuration relative to `base`.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(base: &Path, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// A brief description of the test bench.
    #[serde(default)]
    pub description: String,
}

/// Where the global chain description and the block descriptions live.
#[derive(Debug, Clone, Deserialize)]
pub struct FabricConfig {
    /// Path to the global chain description (one chain per line).
    pub chains: String,
    /// Switchable blocks with their adjacency description files.
    #[serde(default)]
    pub blocks: Vec<BlockSource>,
    /// Keys already spent by fixed wiring before routing starts.
    #[serde(default)]
    pub reserved: Vec<ReservedKey>,
}

/// One switchable block and the file describing its internal fabric.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockSource {
    /// The block label, e.g. `"CB<3"`.
    pub label: String,
    /// Path to the adjacency description.
    pub adjacency: String,
}

/// A key consumed before routing begins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReservedKey {
    /// The label of the block owning the key.
    pub block: String,
    /// The key local to its block (before adding the block's base id).
    pub key: u32,
}

/// Parameters of the outer retry loop.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of full routing attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Weight added to a contested chain per reinforcement.
    #[serde(default = "default_reinforcement_step")]
    pub reinforcement_step: u32,
    /// Every this many attempts the whole contested set is reinforced again.
    #[serde(default = "default_reinforcement_period")]
    pub reinforcement_period: u32,
    /// Worker threads for multi-candidate search; defaults to available parallelism + 1.
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_max_attempts() -> u32 {
    45
}

fn default_reinforcement_step() -> u32 {
    4
}

fn default_reinforcement_period() -> u32 {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            reinforcement_step: default_reinforcement_step(),
            reinforcement_period: default_reinforcement_period(),
            threads: None,
        }
    }
}

/// Ledger output locations. Missing entries keep the ledger in memory only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Produced-key ledger, one integer per line.
    #[serde(default)]
    pub key_ledger: Option<String>,
    /// Used-block ledger, one label or pattern per line.
    #[serde(default)]
    pub used_ledger: Option<String>,
    /// Terminal mapping written as JSON.
    #[serde(default)]
    pub mapping: Option<String>,
}
