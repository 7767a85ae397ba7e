//! Configuration-path router for the Patchbay analog test fabric.
//!
//! Given a circuit and a fabric, this crate finds for every required
//! connection a path through unused switchable resources, emits the keys
//! that close the switches along it, and consumes those resources so later
//! connections cannot reuse them.
//!
//! # Pipeline
//!
//! 1. **Plan**: [`plan_connections`] turns circuit nets into point-to-point
//!    connections.
//! 2. **Resolve**: the [`Resolver`] maps each terminal to a pattern over
//!    fabric port labels.
//! 3. **Search**: [`GlobalChainGraph::dijkstra_to_pattern`] finds the
//!    cheapest chain path, pricing each hop from the cached boundary
//!    distances of the local block graphs.
//! 4. **Consume**: the path is written into its blocks, the keys are
//!    recorded, and [`GlobalChainGraph::commit_pending_mutations`] removes
//!    the spent resources.
//! 5. **Retry**: the [`RoutingSession`] reruns failed attempts on a
//!    checkpoint whose contested chains have been made heavier.
//!
//! # Usage
//!
//! ```ignore
//! use patchbay_route::{route_circuit, InMemoryCircuit};
//!
//! let circuit = InMemoryCircuit::load(&circuit_path)?;
//! let outcome = route_circuit(&config, &project_dir, &circuit, &sink)?;
//! println!("{:?}", outcome.keys);
//! ```

#![warn(missing_docs)]

pub mod circuit;
pub mod controller;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod mutate;
pub mod parallel;
pub mod plan;
pub mod registry;
pub mod resolver;
pub mod search;

pub use circuit::{CircuitDb, CircuitError, InMemoryCircuit, NodeDescriptor};
pub use controller::{RoutingOutcome, RoutingSession};
pub use error::{FunctionalError, RouteError, StepFailure};
pub use graph::{load_fabric, GlobalChainGraph};
pub use ledger::{write_mapping, KeyLedger, Ledger, UsedLedger};
pub use mutate::CommitSummary;
pub use parallel::{default_threads, select_best, SearchPool};
pub use plan::{plan_connections, Connection};
pub use registry::UsedBlockRegistry;
pub use resolver::{NodeKind, Resolver, Target};
pub use search::{EdgeVia, Lane, PatternMatch, SearchRequest};

use patchbay_config::RouterConfig;
use patchbay_diagnostics::DiagnosticSink;
use std::path::Path;

/// Loads the configured fabric and routes `circuit` on it.
///
/// Ledger files named in the configuration are written as routing
/// proceeds; relative paths are resolved against `project_dir`.
pub fn route_circuit(
    config: &RouterConfig,
    project_dir: &Path,
    circuit: &dyn CircuitDb,
    sink: &DiagnosticSink,
) -> Result<RoutingOutcome, RouteError> {
    let graph = load_fabric(config, project_dir)?;
    let mut session =
        RoutingSession::new(graph, &config.search)?.with_output(&config.output, project_dir);
    session.route(circuit, sink)
}
