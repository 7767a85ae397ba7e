//! The routing session: attempts, retries and weight reinforcement.
//!
//! A session keeps a checkpoint graph. Every attempt routes the whole plan
//! on a fresh snapshot of it. When a connection cannot be routed the
//! snapshot is thrown away, the failed connection is probed on the
//! checkpoint without consuming anything, and the chains on the probe path
//! get heavier so the connections that crowded them out look elsewhere on
//! the next attempt. A successful attempt's snapshot becomes the new
//! checkpoint.

use crate::circuit::CircuitDb;
use crate::error::{FunctionalError, RouteError, StepFailure};
use crate::graph::GlobalChainGraph;
use crate::ledger::{write_mapping, KeyLedger, UsedLedger};
use crate::parallel::{select_best, SearchPool};
use crate::plan::{plan_connections, Connection};
use crate::resolver::{affects_references, lane_for, Resolver, Target};
use crate::search::SearchRequest;
use patchbay_common::{ChainId, ContentHash, InternalError, PatchbayResult, TerminalId};
use patchbay_config::{OutputConfig, RouterConfig, SearchConfig};
use patchbay_diagnostics::{codes, Diagnostic, DiagnosticSink};
use patchbay_fabric::Port;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A completed routing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingOutcome {
    /// Every key emitted, in connection order.
    pub keys: Vec<u32>,
    /// Circuit terminal label to the fabric port it landed on.
    pub mapping: BTreeMap<String, String>,
    /// Used-block entries recorded by the successful attempt.
    pub used: Vec<String>,
    /// Attempts it took, counting the successful one.
    pub attempts: u32,
    /// Fingerprint of the resulting graph.
    pub fingerprint: ContentHash,
}

/// Why an attempt stopped.
enum AttemptError {
    /// A connection found no path; the attempt is retried.
    Step {
        failure: StepFailure,
        from: Box<Target>,
        to: Box<Target>,
    },
    /// Anything else ends the task.
    Fatal(RouteError),
}

impl From<RouteError> for AttemptError {
    fn from(err: RouteError) -> Self {
        AttemptError::Fatal(err)
    }
}

impl From<FunctionalError> for AttemptError {
    fn from(err: FunctionalError) -> Self {
        AttemptError::Fatal(err.into())
    }
}

impl From<InternalError> for AttemptError {
    fn from(err: InternalError) -> Self {
        AttemptError::Fatal(err.into())
    }
}

/// Where a net's latest connection landed.
struct NetTail {
    terminal: TerminalId,
    chain: ChainId,
    port: String,
}

/// Owns everything one routing task needs.
#[derive(Debug)]
pub struct RoutingSession {
    checkpoint: GlobalChainGraph,
    search: SearchConfig,
    pool: SearchPool,
    resolver: Resolver,
    keys: KeyLedger,
    used: UsedLedger,
    mapping: BTreeMap<String, String>,
    mapping_path: Option<PathBuf>,
    contested: BTreeSet<ChainId>,
}

impl RoutingSession {
    /// Creates a session over `graph` with in-memory ledgers.
    pub fn new(graph: GlobalChainGraph, search: &SearchConfig) -> Result<Self, RouteError> {
        let pool = SearchPool::new(search.threads)?;
        tracing::debug!(threads = pool.threads(), "search pool ready");
        Ok(Self {
            checkpoint: graph,
            search: search.clone(),
            pool,
            resolver: Resolver::new(),
            keys: KeyLedger::in_memory(),
            used: UsedLedger::in_memory(),
            mapping: BTreeMap::new(),
            mapping_path: None,
            contested: BTreeSet::new(),
        })
    }

    /// Mirrors the ledgers to the files named in `output`, resolved
    /// against `base_dir`.
    pub fn with_output(mut self, output: &OutputConfig, base_dir: &Path) -> Self {
        let resolve = |path: &String| RouterConfig::resolve_path(base_dir, path);
        if let Some(path) = output.key_ledger.as_ref().map(resolve) {
            self.keys = KeyLedger::with_file(path);
        }
        if let Some(path) = output.used_ledger.as_ref().map(resolve) {
            self.used = UsedLedger::with_file(path);
        }
        self.mapping_path = output.mapping.as_ref().map(resolve);
        self
    }

    /// The checkpoint graph.
    pub fn graph(&self) -> &GlobalChainGraph {
        &self.checkpoint
    }

    /// Keys produced by the latest attempt.
    pub fn produced_keys(&self) -> &[u32] {
        self.keys.entries()
    }

    /// Terminal mapping of the latest attempt.
    pub fn terminal_mapping(&self) -> &BTreeMap<String, String> {
        &self.mapping
    }

    /// Chains that have been reinforced at least once.
    pub fn contested(&self) -> &BTreeSet<ChainId> {
        &self.contested
    }

    /// Routes every connection of the circuit.
    ///
    /// Step failures are retried up to the configured number of attempts;
    /// functional and internal errors end the task at once.
    pub fn route(
        &mut self,
        db: &dyn CircuitDb,
        sink: &DiagnosticSink,
    ) -> Result<RoutingOutcome, RouteError> {
        let plan = plan_connections(db);
        let mut last_failure = None;

        for attempt in 1..=self.search.max_attempts {
            tracing::info!(attempt, connections = plan.len(), "routing attempt");
            let mut working = self.checkpoint.snapshot();
            let result = self
                .begin_attempt()
                .map_err(AttemptError::from)
                .and_then(|()| self.run_attempt(db, &plan, &mut working));

            match result {
                Ok(()) => return self.finish(working, attempt),
                Err(AttemptError::Fatal(err)) => {
                    report_fatal(&err, sink);
                    return Err(err);
                }
                Err(AttemptError::Step { failure, from, to }) => {
                    sink.emit(
                        Diagnostic::warning(
                            codes::STEP_FAILED,
                            format!("attempt {attempt}: {failure}"),
                        )
                        .with_subject(failure.from.clone()),
                    );
                    if let Err(err) = self.reinforce(&from, &to, attempt, sink) {
                        let err = RouteError::from(err);
                        report_fatal(&err, sink);
                        return Err(err);
                    }
                    last_failure = Some(failure);
                }
            }
        }

        let last = last_failure.ok_or_else(|| InternalError::new("no routing attempt was made"))?;
        sink.emit(
            Diagnostic::error(
                codes::EXHAUSTED,
                format!(
                    "routing did not converge after {} attempts",
                    self.search.max_attempts
                ),
            )
            .with_subject(last.from.clone())
            .with_note(last.to_string())
            .with_help("free fabric resources or raise search.max_attempts"),
        );
        Err(RouteError::Exhausted {
            attempts: self.search.max_attempts,
            last,
        })
    }

    fn begin_attempt(&mut self) -> Result<(), FunctionalError> {
        self.resolver.reset();
        self.mapping.clear();
        self.keys.reset()?;
        self.used.reset()
    }

    fn finish(&mut self, working: GlobalChainGraph, attempts: u32) -> Result<RoutingOutcome, RouteError> {
        if let Some(path) = &self.mapping_path {
            write_mapping(path, &self.mapping)?;
        }
        self.checkpoint = working;
        let fingerprint = self.checkpoint.fingerprint();
        tracing::info!(
            attempts,
            keys = self.keys.entries().len(),
            fingerprint = %fingerprint.short(),
            "routing converged"
        );
        Ok(RoutingOutcome {
            keys: self.keys.entries().to_vec(),
            mapping: self.mapping.clone(),
            used: self.used.entries().to_vec(),
            attempts,
            fingerprint,
        })
    }

    fn run_attempt(
        &mut self,
        db: &dyn CircuitDb,
        plan: &[Connection],
        working: &mut GlobalChainGraph,
    ) -> Result<(), AttemptError> {
        let mut reached = None;
        for (step, connection) in plan.iter().enumerate() {
            let extends = plan
                .get(step + 1)
                .is_some_and(|next| next.from == connection.to);
            let start = reached.take().filter(|tail: &NetTail| tail.terminal == connection.from);
            reached = self.route_step(db, step, connection, start, extends, working)?;
        }
        Ok(())
    }

    /// Routes one connection on the working graph.
    ///
    /// A connection continuing a net starts from the chain the previous one
    /// landed on. With `extends`, the landed chain survives the commit and
    /// is returned for the next connection of the net.
    fn route_step(
        &mut self,
        db: &dyn CircuitDb,
        step: usize,
        connection: &Connection,
        start: Option<NetTail>,
        extends: bool,
        working: &mut GlobalChainGraph,
    ) -> Result<Option<NetTail>, AttemptError> {
        let from = self.target(db, connection.from)?;
        let to = self.target(db, connection.to)?;
        let fail = |from: Target, to: Target| AttemptError::Step {
            failure: StepFailure {
                step,
                from: db.terminal_label(connection.from),
                to: db.terminal_label(connection.to),
            },
            from: Box::new(from),
            to: Box::new(to),
        };

        let candidates: Vec<(ChainId, String)> = match start {
            Some(tail) if working.chain(tail.chain).is_some() => vec![(tail.chain, tail.port)],
            Some(_) => Vec::new(),
            None => working
                .find_all_matching(&from.pattern)
                .into_iter()
                .filter_map(|id| {
                    let port = working.matching_port(id, &from.pattern, from.is_class())?;
                    Some((id, port.to_string()))
                })
                .collect(),
        };
        let probe = SearchRequest::new(to.pattern.clone())
            .with_lane(lane_for(&from, &to))
            .respecting_used(to.is_class())
            .affecting_spm(affects_references(&from, &to));

        let chosen = match candidates.len() {
            0 => return Err(fail(from, to)),
            1 => 0,
            _ => {
                let shared: &GlobalChainGraph = &*working;
                let results = self.pool.run_candidates(&candidates, |(start, _)| {
                    let mut snapshot = shared.snapshot();
                    Ok(snapshot.dijkstra_to_pattern(*start, &probe)?.map(|m| m.cost))
                })?;
                match select_best(&results) {
                    Some((index, cost)) => {
                        tracing::debug!(
                            step,
                            candidates = candidates.len(),
                            reached = results.len(),
                            index,
                            cost,
                            "picked start candidate"
                        );
                        index
                    }
                    None => return Err(fail(from, to)),
                }
            }
        };

        let (start, start_port) = &candidates[chosen];
        let Some(found) = working.dijkstra_to_pattern(*start, &probe.clone().committing())? else {
            return Err(fail(from, to));
        };
        if extends {
            working.cancel_deletion(found.vertex);
        }
        working.commit_pending_mutations()?;

        self.land(&from, start_port, working)?;
        self.land(&to, &found.label, working)?;
        self.keys.record(&found.keys)?;
        self.mapping
            .insert(db.terminal_label(connection.from), start_port.clone());
        self.mapping
            .insert(db.terminal_label(connection.to), found.label.clone());
        tracing::debug!(
            step,
            from = %start_port,
            to = %found.label,
            cost = found.cost,
            keys = ?found.keys,
            "connection routed"
        );
        Ok(extends.then(|| NetTail {
            terminal: connection.to,
            chain: found.vertex,
            port: found.label,
        }))
    }

    fn target(&self, db: &dyn CircuitDb, terminal: TerminalId) -> Result<Target, AttemptError> {
        self.resolver.resolve(db, terminal)?.ok_or_else(|| {
            AttemptError::Fatal(
                InternalError::new(format!(
                    "planned connection ends on junction terminal {}",
                    db.terminal_label(terminal)
                ))
                .into(),
            )
        })
    }

    /// Binds a class target to the block it landed on and records the block
    /// as used.
    fn land(
        &mut self,
        target: &Target,
        port_label: &str,
        working: &mut GlobalChainGraph,
    ) -> Result<(), FunctionalError> {
        if target.is_class() {
            if let Some(block) = Port::parse(port_label).block_label() {
                self.resolver.bind(target.node, block);
            }
        }
        let Some(entry) = target.used_entry(port_label) else {
            return Ok(());
        };
        if working.mark_block_used(&entry)? {
            self.used.record(&[entry])?;
        }
        Ok(())
    }

    /// Probes a failed connection on the checkpoint and makes the chains it
    /// would use heavier.
    fn reinforce(
        &mut self,
        from: &Target,
        to: &Target,
        attempt: u32,
        sink: &DiagnosticSink,
    ) -> PatchbayResult<()> {
        let mut probe = self.checkpoint.snapshot();
        let request = SearchRequest::new(to.pattern.clone())
            .with_lane(lane_for(from, to))
            .affecting_spm(affects_references(from, to));

        let mut path = Vec::new();
        for start in probe.find_all_matching(&from.pattern) {
            if let Some(found) = probe.dijkstra_to_pattern(start, &request)? {
                path = found.path;
                break;
            }
        }

        let mut fresh = 0;
        for &id in &path {
            if self.contested.insert(id) {
                fresh += 1;
            }
            self.checkpoint.queue_reinforcement(id);
        }
        if attempt % self.search.reinforcement_period.max(1) == 0 {
            for &id in &self.contested {
                self.checkpoint.queue_reinforcement(id);
            }
        }
        let reinforced = self
            .checkpoint
            .apply_weight_reinforcement(self.search.reinforcement_step);

        tracing::debug!(
            attempt,
            probe_hops = path.len(),
            fresh,
            reinforced,
            "reinforced contested chains"
        );
        sink.emit(Diagnostic::note(
            codes::REINFORCED,
            format!(
                "attempt {attempt}: reinforced {reinforced} chains ({} contested)",
                self.contested.len()
            ),
        ));
        Ok(())
    }
}

fn report_fatal(err: &RouteError, sink: &DiagnosticSink) {
    let code = if err.is_functional() {
        codes::FUNCTIONAL
    } else {
        codes::INTERNAL
    };
    sink.emit(Diagnostic::error(code, err.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::InMemoryCircuit;
    use patchbay_diagnostics::Severity;
    use patchbay_fabric::{parse_chain_description, BlockLibrary};
    use std::sync::Arc;

    fn session(chains: &str, blocks: &[(&str, &str)], search: SearchConfig) -> RoutingSession {
        let chains = parse_chain_description(chains).unwrap();
        let mut library = BlockLibrary::new();
        for (label, description) in blocks {
            library.insert(label, description).unwrap();
        }
        let graph = GlobalChainGraph::new("test", chains, Arc::new(library));
        RoutingSession::new(graph, &search).unwrap()
    }

    fn circuit(json: &str) -> InMemoryCircuit {
        InMemoryCircuit::from_json_str(json).unwrap()
    }

    const AMP_TO_PAD: &str = r#"{ "nodes": [
        { "name": "U1", "kind": "amplifier", "block": "CAU<10", "terminals": ["inp", "inn"] },
        { "name": "P1", "kind": "pad", "terminals": ["y"] }
    ], "wires": [["U1.inp", "P1.y"]] }"#;

    #[test]
    fn routes_single_connection() {
        let mut session = session(
            "CAU<10.n1 PPC<20.PX1\nCAU<10.n2 PPC<20.PY1\n",
            &[("CAU<10", "n1 -- n2 : 3\n")],
            SearchConfig::default(),
        );
        let sink = DiagnosticSink::new();
        let outcome = session.route(&circuit(AMP_TO_PAD), &sink).unwrap();

        assert_eq!(outcome.keys, vec![13]);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.mapping["U1.inp"], "CAU<10.n1");
        assert_eq!(outcome.mapping["P1.y"], "PPC<20.PY1");
        assert_eq!(outcome.used, vec!["CAU<10".to_string(), r"PPC<20\.PY".to_string()]);
        assert_eq!(session.produced_keys(), &[13]);
        assert_eq!(session.graph().live_count(), 0);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn functional_errors_are_not_retried() {
        let mut session = session(
            "CAU<10.n1 PPC<20.PX1\n",
            &[("CAU<10", "n1 -- n2 : 3\n")],
            SearchConfig::default(),
        );
        let bad = circuit(
            r#"{ "nodes": [
                { "name": "R1", "kind": "resistor", "terminals": ["b"], "params": { "value": "3k" } },
                { "name": "P1", "kind": "pad", "terminals": ["y"] }
            ], "wires": [["R1.b", "P1.y"]] }"#,
        );
        let sink = DiagnosticSink::new();
        let err = session.route(&bad, &sink).unwrap_err();
        assert!(err.is_functional());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(format!("{}", sink.diagnostics()[0].code), "E101");
    }

    #[test]
    fn unroutable_connection_exhausts_attempts() {
        let search = SearchConfig {
            max_attempts: 3,
            ..SearchConfig::default()
        };
        let mut session = session(
            "CAU<10.n1 PPC<20.PX1\nCAU<10.n2 PPC<20.PY1\n",
            &[("CAU<10", "n1 -- n3 : 3\n")],
            search,
        );
        let sink = DiagnosticSink::new();
        let err = session.route(&circuit(AMP_TO_PAD), &sink).unwrap_err();
        match err {
            RouteError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.from, "U1.inp");
                assert_eq!(last.to, "P1.y");
            }
            other => panic!("unexpected error {other:?}"),
        }
        let diagnostics = sink.diagnostics();
        let warnings = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        assert_eq!(warnings, 3);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(session.produced_keys(), &[] as &[u32]);
    }

    #[test]
    fn several_start_candidates_pick_the_cheapest() {
        // Both PX chains can reach the amplifier; the second is one hop shorter.
        let mut session = session(
            "PPC<20.PX1 CB<1.n1\n\
             PPC<21.PX1 CB<1.n4\n\
             CB<1.n3 CAU<10.n1\n",
            &[("CB<1", "n1 -- n2 -- n3 : 1\nn4 -- n3 : 2\n")],
            SearchConfig {
                threads: Some(2),
                ..SearchConfig::default()
            },
        );
        let db = circuit(
            r#"{ "nodes": [
                { "name": "P1", "kind": "pad", "terminals": ["x"] },
                { "name": "U1", "kind": "amplifier", "block": "CAU<10", "terminals": ["inp"] }
            ], "wires": [["P1.x", "U1.inp"]] }"#,
        );
        let sink = DiagnosticSink::new();
        let outcome = session.route(&db, &sink).unwrap();
        assert_eq!(outcome.mapping["P1.x"], "PPC<21.PX1");
        assert_eq!(outcome.keys, vec![3]);
    }

    #[test]
    fn mapping_file_is_written_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            key_ledger: Some("out/keys.txt".into()),
            used_ledger: Some("out/used.txt".into()),
            mapping: Some("out/mapping.json".into()),
        };
        let mut session = session(
            "CAU<10.n1 PPC<20.PX1\nCAU<10.n2 PPC<20.PY1\n",
            &[("CAU<10", "n1 -- n2 : 3\n")],
            SearchConfig::default(),
        )
        .with_output(&output, dir.path());
        session
            .route(&circuit(AMP_TO_PAD), &DiagnosticSink::new())
            .unwrap();

        let keys = std::fs::read_to_string(dir.path().join("out/keys.txt")).unwrap();
        assert_eq!(keys, "13\n");
        let used = std::fs::read_to_string(dir.path().join("out/used.txt")).unwrap();
        assert_eq!(used, "CAU<10\nPPC<20\\.PY\n");
        let mapping = std::fs::read_to_string(dir.path().join("out/mapping.json")).unwrap();
        assert!(mapping.contains("\"U1.inp\": \"CAU<10.n1\""));
    }
}
