//! `patchbay route`: routes a circuit and reports the produced keys.
//!
//! 1. Locate the project and load `patchbay.toml`
//! 2. Load the circuit description
//! 3. Load the fabric and run the routing session (ledgers are written as
//!    configured)
//! 4. Render diagnostics and print the keys and terminal mapping

use std::path::Path;

use patchbay_diagnostics::DiagnosticSink;
use patchbay_route::{route_circuit, InMemoryCircuit, RoutingOutcome};

use crate::project::{load_project, render_diagnostics};
use crate::{GlobalArgs, ReportFormat, RouteArgs};

/// Runs the `patchbay route` command.
///
/// Returns exit code 0 when every connection was routed, 1 otherwise.
pub fn run(args: &RouteArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let circuit = InMemoryCircuit::load(Path::new(&args.circuit))?;

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "    Routing {} on {} ({} nodes)",
            args.circuit,
            project.config.project.name,
            circuit.node_count()
        );
    }

    let sink = DiagnosticSink::new();
    let result = route_circuit(&project.config, &project.dir, &circuit, &sink);
    render_diagnostics(&sink, global);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(error = %err, "routing failed");
            if args.format == ReportFormat::Json {
                println!("{}", serde_json::json!({ "ok": false, "error": err.to_string() }));
            }
            return Ok(1);
        }
    };

    match args.format {
        ReportFormat::Text => print_text(&outcome, global.quiet),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?),
    }
    Ok(0)
}

fn print_text(outcome: &RoutingOutcome, quiet: bool) {
    let keys: Vec<String> = outcome.keys.iter().map(u32::to_string).collect();
    println!("{}", keys.join(" "));
    if quiet {
        return;
    }
    for (terminal, port) in &outcome.mapping {
        println!("   {terminal:<16} -> {port}");
    }
    eprintln!(
        "   Result: {} key(s) after {} attempt(s), fingerprint {}",
        outcome.keys.len(),
        outcome.attempts,
        outcome.fingerprint
    );
}

fn outcome_json(outcome: &RoutingOutcome) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "keys": outcome.keys,
        "mapping": outcome.mapping,
        "used": outcome.used,
        "attempts": outcome.attempts,
        "fingerprint": outcome.fingerprint.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_common::ContentHash;
    use std::collections::BTreeMap;

    #[test]
    fn json_outcome_shape() {
        let outcome = RoutingOutcome {
            keys: vec![13, 7],
            mapping: BTreeMap::from([("U1.inp".to_string(), "CAU<10.n1".to_string())]),
            used: vec!["CAU<10".to_string()],
            attempts: 2,
            fingerprint: ContentHash::from_bytes(b"bench"),
        };
        let json = outcome_json(&outcome);
        assert_eq!(json["ok"], true);
        assert_eq!(json["keys"], serde_json::json!([13, 7]));
        assert_eq!(json["mapping"]["U1.inp"], "CAU<10.n1");
        assert_eq!(json["attempts"], 2);
        assert_eq!(json["fingerprint"].as_str().map(str::len), Some(32));
    }
}
