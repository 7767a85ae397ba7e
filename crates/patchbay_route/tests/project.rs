//! Routing driven by a project directory with `patchbay.toml`.

use patchbay_config::load_config;
use patchbay_diagnostics::DiagnosticSink;
use patchbay_route::{load_fabric, route_circuit, InMemoryCircuit, RouteError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
[project]
name = "bench"
description = "one amplifier, one pad"

[fabric]
chains = "fabric/chains.txt"

[[fabric.blocks]]
label = "CAU<10"
adjacency = "fabric/cau10.adj"
"#;

const TAIL: &str = r#"
[search]
max_attempts = 2
threads = 2

[output]
key_ledger = "out/keys.txt"
used_ledger = "out/used.txt"
mapping = "out/mapping.json"
"#;

const CIRCUIT: &str = r#"{
    "nodes": [
        { "name": "U1", "kind": "amplifier", "block": "CAU<10", "terminals": ["inp"] },
        { "name": "P1", "kind": "pad", "terminals": ["y"] }
    ],
    "wires": [["U1.inp", "P1.y"]]
}"#;

fn project(reserved: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("fabric")).unwrap();
    fs::write(
        root.join("patchbay.toml"),
        format!("{CONFIG}{reserved}{TAIL}"),
    )
    .unwrap();
    fs::write(
        root.join("fabric/chains.txt"),
        "# amplifier inputs to pads\nCAU<10.n1 PPC<20.PX1\nCAU<10.n2 PPC<20.PY1\n",
    )
    .unwrap();
    fs::write(root.join("fabric/cau10.adj"), "n1 -- n2 : 3  # input short\n").unwrap();
    fs::write(root.join("circuit.json"), CIRCUIT).unwrap();
    dir
}

fn circuit(root: &Path) -> InMemoryCircuit {
    InMemoryCircuit::load(&root.join("circuit.json")).unwrap()
}

#[test]
fn routes_project_and_writes_outputs() {
    let dir = project("");
    let root = dir.path();
    let config = load_config(root).unwrap();
    let sink = DiagnosticSink::new();

    let outcome = route_circuit(&config, root, &circuit(root), &sink).unwrap();

    assert_eq!(outcome.keys, vec![13]);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(fs::read_to_string(root.join("out/keys.txt")).unwrap(), "13\n");
    assert_eq!(
        fs::read_to_string(root.join("out/used.txt")).unwrap(),
        "CAU<10\nPPC<20\\.PY\n"
    );
    let mapping: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("out/mapping.json")).unwrap()).unwrap();
    assert_eq!(mapping["P1.y"], "PPC<20.PY1");
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn reserved_key_removes_its_chains_before_routing() {
    let dir = project("\n[[fabric.reserved]]\nblock = \"CAU<10\"\nkey = 3\n");
    let root = dir.path();
    let config = load_config(root).unwrap();

    let graph = load_fabric(&config, root).unwrap();
    assert_eq!(graph.live_count(), 0);
    assert_eq!(graph.label(), "bench");

    let sink = DiagnosticSink::new();
    let err = route_circuit(&config, root, &circuit(root), &sink).unwrap_err();
    assert!(matches!(err, RouteError::Exhausted { attempts: 2, .. }));
    assert_eq!(sink.error_count(), 1);
    // The ledger only reflects the last, failed attempt.
    assert_eq!(fs::read_to_string(root.join("out/keys.txt")).unwrap(), "");
    assert!(!root.join("out/mapping.json").exists());
}

#[test]
fn missing_block_description_is_functional() {
    let dir = project("");
    let root = dir.path();
    fs::remove_file(root.join("fabric/cau10.adj")).unwrap();
    let config = load_config(root).unwrap();

    let err = load_fabric(&config, root).unwrap_err();
    assert!(err.is_functional());
}
