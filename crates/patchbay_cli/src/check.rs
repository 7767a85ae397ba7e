//! `patchbay check`: loads a project's fabric and prints what was found.

use std::collections::BTreeSet;

use patchbay_diagnostics::{codes, Diagnostic, DiagnosticSink};
use patchbay_fabric::BlockKind;
use patchbay_route::{load_fabric, GlobalChainGraph};

use crate::project::{load_project, render_diagnostics};
use crate::GlobalArgs;

/// Runs the `patchbay check` command.
///
/// Returns exit code 0 when the fabric loads, 1 when a diagnostic error was
/// reported.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let graph = load_fabric(&project.config, &project.dir)?;
    let sink = DiagnosticSink::new();

    for block in undescribed_crossbars(&graph) {
        sink.emit(
            Diagnostic::warning(
                codes::UNDESCRIBED_CROSSBAR,
                format!("crossbar {block} has chains but no adjacency description"),
            )
            .with_subject(block)
            .with_help("add it to [[fabric.blocks]] or no path can cross it"),
        );
    }

    if !global.quiet {
        print_summary(&graph, project.config.fabric.reserved.len());
    }
    let errors = render_diagnostics(&sink, global);
    Ok(if errors > 0 { 1 } else { 0 })
}

/// Crossbar labels referenced by live chains that the library cannot build.
fn undescribed_crossbars(graph: &GlobalChainGraph) -> BTreeSet<String> {
    graph
        .live_chains()
        .flat_map(|(_, chain)| chain.blocks())
        .filter(|block| block.kind == BlockKind::Crossbar && !graph.library().contains(&block.label))
        .map(|block| block.label.clone())
        .collect()
}

fn print_summary(graph: &GlobalChainGraph, reserved: usize) {
    let live: Vec<_> = graph.live_chains().collect();
    let ion = live.iter().filter(|(_, c)| c.is_ion()).count();
    let spm = live.iter().filter(|(_, c)| c.is_spm()).count();

    println!("   Fabric {}", graph.label());
    println!(
        "   Chains {} live of {} ({ion} ion, {spm} shared reference)",
        live.len(),
        graph.capacity()
    );
    println!("   Reserved keys {reserved}");
    println!("   Blocks {}", graph.library().len());
    for label in graph.library().labels() {
        if let Some(block) = graph.library().template(label) {
            println!(
                "     {:<12} {:<16} base {:<4} {} vertices",
                label,
                block.kind().to_string(),
                block.base_id(),
                block.live_vertex_count()
            );
        }
    }
    println!("   Fingerprint {}", graph.fingerprint());
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_fabric::{parse_chain_description, BlockLibrary};
    use std::sync::Arc;

    #[test]
    fn flags_crossbars_without_description() {
        let chains =
            parse_chain_description("CB<1.n1 CAU<10.n1\nCB<2.n4 PPC<20.PX1\nCB<1.n2 CB<2.n1\n")
                .unwrap();
        let mut library = BlockLibrary::new();
        library.insert("CB<1", "n1 -- n2 : 1\n").unwrap();
        let graph = GlobalChainGraph::new("bench", chains, Arc::new(library));

        let missing = undescribed_crossbars(&graph);
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["CB<2".to_string()]);
    }
}
