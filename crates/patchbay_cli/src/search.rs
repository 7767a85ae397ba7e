//! `patchbay search`: one pattern-directed search, for debugging fabrics.

use patchbay_route::{load_fabric, GlobalChainGraph, Lane, PatternMatch, SearchRequest};
use regex::Regex;

use crate::project::load_project;
use crate::{GlobalArgs, SearchArgs};

/// Runs the `patchbay search` command.
///
/// Returns exit code 0 when the destination was reached, 1 otherwise.
pub fn run(args: &SearchArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let mut graph = load_fabric(&project.config, &project.dir)?;
    let from = Regex::new(&args.from)?;
    let request = request(args)?;

    let Some(start) = graph.find_first_matching(&from) else {
        eprintln!("no live chain matches {}", args.from);
        return Ok(1);
    };
    let Some(found) = graph.dijkstra_to_pattern(start, &request)? else {
        eprintln!("{} is unreachable from {}", args.to, args.from);
        return Ok(1);
    };

    print_match(&graph, &found, global.quiet);
    if args.delete {
        let summary = graph.commit_pending_mutations()?;
        if !global.quiet {
            println!(
                "   Consumed {} chain(s), restricted {}, removed {} block vertices",
                summary.deleted, summary.affected, summary.local_vertices
            );
        }
    }
    Ok(0)
}

fn request(args: &SearchArgs) -> Result<SearchRequest, regex::Error> {
    let lane = if args.ion { Lane::Ion } else { Lane::Standard };
    let request = SearchRequest::new(Regex::new(&args.to)?).with_lane(lane);
    Ok(if args.delete {
        request.committing()
    } else {
        request
    })
}

fn print_match(graph: &GlobalChainGraph, found: &PatternMatch, quiet: bool) {
    let keys: Vec<String> = found.keys.iter().map(u32::to_string).collect();
    println!("{} (cost {})", found.label, found.cost);
    if !keys.is_empty() {
        println!("{}", keys.join(" "));
    }
    if quiet {
        return;
    }
    for id in &found.path {
        let label = graph.chain(*id).map_or("<deleted>", |c| c.label());
        println!("   {:>4} {label}", id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(delete: bool, ion: bool) -> SearchArgs {
        SearchArgs {
            from: "CAU<10.*n1$".to_string(),
            to: "PPC<20.*PY".to_string(),
            delete,
            ion,
        }
    }

    #[test]
    fn dry_run_request_does_not_commit() {
        let request = request(&args(false, false)).unwrap();
        assert!(!request.do_delete);
        assert!(!request.do_write);
        assert_eq!(request.lane, Lane::Standard);
    }

    #[test]
    fn delete_request_writes_and_consumes() {
        let request = request(&args(true, true)).unwrap();
        assert!(request.do_delete);
        assert!(request.do_write);
        assert_eq!(request.lane, Lane::Ion);
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let mut bad = args(false, false);
        bad.to = "PPC<(20".to_string();
        assert!(request(&bad).is_err());
    }
}
