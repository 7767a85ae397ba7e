//! Patchbay CLI, the command-line front end of the fabric router.
//!
//! Provides `patchbay check` to validate a project's fabric, `patchbay route`
//! to route a circuit end to end, and `patchbay search` for one-off
//! pattern-directed searches while debugging a fabric description.

#![warn(missing_docs)]

mod check;
mod project;
mod route;
mod search;

use std::io::IsTerminal;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Patchbay: automatic configuration paths for analog test fabrics.
#[derive(Parser, Debug)]
#[command(name = "patchbay", version, about = "Patchbay fabric router")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `patchbay.toml` or to the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the configuration and fabric descriptions and print a summary.
    Check,
    /// Route every connection of a circuit.
    Route(RouteArgs),
    /// Run a single pattern-directed search on a fresh fabric.
    Search(SearchArgs),
}

/// Arguments for the `patchbay route` subcommand.
#[derive(Parser, Debug)]
pub struct RouteArgs {
    /// Circuit description (JSON).
    #[arg(long)]
    pub circuit: String,

    /// Output format for the result.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `patchbay search` subcommand.
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Pattern selecting the start chain.
    #[arg(long)]
    pub from: String,

    /// Pattern a port of the destination chain must match.
    #[arg(long)]
    pub to: String,

    /// Write the path into its blocks and consume it.
    #[arg(long)]
    pub delete: bool,

    /// Search the ion lane instead of the standard one.
    #[arg(long)]
    pub ion: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file or project directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    let global = GlobalArgs {
        quiet: cli.quiet,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Check => check::run(&global),
        Command::Route(ref args) => route::run(args, &global),
        Command::Search(ref args) => search::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Log filter for the given `-v` count; `RUST_LOG` overrides it.
fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_check() {
        let cli = Cli::parse_from(["patchbay", "check"]);
        assert!(matches!(cli.command, Command::Check));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn parse_route_default_format() {
        let cli = Cli::parse_from(["patchbay", "route", "--circuit", "amp.json"]);
        match cli.command {
            Command::Route(ref args) => {
                assert_eq!(args.circuit, "amp.json");
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Route command"),
        }
    }

    #[test]
    fn parse_route_json() {
        let cli = Cli::parse_from(["patchbay", "route", "--circuit", "a.json", "-f", "json"]);
        match cli.command {
            Command::Route(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Route command"),
        }
    }

    #[test]
    fn parse_search_flags() {
        let cli = Cli::parse_from([
            "patchbay",
            "search",
            "--from",
            "CAU<10.*n1$",
            "--to",
            "PPC<20.*PY",
            "--delete",
        ]);
        match cli.command {
            Command::Search(ref args) => {
                assert_eq!(args.from, "CAU<10.*n1$");
                assert_eq!(args.to, "PPC<20.*PY");
                assert!(args.delete);
                assert!(!args.ion);
            }
            _ => panic!("expected Search command"),
        }
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["patchbay", "-vv", "check"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(log_level(cli.verbose, false), "debug");
        assert_eq!(log_level(0, false), "warn");
        assert_eq!(log_level(7, false), "trace");
        assert_eq!(log_level(3, true), "error");
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "patchbay",
            "check",
            "--quiet",
            "--color",
            "never",
            "--config",
            "/bench/patchbay.toml",
        ]);
        assert!(cli.quiet);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.config.as_deref(), Some("/bench/patchbay.toml"));
    }
}
