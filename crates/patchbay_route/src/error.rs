//! Error types for routing tasks.
//!
//! Three layers: [`FunctionalError`] aborts a task without retrying,
//! [`StepFailure`] ends one attempt and triggers reinforcement, and
//! [`RouteError`] is what a whole task reports.

use crate::circuit::CircuitError;
use patchbay_common::InternalError;
use patchbay_fabric::FabricError;
use std::path::PathBuf;

/// An error in the task's inputs. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum FunctionalError {
    /// A chain or block description is malformed.
    #[error(transparent)]
    Fabric(#[from] FabricError),

    /// A node parameter is missing or holds an unsupported value.
    #[error("node {node}: illegal {parameter} '{value}'")]
    IllegalParameter {
        /// The circuit node.
        node: String,
        /// The parameter name.
        parameter: String,
        /// The offending value, or `<missing>`.
        value: String,
    },

    /// The circuit names a node kind the router has no rules for.
    #[error("node {node}: unknown kind '{kind}'")]
    UnknownNodeKind {
        /// The circuit node.
        node: String,
        /// The unrecognized kind name.
        kind: String,
    },

    /// A terminal has no pin mapping for its node kind.
    #[error("node {node}: unknown terminal '{terminal}'")]
    UnknownTerminal {
        /// The circuit node.
        node: String,
        /// The terminal name.
        terminal: String,
    },

    /// A ledger file could not be written.
    #[error("ledger {}: {source}", path.display())]
    Ledger {
        /// The ledger file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The circuit description could not be read or parsed.
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    /// A search or registry pattern does not compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One connection for which no path exists in the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no path from {from} to {to}")]
pub struct StepFailure {
    /// Index of the connection in the plan.
    pub step: usize,
    /// Source terminal label.
    pub from: String,
    /// Destination terminal label.
    pub to: String,
}

/// The outcome of a failed routing task.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Bad input; the task was aborted on first sight.
    #[error(transparent)]
    Functional(#[from] FunctionalError),

    /// A broken invariant; graph state is not trustworthy.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// Every attempt failed.
    #[error("routing gave up after {attempts} attempts; last failure: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The step that failed in the final attempt.
        last: StepFailure,
    },

    /// The candidate search pool could not be created.
    #[error("failed to start search pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl RouteError {
    /// Whether the error is about the inputs rather than the router.
    pub fn is_functional(&self) -> bool {
        matches!(self, Self::Functional(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_step_failure() {
        let err = StepFailure {
            step: 2,
            from: "U1.out".into(),
            to: "R1.a".into(),
        };
        assert_eq!(format!("{err}"), "no path from U1.out to R1.a");
    }

    #[test]
    fn display_exhausted() {
        let err = RouteError::Exhausted {
            attempts: 45,
            last: StepFailure {
                step: 0,
                from: "U1.out".into(),
                to: "P1.x".into(),
            },
        };
        assert_eq!(
            format!("{err}"),
            "routing gave up after 45 attempts; last failure: no path from U1.out to P1.x"
        );
    }

    #[test]
    fn fabric_errors_are_functional() {
        let err: RouteError = FunctionalError::from(FabricError::BadBlockLabel("CB".into())).into();
        assert!(err.is_functional());
        let err: RouteError = InternalError::new("broken").into();
        assert!(!err.is_functional());
    }
}
