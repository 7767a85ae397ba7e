//! Errors raised while reading fabric descriptions.

use patchbay_common::InternalError;
use std::path::PathBuf;

/// Errors produced while building chains and block graphs.
///
/// All of these are fatal construction errors: a malformed description is
/// never retried.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// A chain line contained no port labels.
    #[error("chain description line {line} is empty")]
    EmptyChain {
        /// 1-based line number.
        line: usize,
    },

    /// More chains than the global graph can hold.
    #[error("chain description holds more than {limit} chains")]
    TooManyChains {
        /// The arena capacity.
        limit: usize,
    },

    /// A block label lacks the numeric base id suffix.
    #[error("block label '{0}' does not end in a numeric base id")]
    BadBlockLabel(String),

    /// An adjacency line could not be parsed.
    #[error("block {block}, line {line}: {reason}")]
    MalformedAdjacency {
        /// The block whose description is malformed.
        block: String,
        /// 1-based line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },

    /// A block description references more internal vertices than fit.
    #[error("block {block} needs more than {limit} vertices")]
    TooManyVertices {
        /// The block label.
        block: String,
        /// The vertex capacity of a block graph.
        limit: usize,
    },

    /// A description file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A broken invariant surfaced while building a graph.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
