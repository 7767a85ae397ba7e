//! Shared foundational types used across the Patchbay analog fabric router.
//!
//! This crate provides opaque ID newtypes, content hashing for graph
//! fingerprints, and the internal-error result type used to report broken
//! invariants.

#![warn(missing_docs)]

pub mod hash;
pub mod ids;
pub mod result;

pub use hash::{ContentHash, Fingerprinter};
pub use ids::{ChainId, NodeId, TerminalId};
pub use result::{InternalError, PatchbayResult};
