//! Fabric model for the Patchbay analog test-fabric router.
//!
//! The fabric is modelled on two levels. The global level is a set of
//! [`Chain`]s, each a bundle of electrically equivalent port labels such as
//! `CAU<10.n1`. The local level is one [`LocalBlockGraph`] per switchable
//! block: a small graph whose edges are switch keys and whose boundary
//! terminals `n1`..`n26` are the points chains attach to.
//!
//! # Description formats
//!
//! - Global chain description: one chain per line, space-separated port
//!   labels; the first token doubles as the chain label.
//! - Block adjacency description: lines of `A -- B [-- C ...] : key`.
//!
//! Both are read by the functions in [`description`].

#![warn(missing_docs)]

pub mod chain;
pub mod description;
pub mod error;
pub mod heap;
pub mod kind;
pub mod library;
pub mod local;
pub mod port;
pub mod vertex;

pub use chain::{Chain, MAX_CHAINS};
pub use description::{parse_chain_description, read_block_description, read_chain_description};
pub use error::FabricError;
pub use heap::PriorityQueue;
pub use kind::BlockKind;
pub use library::BlockLibrary;
pub use local::{boundary_index, LocalBlockGraph, BOUNDARY_TERMINALS, MAX_LOCAL_VERTICES};
pub use port::{BlockRef, Port};
pub use vertex::{Vertex, UNREACHED};
