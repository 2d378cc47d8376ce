//! Arbor Dependency Graph
//!
//! Global component graph keyed by component id, built by unioning direct
//! metadata dependencies, cross-references and parent → child edges across
//! any number of specifications.
//!
//! - [`GraphBuilder`] / [`build_graph`]: wholesale construction
//! - [`DependencyGraph`]: immutable result with impact analysis,
//!   topological ordering and cycle detection (via `petgraph`)
//! - [`GraphHandle`]: copy-on-write snapshot pointer

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod builder;
mod error;
mod graph;
mod handle;

pub use builder::{build_graph, GraphBuilder};
pub use error::GraphError;
pub use graph::{DependencyGraph, Edge, EdgeKind, GraphEntry, GraphSummary, EXTERNAL_TYPE};
pub use handle::GraphHandle;
