//! Arbor Specification Model
//!
//! Declarative component specifications as immutable, checksummed trees.
//!
//! # Core Concepts
//!
//! - [`Specification`]: a named, versioned document and its component tree
//! - [`ComponentNode`]: one element of the tree, optionally pointing at code
//! - [`ContentHash`]: Blake3 checksum of the source content
//! - [`TreeBuilder`]: fault-tolerant recursive tree construction
//! - [`Outline`] / [`render_ascii`] / [`search`]: tree export and lookup
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_spec::{Specification, SourceInfo};
//!
//! let document: serde_yaml::Value = serde_yaml::from_str(raw)?;
//! let spec = Specification::from_document(document, SourceInfo::stamp("auth.yaml", raw.as_bytes()))?;
//! for node in spec.root.iter_breadth_first() {
//!     println!("{} @ level {}", node.id, node.level);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod error;
mod extract;
mod hash;
mod node;
mod outline;
mod tree;

pub use document::{
    CrossDependency, Metric, PerformanceBenchmark, SourceInfo, Specification, TestingConfig,
    REQUIRED_FIELDS,
};
pub use error::{SpecError, StructuralError};
pub use extract::{
    extract_code_references, extract_dependencies, extract_performance_expectations,
    CodeReference, DependencySummary,
};
pub use hash::{ContentHash, HashError};
pub use node::{CodeRef, ComponentNode, Criticality, FunctionSpec, NodeKind, PerformanceThresholds};
pub use outline::{path_to, render_ascii, search, Outline, OutlineNode, OUTLINE_FORMAT_VERSION};
pub use tree::{extract_component_tree, TreeBuilder, TreeSummary, MAX_TREE_DEPTH};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
