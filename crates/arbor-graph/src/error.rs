//! Error types for the dependency graph

/// Errors querying or ordering the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Component id not present in the graph
    #[error("component not found in dependency graph: {0}")]
    NodeNotFound(String),

    /// Graph contains at least one dependency cycle
    #[error("dependency cycle involving: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),
}
