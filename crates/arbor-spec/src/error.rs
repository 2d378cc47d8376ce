//! Error types for the specification model
//!
//! - [`SpecError`]: a document cannot become a [`Specification`](crate::Specification)
//! - [`StructuralError`]: a defect found while building the component tree;
//!   accumulated next to the best-effort tree instead of aborting

use serde::{Deserialize, Serialize};

/// Errors converting a parsed document into a specification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    /// Top-level `id`, `name` or `version` missing
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    /// Document is not a mapping
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Structural defect accumulated during tree construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralError {
    /// Entry could not be converted into a component
    #[error("malformed node at {location}: {reason}")]
    MalformedNode { location: String, reason: String },

    /// Same component id reachable through more than one parent
    #[error("duplicate component id '{id}' at {location}")]
    DuplicateId { id: String, location: String },

    /// `code_ref` is not `path[:start-end]`
    #[error("malformed code reference on '{component_id}': {reason}")]
    MalformedCodeRef { component_id: String, reason: String },

    /// `functions` entry is neither a string nor a mapping with `name`
    #[error("malformed function #{index} on '{component_id}'")]
    MalformedFunction { component_id: String, index: usize },

    /// `cross_dependencies` entry lacks `source` or `target`
    #[error("malformed cross dependency #{index}")]
    MalformedCrossDependency { index: usize },

    /// Nesting deeper than the supported maximum
    #[error("nesting deeper than {max_depth} at {location}")]
    DepthExceeded { location: String, max_depth: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_display_lists_names() {
        let err = SpecError::MissingRequiredFields(vec!["name".into(), "version".into()]);
        assert_eq!(err.to_string(), "missing required fields: name, version");
    }

    #[test]
    fn structural_error_display() {
        let err = StructuralError::DuplicateId {
            id: "db".into(),
            location: "app.children[1]".into(),
        };
        assert!(err.to_string().contains("duplicate component id 'db'"));
    }
}
