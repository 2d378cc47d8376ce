//! Component tree construction
//!
//! Recursive-descent conversion of a parsed document into a
//! [`ComponentNode`] tree. Construction never aborts: malformed children
//! become placeholder nodes and the structural problems are returned
//! alongside the best-effort tree.

use crate::error::StructuralError;
use crate::node::{scalar_string, str_field, CodeRef, ComponentNode, FunctionSpec};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};

/// Maximum nesting accepted before children are replaced by placeholders
pub const MAX_TREE_DEPTH: usize = 64;

/// Builder for component trees
///
/// Tracks ids seen so far so that a component reachable through several
/// parents is reported instead of silently duplicated.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    seen: HashSet<String>,
    errors: Vec<StructuralError>,
}

impl TreeBuilder {
    /// Create new builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree rooted at `document`
    ///
    /// The root takes its `id` and `name` from the document itself; a
    /// document without them yields a placeholder root.
    #[must_use]
    pub fn build(mut self, document: &Value) -> (ComponentNode, Vec<StructuralError>) {
        let root = match document.as_mapping() {
            Some(map) => self.build_node(map, None, 0, "root"),
            None => {
                self.errors.push(StructuralError::MalformedNode {
                    location: "root".to_string(),
                    reason: "document is not a mapping".to_string(),
                });
                ComponentNode::placeholder("root", 0, None, "document is not a mapping")
            }
        };
        (root, self.errors)
    }

    fn build_node(
        &mut self,
        map: &Mapping,
        parent_id: Option<&str>,
        level: usize,
        location: &str,
    ) -> ComponentNode {
        let parent = parent_id.map(str::to_string);

        let (Some(id), Some(name)) = (str_field(map, "id"), str_field(map, "name")) else {
            let reason = missing_reason(map);
            self.errors.push(StructuralError::MalformedNode {
                location: location.to_string(),
                reason: reason.clone(),
            });
            return ComponentNode::placeholder(location, level, parent, reason);
        };

        if !self.seen.insert(id.clone()) {
            self.errors.push(StructuralError::DuplicateId {
                id: id.clone(),
                location: location.to_string(),
            });
            return ComponentNode::placeholder(
                format!("{location}#duplicate"),
                level,
                parent,
                format!("component '{id}' is reachable through more than one parent"),
            );
        }

        let mut node = ComponentNode::new(id.clone(), name, level, parent);
        node.metadata = map
            .get("metadata")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();
        node.module = str_field(map, "module");
        node.description =
            str_field(map, "description").or_else(|| str_field(&node.metadata, "description"));
        node.testing = map
            .get("testing")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();

        if let Some(raw) = map.get("code_ref") {
            match scalar_string(raw).map(|s| CodeRef::parse(&s)) {
                Some(Ok(code_ref)) => node.code_ref = Some(code_ref),
                Some(Err(reason)) => {
                    self.errors.push(StructuralError::MalformedCodeRef {
                        component_id: id.clone(),
                        reason,
                    });
                }
                None => self.errors.push(StructuralError::MalformedCodeRef {
                    component_id: id.clone(),
                    reason: "code_ref must be a string".to_string(),
                }),
            }
        }

        if let Some(functions) = map.get("functions").and_then(Value::as_sequence) {
            for (i, f) in functions.iter().enumerate() {
                match FunctionSpec::from_value(f) {
                    Some(spec) => node.functions.push(spec),
                    None => self.errors.push(StructuralError::MalformedFunction {
                        component_id: id.clone(),
                        index: i,
                    }),
                }
            }
        }

        let Some(children) = map.get("children") else {
            return node;
        };
        let Some(children) = children.as_sequence() else {
            self.errors.push(StructuralError::MalformedNode {
                location: format!("{location}.children"),
                reason: "children must be a list".to_string(),
            });
            return node;
        };

        for (i, child) in children.iter().enumerate() {
            let child_location = format!("{id}.children[{i}]");
            let child_node = if level + 1 > MAX_TREE_DEPTH {
                self.errors.push(StructuralError::DepthExceeded {
                    location: child_location.clone(),
                    max_depth: MAX_TREE_DEPTH,
                });
                ComponentNode::placeholder(
                    child_location,
                    level + 1,
                    Some(id.clone()),
                    "maximum nesting depth exceeded",
                )
            } else if let Some(child_map) = child.as_mapping() {
                self.build_node(child_map, Some(&id), level + 1, &child_location)
            } else {
                self.errors.push(StructuralError::MalformedNode {
                    location: child_location.clone(),
                    reason: "child entry is not a mapping".to_string(),
                });
                ComponentNode::placeholder(
                    child_location,
                    level + 1,
                    Some(id.clone()),
                    "child entry is not a mapping",
                )
            };
            node.children.push(child_node);
        }

        node
    }
}

fn missing_reason(map: &Mapping) -> String {
    let missing: Vec<&str> = ["id", "name"]
        .into_iter()
        .filter(|k| str_field(map, k).is_none())
        .collect();
    format!("missing required field(s): {}", missing.join(", "))
}

/// Convert a parsed document into a component tree
///
/// Convenience wrapper over [`TreeBuilder`].
#[must_use]
pub fn extract_component_tree(document: &Value) -> (ComponentNode, Vec<StructuralError>) {
    TreeBuilder::new().build(document)
}

/// Shape summary of a component tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    pub total_nodes: usize,
    pub depth: usize,
    pub leaf_count: usize,
    pub placeholder_count: usize,
    /// Node count per component type
    pub by_type: BTreeMap<String, usize>,
}

impl TreeSummary {
    /// Summarize the tree rooted at `root`
    #[must_use]
    pub fn of(root: &ComponentNode) -> Self {
        let mut summary = Self {
            depth: root.depth(),
            ..Self::default()
        };
        for node in root.iter() {
            summary.total_nodes += 1;
            if node.is_leaf() {
                summary.leaf_count += 1;
            }
            if node.is_placeholder() {
                summary.placeholder_count += 1;
            }
            *summary.by_type.entry(node.component_type()).or_default() += 1;
        }
        summary
    }
}
