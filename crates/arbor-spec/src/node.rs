//! Component nodes
//!
//! One [`ComponentNode`] per element of a specification's tree. Nodes keep
//! their raw `metadata` mapping so that validators can inspect field types;
//! the typed accessors here are lenient and return defaults for malformed
//! values.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::VecDeque;
use std::fmt;

/// Kind of a node in the component tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// A well-formed component
    Component,
    /// Stand-in for a malformed child entry
    Placeholder {
        /// Why the entry could not be converted
        reason: String,
    },
}

/// Importance of a component within the running system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Low,
    Normal,
    High,
    Critical,
}

impl Criticality {
    /// Parse from a metadata string, defaulting to `Normal`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Pointer into implementation source: `path[:start-end]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRef {
    /// Source file path, relative to the source root
    pub path: String,
    /// Optional inclusive line range
    pub lines: Option<(u32, u32)>,
}

impl CodeRef {
    /// Parse a `path[:start-end]` reference
    ///
    /// # Errors
    /// Returns a message when the path is empty or the line range is malformed.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("empty code reference".to_string());
        }

        let Some((path, range)) = raw.rsplit_once(':') else {
            return Ok(Self {
                path: raw.to_string(),
                lines: None,
            });
        };

        if path.is_empty() {
            return Err(format!("code reference '{raw}' has no path"));
        }

        let (start, end) = match range.split_once('-') {
            Some((s, e)) => (s.trim(), e.trim()),
            None => (range.trim(), range.trim()),
        };
        let start: u32 = start
            .parse()
            .map_err(|_| format!("invalid start line in '{raw}'"))?;
        let end: u32 = end
            .parse()
            .map_err(|_| format!("invalid end line in '{raw}'"))?;

        if start == 0 || end < start {
            return Err(format!("invalid line range in '{raw}'"));
        }

        Ok(Self {
            path: path.to_string(),
            lines: Some((start, end)),
        })
    }
}

impl fmt::Display for CodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lines {
            Some((s, e)) => write!(f, "{}:{s}-{e}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// A function declared on a component's interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub arity: Option<u32>,
    /// Canned return value, used by mock synthesis
    pub returns: Option<Value>,
    pub doc: Option<String>,
    /// Declared error returns
    pub errors: Vec<String>,
}

impl FunctionSpec {
    /// Bare function with only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: None,
            returns: None,
            doc: None,
            errors: Vec::new(),
        }
    }

    /// Convert a `functions` entry: either a string or a mapping with `name`
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::named(name.clone())),
            Value::Mapping(map) => {
                let name = str_field(map, "name")?;
                Some(Self {
                    name,
                    arity: map
                        .get("arity")
                        .and_then(Value::as_u64)
                        .and_then(|a| u32::try_from(a).ok()),
                    returns: map.get("returns").cloned(),
                    doc: str_field(map, "doc"),
                    errors: string_list(map.get("errors")),
                })
            }
            _ => None,
        }
    }
}

/// Performance expectations declared under `metadata.performance`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    pub latency_ms: Option<f64>,
    pub memory_mb: Option<f64>,
    pub cpu_percent: Option<f64>,
    pub scalability: Option<String>,
}

impl PerformanceThresholds {
    /// Read thresholds from a `performance` mapping
    #[must_use]
    pub fn from_mapping(map: &Mapping) -> Self {
        Self {
            latency_ms: map.get("latency_ms").and_then(Value::as_f64),
            memory_mb: map.get("memory_mb").and_then(Value::as_f64),
            cpu_percent: map.get("cpu_percent").and_then(Value::as_f64),
            scalability: map.get("scalability").and_then(scalar_string),
        }
    }

    /// Whether any numeric bound is declared
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        self.latency_ms.is_some() || self.memory_mb.is_some() || self.cpu_percent.is_some()
    }
}

/// One node of a specification's component tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub id: String,
    pub name: String,
    /// Depth from root (root = 0)
    pub level: usize,
    /// Absent for the root
    pub parent_id: Option<String>,
    /// Ordered children; empty means leaf
    pub children: Vec<ComponentNode>,
    pub metadata: Mapping,
    pub code_ref: Option<CodeRef>,
    pub module: Option<String>,
    pub functions: Vec<FunctionSpec>,
    pub description: Option<String>,
    /// Node-level `testing` mapping (`skip`, `coverage`, ...)
    pub testing: Mapping,
    pub kind: NodeKind,
}

impl ComponentNode {
    /// Create a bare component node
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        level: usize,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
            parent_id,
            children: Vec::new(),
            metadata: Mapping::new(),
            code_ref: None,
            module: None,
            functions: Vec::new(),
            description: None,
            testing: Mapping::new(),
            kind: NodeKind::Component,
        }
    }

    /// Create a placeholder node standing in for a malformed entry
    #[must_use]
    pub fn placeholder(
        id: impl Into<String>,
        level: usize,
        parent_id: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        let mut node = Self::new(id, "<invalid>", level, parent_id);
        node.kind = NodeKind::Placeholder {
            reason: reason.into(),
        };
        node
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder { .. })
    }

    /// Declared `metadata.dependencies`; non-string entries are ignored
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        string_list(self.metadata.get("dependencies"))
    }

    /// Declared `metadata.performance`, if it is a mapping
    #[must_use]
    pub fn performance(&self) -> Option<PerformanceThresholds> {
        self.metadata
            .get("performance")
            .and_then(Value::as_mapping)
            .map(PerformanceThresholds::from_mapping)
    }

    /// `metadata.criticality`, default `Normal`
    #[must_use]
    pub fn criticality(&self) -> Criticality {
        self.metadata
            .get("criticality")
            .and_then(Value::as_str)
            .map_or(Criticality::Normal, Criticality::parse)
    }

    /// `metadata.type`, else `supervisor` for inner nodes and `worker` for leaves
    #[must_use]
    pub fn component_type(&self) -> String {
        if let Some(t) = self.metadata.get("type").and_then(Value::as_str) {
            return t.to_string();
        }
        if self.is_leaf() {
            "worker".to_string()
        } else {
            "supervisor".to_string()
        }
    }

    /// `metadata.protocol`
    #[must_use]
    pub fn protocol(&self) -> Option<String> {
        self.metadata.get("protocol").and_then(scalar_string)
    }

    /// `metadata.supervision`
    #[must_use]
    pub fn supervision(&self) -> Option<String> {
        self.metadata.get("supervision").and_then(scalar_string)
    }

    /// Exclusive resources claimed under `metadata.resources`
    #[must_use]
    pub fn resources(&self) -> Vec<String> {
        string_list(self.metadata.get("resources"))
    }

    /// `testing.skip` on this node
    #[must_use]
    pub fn skip_testing(&self) -> bool {
        self.testing
            .get("skip")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether the node carries a non-empty description
    #[must_use]
    pub fn is_documented(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// Pre-order iterator over this node and all descendants
    pub fn iter(&self) -> impl Iterator<Item = &ComponentNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Breadth-first (level-order) iterator
    pub fn iter_breadth_first(&self) -> impl Iterator<Item = &ComponentNode> {
        let mut queue = VecDeque::from([self]);
        std::iter::from_fn(move || {
            let node = queue.pop_front()?;
            queue.extend(node.children.iter());
            Some(node)
        })
    }

    /// Find a node by id in this subtree
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ComponentNode> {
        self.iter().find(|n| n.id == id)
    }

    /// Total number of nodes in this subtree
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Leaves of this subtree, in pre-order
    pub fn leaves(&self) -> impl Iterator<Item = &ComponentNode> {
        self.iter().filter(|n| n.is_leaf())
    }

    /// Maximum depth below this node (a lone node has depth 0)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.iter()
            .map(|n| n.level - self.level)
            .max()
            .unwrap_or(0)
    }
}

/// Read a string-ish scalar (strings and numbers)
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn str_field(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(scalar_string)
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_sequence)
        .map(|seq| seq.iter().filter_map(scalar_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_ref_without_range() {
        let r = CodeRef::parse("lib/auth.ex").unwrap();
        assert_eq!(r.path, "lib/auth.ex");
        assert_eq!(r.lines, None);
    }

    #[test]
    fn code_ref_with_range() {
        let r = CodeRef::parse("lib/auth.ex:10-42").unwrap();
        assert_eq!(r.path, "lib/auth.ex");
        assert_eq!(r.lines, Some((10, 42)));
        assert_eq!(r.to_string(), "lib/auth.ex:10-42");
    }

    #[test]
    fn code_ref_single_line() {
        let r = CodeRef::parse("src/main.rs:7").unwrap();
        assert_eq!(r.lines, Some((7, 7)));
    }

    #[test]
    fn code_ref_rejects_inverted_range() {
        assert!(CodeRef::parse("src/main.rs:9-3").is_err());
        assert!(CodeRef::parse("src/main.rs:x-3").is_err());
        assert!(CodeRef::parse("").is_err());
    }

    #[test]
    fn criticality_parse_defaults_to_normal() {
        assert_eq!(Criticality::parse("CRITICAL"), Criticality::Critical);
        assert_eq!(Criticality::parse("whatever"), Criticality::Normal);
    }

    #[test]
    fn iterators_visit_in_expected_order() {
        let mut root = ComponentNode::new("root", "Root", 0, None);
        let mut a = ComponentNode::new("a", "A", 1, Some("root".into()));
        a.children
            .push(ComponentNode::new("a1", "A1", 2, Some("a".into())));
        root.children.push(a);
        root.children
            .push(ComponentNode::new("b", "B", 1, Some("root".into())));

        let pre: Vec<_> = root.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(pre, ["root", "a", "a1", "b"]);

        let bfs: Vec<_> = root.iter_breadth_first().map(|n| n.id.as_str()).collect();
        assert_eq!(bfs, ["root", "a", "b", "a1"]);

        assert_eq!(root.depth(), 2);
        assert_eq!(root.leaves().count(), 2);
        assert!(root.find("a1").is_some());
    }

    #[test]
    fn component_type_falls_back_to_shape() {
        let mut node = ComponentNode::new("n", "N", 0, None);
        assert_eq!(node.component_type(), "worker");
        node.children
            .push(ComponentNode::new("c", "C", 1, Some("n".into())));
        assert_eq!(node.component_type(), "supervisor");
        node.metadata
            .insert(Value::from("type"), Value::from("gateway"));
        assert_eq!(node.component_type(), "gateway");
    }
}
