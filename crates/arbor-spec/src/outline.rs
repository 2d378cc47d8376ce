//! Outlines of a component tree: ASCII drawing, a serializable export and
//! search by id or name

use crate::document::Specification;
use crate::node::ComponentNode;
use serde::Serialize;

/// Version tag carried by [`Outline`] exports
pub const OUTLINE_FORMAT_VERSION: &str = "1.0";

/// Nested, serializable view of a specification's tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    pub format_version: &'static str,
    pub spec_id: String,
    pub version: String,
    pub root: OutlineNode,
}

impl Outline {
    #[must_use]
    pub fn of(spec: &Specification) -> Self {
        Self {
            format_version: OUTLINE_FORMAT_VERSION,
            spec_id: spec.id.clone(),
            version: spec.version.clone(),
            root: OutlineNode::of(&spec.root),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineNode {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub component_type: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    #[must_use]
    pub fn of(node: &ComponentNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            component_type: node.component_type(),
            placeholder: node.is_placeholder(),
            children: node.children.iter().map(Self::of).collect(),
        }
    }
}

/// Draw the tree with box characters
///
/// The root line is its name; every other line is `id name`. Nodes whose
/// children lie below `max_depth` end in `[+]`.
#[must_use]
pub fn render_ascii(root: &ComponentNode, max_depth: Option<usize>) -> String {
    let mut lines = vec![root.name.clone()];
    ascii_children(root, root.level, "", max_depth, &mut lines);
    lines.join("\n")
}

fn ascii_children(
    node: &ComponentNode,
    base_level: usize,
    prefix: &str,
    max_depth: Option<usize>,
    lines: &mut Vec<String>,
) {
    let last = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let (connector, indent) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let depth = child.level - base_level;
        let collapsed = !child.is_leaf() && max_depth.is_some_and(|max| depth >= max);
        lines.push(format!(
            "{prefix}{connector}{} {}{}",
            child.id,
            child.name,
            if collapsed { " [+]" } else { "" }
        ));
        if !collapsed {
            ascii_children(child, base_level, &format!("{prefix}{indent}"), max_depth, lines);
        }
    }
}

/// Nodes whose id or name contains `query`, case-insensitively, in pre-order
#[must_use]
pub fn search<'a>(root: &'a ComponentNode, query: &str) -> Vec<&'a ComponentNode> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    root.iter()
        .filter(|n| n.id.to_lowercase().contains(&query) || n.name.to_lowercase().contains(&query))
        .collect()
}

/// Ids from `root` down to the node `id`, both included
#[must_use]
pub fn path_to(root: &ComponentNode, id: &str) -> Option<Vec<String>> {
    if root.id == id {
        return Some(vec![root.id.clone()]);
    }
    root.children.iter().find_map(|child| {
        path_to(child, id).map(|mut path| {
            path.insert(0, root.id.clone());
            path
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceInfo;

    const SHOP: &str = r"
id: shop
name: Shop
version: '2'
children:
  - id: cart
    name: Cart
    description: Basket contents
    children:
      - id: cart_store
        name: Cart Store
  - id: checkout
    name: Checkout
";

    fn shop() -> Specification {
        let document = serde_yaml::from_str(SHOP).unwrap();
        Specification::from_document(document, SourceInfo::stamp("shop.yaml", SHOP.as_bytes()))
            .unwrap()
    }

    #[test]
    fn ascii_tree_uses_box_characters() {
        let text = render_ascii(&shop().root, None);
        assert_eq!(
            text,
            "Shop\n├── cart Cart\n│   └── cart_store Cart Store\n└── checkout Checkout"
        );
    }

    #[test]
    fn depth_limit_collapses_inner_nodes() {
        let text = render_ascii(&shop().root, Some(1));
        assert_eq!(text, "Shop\n├── cart Cart [+]\n└── checkout Checkout");
    }

    #[test]
    fn outline_nests_children() {
        let outline = Outline::of(&shop());
        assert_eq!(outline.format_version, "1.0");
        assert_eq!(outline.root.children.len(), 2);
        assert_eq!(outline.root.children[0].children[0].id, "cart_store");
        assert_eq!(outline.root.children[0].description.as_deref(), Some("Basket contents"));

        let json = serde_json::to_value(&outline).unwrap();
        assert_eq!(json["root"]["children"][1]["component_type"], "worker");
        assert!(json["root"]["children"][1].get("children").is_none());
    }

    #[test]
    fn search_matches_id_or_name_ignoring_case() {
        let spec = shop();
        let ids: Vec<&str> = search(&spec.root, "CART").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["cart", "cart_store"]);
        assert_eq!(search(&spec.root, "check")[0].id, "checkout");
        assert!(search(&spec.root, "  ").is_empty());
    }

    #[test]
    fn path_runs_from_root() {
        let spec = shop();
        assert_eq!(
            path_to(&spec.root, "cart_store"),
            Some(vec!["shop".into(), "cart".into(), "cart_store".into()])
        );
        assert_eq!(path_to(&spec.root, "ghost"), None);
    }
}
