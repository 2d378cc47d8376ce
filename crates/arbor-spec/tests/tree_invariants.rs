//! Property tests for component tree construction

use arbor_spec::{extract_component_tree, ComponentNode, SourceInfo, Specification};
use proptest::prelude::*;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Shape(Vec<Shape>);

fn shape() -> impl Strategy<Value = Shape> {
    Just(Shape(Vec::new())).prop_recursive(5, 48, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Shape)
    })
}

fn to_document(shape: &Shape, next: &mut usize, root: bool) -> Value {
    let id = format!("c{next}");
    *next += 1;
    let mut map = Mapping::new();
    map.insert("id".into(), id.clone().into());
    map.insert("name".into(), id.into());
    if root {
        map.insert("version".into(), "1.0".into());
    }
    if !shape.0.is_empty() {
        let children = shape.0.iter().map(|s| to_document(s, next, false)).collect();
        map.insert("children".into(), Value::Sequence(children));
    }
    Value::Mapping(map)
}

fn levels(root: &ComponentNode) -> HashMap<String, usize> {
    root.iter().map(|n| (n.id.clone(), n.level)).collect()
}

proptest! {
    #[test]
    fn every_level_is_parent_level_plus_one(shape in shape()) {
        let document = to_document(&shape, &mut 0, true);
        let (root, errors) = extract_component_tree(&document);
        prop_assert!(errors.is_empty());

        let by_id = levels(&root);
        let mut roots = 0;
        for node in root.iter() {
            match &node.parent_id {
                None => roots += 1,
                Some(parent) => prop_assert_eq!(node.level, by_id[parent] + 1),
            }
        }
        prop_assert_eq!(roots, 1);
        prop_assert_eq!(root.level, 0);
    }

    #[test]
    fn rebuilding_the_same_document_is_identical(shape in shape()) {
        let document = to_document(&shape, &mut 0, true);
        let raw = serde_yaml::to_string(&document).unwrap();

        let a = Specification::from_document(document.clone(), SourceInfo::stamp("p.yaml", raw.as_bytes())).unwrap();
        let b = Specification::from_document(document, SourceInfo::stamp("p.yaml", raw.as_bytes())).unwrap();
        prop_assert_eq!(a.checksum(), b.checksum());
        prop_assert_eq!(a.root, b.root);
    }
}
