//! Behavioral mock synthesis
//!
//! Mocks are derived from a component's declared `functions`. A function
//! with an explicit `returns` value replays it; otherwise the name decides:
//!
//! | prefix / name | behavior |
//! |---|---|
//! | `get_`, `fetch_`, `list_` | empty collection |
//! | `is_`, `has_` | `false` |
//! | `start`, `stop`, `init`, `reset` | `ok` |
//!
//! Anything else cannot be synthesized and is reported as a coverage gap.

use arbor_spec::{ComponentNode, FunctionSpec};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Synthesized behavior of one mocked function
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "behavior", content = "value", rename_all = "snake_case")]
pub enum MockBehavior {
    /// Replays the declared `returns` value
    Returns(Value),
    EmptyCollection,
    False,
    Ok,
}

impl MockBehavior {
    /// Value produced when the mocked function is called
    #[must_use]
    pub fn value(&self) -> Value {
        match self {
            Self::Returns(v) => v.clone(),
            Self::EmptyCollection => Value::Sequence(Vec::new()),
            Self::False => Value::Bool(false),
            Self::Ok => Value::String("ok".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockFunction {
    pub name: String,
    pub arity: Option<u32>,
    pub behavior: MockBehavior,
}

/// Mock standing in for one component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehavioralMock {
    pub component_id: String,
    pub functions: Vec<MockFunction>,
    /// Declared functions with no synthesizable behavior
    pub gaps: Vec<String>,
}

impl BehavioralMock {
    /// Fraction of declared functions the mock covers; 1.0 with none declared
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage(&self) -> f64 {
        let declared = self.functions.len() + self.gaps.len();
        if declared == 0 {
            1.0
        } else {
            self.functions.len() as f64 / declared as f64
        }
    }

    /// Call a mocked function by name
    #[must_use]
    pub fn call(&self, name: &str) -> Option<Value> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.behavior.value())
    }
}

/// Synthesizes [`BehavioralMock`]s from declared interfaces
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator;

impl MockGenerator {
    #[must_use]
    pub fn generate(&self, node: &ComponentNode) -> BehavioralMock {
        let mut functions = Vec::new();
        let mut gaps = Vec::new();
        for function in &node.functions {
            match Self::behavior_for(function) {
                Some(behavior) => functions.push(MockFunction {
                    name: function.name.clone(),
                    arity: function.arity,
                    behavior,
                }),
                None => gaps.push(function.name.clone()),
            }
        }
        BehavioralMock {
            component_id: node.id.clone(),
            functions,
            gaps,
        }
    }

    fn behavior_for(function: &FunctionSpec) -> Option<MockBehavior> {
        if let Some(value) = &function.returns {
            return Some(MockBehavior::Returns(value.clone()));
        }
        let name = function.name.as_str();
        if ["get_", "fetch_", "list_"].iter().any(|p| name.starts_with(p)) {
            Some(MockBehavior::EmptyCollection)
        } else if ["is_", "has_"].iter().any(|p| name.starts_with(p)) {
            Some(MockBehavior::False)
        } else if matches!(name, "start" | "stop" | "init" | "reset") {
            Some(MockBehavior::Ok)
        } else {
            None
        }
    }
}

/// Mocks keyed by the component they replace
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MockSet {
    mocks: BTreeMap<String, BehavioralMock>,
}

impl MockSet {
    /// Set holding a single mock
    #[must_use]
    pub fn single(mock: BehavioralMock) -> Self {
        let mut set = Self::default();
        set.insert(mock);
        set
    }

    pub fn insert(&mut self, mock: BehavioralMock) {
        self.mocks.insert(mock.component_id.clone(), mock);
    }

    #[must_use]
    pub fn get(&self, component_id: &str) -> Option<&BehavioralMock> {
        self.mocks.get(component_id)
    }

    #[must_use]
    pub fn contains(&self, component_id: &str) -> bool {
        self.mocks.contains_key(component_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mocks.is_empty()
    }
}
