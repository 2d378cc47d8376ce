//! Specification documents
//!
//! A [`Specification`] is immutable once built; reloading a file produces a
//! new value rather than mutating the old one.

use crate::error::{SpecError, StructuralError};
use crate::hash::ContentHash;
use crate::node::{str_field, ComponentNode};
use crate::tree::extract_component_tree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::PathBuf;

/// Fields every specification must declare at the top level
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "name", "version"];

/// Where a specification came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Resolved source file
    pub file: PathBuf,
    /// Checksum of the raw file content
    pub checksum: ContentHash,
    /// When the document was parsed
    pub parsed_at: DateTime<Utc>,
}

impl SourceInfo {
    /// Stamp raw content read from `file`
    #[must_use]
    pub fn stamp(file: impl Into<PathBuf>, content: &[u8]) -> Self {
        Self {
            file: file.into(),
            checksum: ContentHash::compute(content),
            parsed_at: Utc::now(),
        }
    }
}

/// Explicit cross reference between components
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrossDependency {
    pub source: String,
    pub target: String,
    /// Relationship label, `uses` when not declared
    #[serde(rename = "type")]
    pub kind: String,
}

/// Metric measured by a performance benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    LatencyMs,
    MemoryMb,
    CpuPercent,
}

impl Metric {
    /// Parse from a benchmark `metric` field
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "latency_ms" | "latency" => Some(Self::LatencyMs),
            "memory_mb" | "memory" => Some(Self::MemoryMb),
            "cpu_percent" | "cpu" => Some(Self::CpuPercent),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LatencyMs => "latency_ms",
            Self::MemoryMb => "memory_mb",
            Self::CpuPercent => "cpu_percent",
        })
    }
}

/// Entry of `testing.performance_benchmarks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBenchmark {
    pub id: String,
    /// Component the benchmark applies to; the root when absent
    pub component: Option<String>,
    pub metric: Option<Metric>,
    pub target: Option<f64>,
}

/// Top-level `testing` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestingConfig {
    pub performance_benchmarks: Vec<PerformanceBenchmark>,
    /// Declared test coverage, percent
    pub coverage: Option<f64>,
}

impl TestingConfig {
    fn from_mapping(map: &Mapping) -> Self {
        let performance_benchmarks = map
            .get("performance_benchmarks")
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(Value::as_mapping)
                    .filter_map(|b| {
                        Some(PerformanceBenchmark {
                            id: str_field(b, "id")?,
                            component: str_field(b, "component"),
                            metric: b.get("metric").and_then(Value::as_str).and_then(Metric::parse),
                            target: b.get("target").and_then(Value::as_f64),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            performance_benchmarks,
            coverage: map.get("coverage").and_then(Value::as_f64),
        }
    }
}

/// A loaded, validated-for-shape specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub metadata: Mapping,
    pub cross_dependencies: Vec<CrossDependency>,
    pub testing: TestingConfig,
    /// Component tree; the root mirrors the specification itself
    pub root: ComponentNode,
    /// Defects accumulated while building the tree
    pub structural_errors: Vec<StructuralError>,
    pub source: SourceInfo,
    /// Parsed document as read
    pub document: Value,
}

impl Specification {
    /// Build a specification from a parsed document
    ///
    /// # Errors
    /// - `SpecError::InvalidDocument` if the document is not a mapping
    /// - `SpecError::MissingRequiredFields` naming each absent required field
    pub fn from_document(document: Value, source: SourceInfo) -> Result<Self, SpecError> {
        let map = document
            .as_mapping()
            .ok_or_else(|| SpecError::InvalidDocument("top level must be a mapping".to_string()))?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|f| str_field(map, f).is_none())
            .map(|f| (*f).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SpecError::MissingRequiredFields(missing));
        }

        let id = str_field(map, "id").unwrap_or_default();
        let name = str_field(map, "name").unwrap_or_default();
        let version = str_field(map, "version").unwrap_or_default();

        let metadata = map
            .get("metadata")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();
        let testing = map
            .get("testing")
            .and_then(Value::as_mapping)
            .map(TestingConfig::from_mapping)
            .unwrap_or_default();

        let (root, mut structural_errors) = extract_component_tree(&document);

        let mut cross_dependencies = Vec::new();
        if let Some(entries) = map.get("cross_dependencies").and_then(Value::as_sequence) {
            for (index, entry) in entries.iter().enumerate() {
                let parsed = entry.as_mapping().and_then(|m| {
                    Some(CrossDependency {
                        source: str_field(m, "source")?,
                        target: str_field(m, "target")?,
                        kind: str_field(m, "type").unwrap_or_else(|| "uses".to_string()),
                    })
                });
                match parsed {
                    Some(dep) => cross_dependencies.push(dep),
                    None => structural_errors.push(StructuralError::MalformedCrossDependency { index }),
                }
            }
        }

        Ok(Self {
            id,
            name,
            version,
            description: root.description.clone(),
            metadata,
            cross_dependencies,
            testing,
            root,
            structural_errors,
            source,
            document,
        })
    }

    /// Checksum of the source content
    #[inline]
    #[must_use]
    pub fn checksum(&self) -> ContentHash {
        self.source.checksum
    }

    /// Number of components in the tree
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.root.count()
    }
}
