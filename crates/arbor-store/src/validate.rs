//! Deep validation of loaded specifications
//!
//! Validation never fails as a whole: each check yields a classified
//! [`Finding`] and the aggregate is valid iff no finding is an error.

use crate::resolver::{ModuleResolver, Resolution};
use arbor_spec::{CodeRef, ComponentNode, Specification, StructuralError};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Which check produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Structure,
    MetadataTypes,
    ChildFields,
    CodeReference,
    ModuleReference,
}

/// One classified validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub check: Check,
    pub component_id: Option<String>,
    pub message: String,
}

impl Finding {
    fn new(
        severity: Severity,
        check: Check,
        component_id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            check,
            component_id: component_id.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component_id {
            Some(id) => write!(f, "[{}] {id}: {}", self.severity, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Aggregate of every finding for one specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub spec_id: String,
    pub checked_nodes: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// Valid iff there are no error findings
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }
}

/// Why a code reference does not resolve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeRefProblem {
    #[error("referenced file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("line range {start}-{end} exceeds file length {length}")]
    OutOfRange { start: u32, end: u32, length: usize },
}

/// Check that `code_ref` points at an existing file and line range under `root`
///
/// # Errors
/// The [`CodeRefProblem`] describing why the reference does not resolve.
pub async fn check_code_ref(root: &Path, code_ref: &CodeRef) -> Result<(), CodeRefProblem> {
    let length = line_count(&root.join(&code_ref.path)).await?;
    within_bounds(code_ref, length)
}

fn within_bounds(code_ref: &CodeRef, length: usize) -> Result<(), CodeRefProblem> {
    match code_ref.lines {
        Some((start, end)) if usize::try_from(end).map_or(true, |end| end > length) => {
            Err(CodeRefProblem::OutOfRange { start, end, length })
        }
        _ => Ok(()),
    }
}

async fn line_count(path: &Path) -> Result<usize, CodeRefProblem> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content.lines().count()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CodeRefProblem::MissingFile(path.to_path_buf()))
        }
        Err(e) => Err(CodeRefProblem::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Deep validator
#[derive(Debug, Clone)]
pub struct Validator {
    source_root: PathBuf,
    resolver: Arc<dyn ModuleResolver>,
}

impl Validator {
    /// Create validator resolving code references under `source_root`
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            source_root: source_root.into(),
            resolver,
        }
    }

    #[inline]
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn ModuleResolver> {
        &self.resolver
    }

    /// Run every check over `spec`
    pub async fn validate(&self, spec: &Specification) -> ValidationReport {
        let mut findings: Vec<Finding> = spec.structural_errors.iter().map(structural_finding).collect();

        if let Some(cross) = spec.document.get("cross_dependencies") {
            if !cross.is_sequence() {
                findings.push(Finding::new(
                    Severity::Error,
                    Check::MetadataTypes,
                    None,
                    "cross_dependencies must be a list",
                ));
            }
        }

        let mut line_counts: HashMap<PathBuf, Result<usize, CodeRefProblem>> = HashMap::new();
        let mut checked_nodes = 0;

        for node in spec.root.iter().filter(|n| !n.is_placeholder()) {
            checked_nodes += 1;
            check_metadata(node, &mut findings);

            if let Some(code_ref) = &node.code_ref {
                let path = self.source_root.join(&code_ref.path);
                if !line_counts.contains_key(&path) {
                    let count = line_count(&path).await;
                    line_counts.insert(path.clone(), count);
                }
                let outcome = match line_counts.get(&path) {
                    Some(Ok(length)) => within_bounds(code_ref, *length),
                    Some(Err(problem)) => Err(problem.clone()),
                    None => Ok(()),
                };
                findings.push(match outcome {
                    Ok(()) => Finding::new(
                        Severity::Info,
                        Check::CodeReference,
                        Some(&node.id),
                        format!("code reference {code_ref} resolved"),
                    ),
                    Err(problem) => Finding::new(
                        Severity::Error,
                        Check::CodeReference,
                        Some(&node.id),
                        problem.to_string(),
                    ),
                });
            }

            if let Some(module) = &node.module {
                let (severity, message) = match self.resolver.resolve(module) {
                    Resolution::Found => (Severity::Info, format!("module {module} resolved")),
                    Resolution::Missing => (Severity::Error, format!("module {module} is not loadable")),
                    Resolution::Unknown => (
                        Severity::Warning,
                        format!("module {module} cannot be verified"),
                    ),
                };
                findings.push(Finding::new(severity, Check::ModuleReference, Some(&node.id), message));
            }
        }

        tracing::debug!(
            "Validated {}: {} nodes, {} findings",
            spec.id,
            checked_nodes,
            findings.len()
        );

        ValidationReport {
            spec_id: spec.id.clone(),
            checked_nodes,
            findings,
        }
    }
}

fn check_metadata(node: &ComponentNode, findings: &mut Vec<Finding>) {
    if let Some(deps) = node.metadata.get("dependencies") {
        match deps.as_sequence() {
            None => findings.push(Finding::new(
                Severity::Error,
                Check::MetadataTypes,
                Some(&node.id),
                "metadata.dependencies must be a list",
            )),
            Some(seq) if !seq.iter().all(Value::is_string) => findings.push(Finding::new(
                Severity::Warning,
                Check::MetadataTypes,
                Some(&node.id),
                "metadata.dependencies contains non-string entries",
            )),
            Some(_) => {}
        }
    }

    if let Some(perf) = node.metadata.get("performance") {
        match perf.as_mapping() {
            None => findings.push(Finding::new(
                Severity::Error,
                Check::MetadataTypes,
                Some(&node.id),
                "metadata.performance must be a map",
            )),
            Some(map) => {
                for key in ["latency_ms", "memory_mb", "cpu_percent"] {
                    if map.get(key).is_some_and(|v| !v.is_number()) {
                        findings.push(Finding::new(
                            Severity::Warning,
                            Check::MetadataTypes,
                            Some(&node.id),
                            format!("metadata.performance.{key} is not a number"),
                        ));
                    }
                }
            }
        }
    }
}

fn structural_finding(error: &StructuralError) -> Finding {
    let (severity, check, component) = match error {
        StructuralError::MalformedNode { location, .. } => {
            (Severity::Error, Check::ChildFields, Some(location.as_str()))
        }
        StructuralError::DuplicateId { id, .. } => (Severity::Error, Check::Structure, Some(id.as_str())),
        StructuralError::MalformedCodeRef { component_id, .. } => {
            (Severity::Error, Check::CodeReference, Some(component_id.as_str()))
        }
        StructuralError::MalformedFunction { component_id, .. } => {
            (Severity::Warning, Check::Structure, Some(component_id.as_str()))
        }
        StructuralError::MalformedCrossDependency { .. } => (Severity::Error, Check::MetadataTypes, None),
        StructuralError::DepthExceeded { location, .. } => {
            (Severity::Error, Check::Structure, Some(location.as_str()))
        }
    };
    Finding::new(severity, check, component, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_specification;
    use crate::resolver::KnownModules;

    fn spec(yaml: &str) -> Specification {
        parse_specification(Path::new("v.yaml"), yaml).unwrap()
    }

    fn validator(root: &Path, modules: &[&str]) -> Validator {
        Validator::new(root, Arc::new(KnownModules::new(modules.iter().copied())))
    }

    #[tokio::test]
    async fn clean_spec_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let report = validator(dir.path(), &[])
            .validate(&spec("id: a\nname: A\nversion: '1'\n"))
            .await;
        assert!(report.is_valid());
        assert_eq!(report.checked_nodes, 1);
    }

    #[tokio::test]
    async fn metadata_types_are_checked() {
        let dir = tempfile::tempdir().unwrap();
        let report = validator(dir.path(), &[])
            .validate(&spec(
                "id: a\nname: A\nversion: '1'\nmetadata:\n  dependencies: db\n  performance: fast\n",
            ))
            .await;
        assert!(!report.is_valid());
        assert_eq!(report.count(Severity::Error), 2);
        assert!(report.errors().all(|f| f.check == Check::MetadataTypes));
    }

    #[tokio::test]
    async fn incomplete_children_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let report = validator(dir.path(), &[])
            .validate(&spec("id: a\nname: A\nversion: '1'\nchildren:\n  - id: b\n"))
            .await;
        assert!(!report.is_valid());
        assert!(report.errors().any(|f| f.check == Check::ChildFields));
    }

    #[tokio::test]
    async fn code_references_are_resolved_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/auth.ex"), "a\nb\nc\n").unwrap();

        let ok = validator(dir.path(), &[])
            .validate(&spec("id: a\nname: A\nversion: '1'\ncode_ref: lib/auth.ex:1-3\n"))
            .await;
        assert!(ok.is_valid());
        assert_eq!(ok.count(Severity::Info), 1);

        let out_of_range = validator(dir.path(), &[])
            .validate(&spec("id: a\nname: A\nversion: '1'\ncode_ref: lib/auth.ex:2-9\n"))
            .await;
        assert!(!out_of_range.is_valid());

        let missing = validator(dir.path(), &[])
            .validate(&spec("id: a\nname: A\nversion: '1'\ncode_ref: lib/none.ex\n"))
            .await;
        assert!(missing.errors().any(|f| f.message.contains("does not exist")));
    }

    #[tokio::test]
    async fn module_resolution_severity() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "id: a\nname: A\nversion: '1'\nmodule: Auth.Service\n";

        let unknown = validator(dir.path(), &[]).validate(&spec(doc)).await;
        assert!(unknown.is_valid());
        assert_eq!(unknown.count(Severity::Warning), 1);

        let missing = validator(dir.path(), &["Other"]).validate(&spec(doc)).await;
        assert!(!missing.is_valid());

        let found = validator(dir.path(), &["Auth.Service"]).validate(&spec(doc)).await;
        assert!(found.is_valid());
        assert_eq!(found.count(Severity::Warning), 0);
    }
}
