//! Testing utilities for the Arbor workspace
//!
//! Shared fixtures, a temporary specification directory and a scripted probe.

#![allow(missing_docs)]

use arbor_harness::{ComponentProbe, Measurements, ProbeMode, ProbeOutcome, ProbeRequest};
use arbor_spec::{SourceInfo, Specification};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Three-level authentication service
pub const AUTH_SPEC: &str = r"
id: auth
name: Authentication Service
version: '1.2.0'
description: Issues and verifies session tokens
metadata:
  type: supervisor
  supervision: one_for_one
  dependencies: [user_store]
children:
  - id: token_issuer
    name: Token Issuer
    description: Signs new tokens
    metadata:
      type: worker
      protocol: grpc
      performance:
        latency_ms: 50
    functions:
      - {name: issue, doc: Issue a token, errors: [invalid_credentials]}
      - {name: is_revoked, doc: Revocation check}
  - id: session_manager
    name: Session Manager
    description: Tracks live sessions
    metadata:
      type: supervisor
      supervision: one_for_all
    children:
      - id: session_cache
        name: Session Cache
        description: In-memory session table
        metadata:
          resources: [session_table]
        functions:
          - {name: get_session, doc: Look up a session}
          - {name: reset, doc: Drop every session}
      - id: session_reaper
        name: Session Reaper
        description: Expires idle sessions
        functions: [start, stop]
";

/// Single-component specification with the given id
#[must_use]
pub fn minimal_spec(id: &str) -> String {
    format!("id: {id}\nname: {id}\nversion: '1'\ndescription: Minimal component {id}\n")
}

/// Root with `n` documented leaf children `c1..=cn`
#[must_use]
pub fn flat_spec(id: &str, n: usize) -> String {
    let mut yaml = format!("id: {id}\nname: {id}\nversion: '1'\ndescription: Flat fixture\nchildren:\n");
    for i in 1..=n {
        yaml.push_str(&format!(
            "  - id: {id}_c{i}\n    name: Child {i}\n    description: Leaf {i}\n"
        ));
    }
    yaml
}

/// Parse a fixture into a [`Specification`]
///
/// # Panics
/// When the fixture is not a valid specification.
#[must_use]
pub fn spec_from_yaml(yaml: &str) -> Specification {
    let document = serde_yaml::from_str(yaml).unwrap();
    Specification::from_document(document, SourceInfo::stamp("fixture.yaml", yaml.as_bytes()))
        .unwrap()
}

/// Temporary specification directory
#[derive(Debug)]
pub struct SpecDir {
    dir: TempDir,
}

impl SpecDir {
    /// # Panics
    /// When the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `{name}.yaml`
    ///
    /// # Panics
    /// On write failure.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.yaml"));
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a file at a path relative to the directory, creating parents
    ///
    /// # Panics
    /// On write failure.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// # Panics
    /// When the file does not exist.
    pub fn remove(&self, name: &str) {
        std::fs::remove_file(self.dir.path().join(format!("{name}.yaml"))).unwrap();
    }
}

impl Default for SpecDir {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
struct Script {
    failure: Option<String>,
    function: Option<String>,
    measurements: Measurements,
    delay: Option<Duration>,
}

/// Probe answering from a per-component script
///
/// Unscripted components pass. A component replaced by a mock always passes.
/// Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, ProbeMode)>>,
}

impl ScriptedProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail(mut self, id: &str, message: &str) -> Self {
        self.scripts.entry(id.to_string()).or_default().failure = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn fail_in(mut self, id: &str, function: &str, message: &str) -> Self {
        let script = self.scripts.entry(id.to_string()).or_default();
        script.failure = Some(message.to_string());
        script.function = Some(function.to_string());
        self
    }

    #[must_use]
    pub fn measure(mut self, id: &str, measurements: Measurements) -> Self {
        self.scripts.entry(id.to_string()).or_default().measurements = measurements;
        self
    }

    #[must_use]
    pub fn delay(mut self, id: &str, delay: Duration) -> Self {
        self.scripts.entry(id.to_string()).or_default().delay = Some(delay);
        self
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<(String, ProbeMode)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|(c, _)| c == id).count()
    }
}

#[async_trait]
impl ComponentProbe for ScriptedProbe {
    async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
        let id = request.node.id.clone();
        self.calls.lock().push((id.clone(), request.mode));

        let Some(script) = self.scripts.get(&id) else {
            return ProbeOutcome::pass();
        };
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        if request.mocks.contains(&id) {
            return ProbeOutcome::pass().with_measurements(script.measurements);
        }
        match (&script.failure, &script.function) {
            (Some(message), Some(function)) => ProbeOutcome::fail(message.clone())
                .in_function(function.clone())
                .with_measurements(script.measurements),
            (Some(message), None) => {
                ProbeOutcome::fail(message.clone()).with_measurements(script.measurements)
            }
            (None, _) => ProbeOutcome::pass().with_measurements(script.measurements),
        }
    }
}
