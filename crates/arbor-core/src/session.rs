//! In-flight session tracking and per-spec request serialization

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

/// What a session is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Validate,
    TreeTest,
    Debug,
    Integration,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::TreeTest => "tree_test",
            Self::Debug => "debug",
            Self::Integration => "integration",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: Ulid,
    pub kind: SessionKind,
    pub spec: String,
    pub started_at: DateTime<Utc>,
}

/// Registry of running sessions
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<DashMap<Ulid, SessionInfo>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; it is removed when the guard drops
    #[must_use]
    pub fn begin(&self, kind: SessionKind, spec: &str) -> SessionGuard {
        let info = SessionInfo {
            id: Ulid::new(),
            kind,
            spec: spec.to_string(),
            started_at: Utc::now(),
        };
        tracing::debug!("Session {} started: {} {}", info.id, kind, spec);
        let id = info.id;
        self.active.insert(id, info);
        SessionGuard {
            id,
            active: Arc::clone(&self.active),
        }
    }

    /// Running sessions, oldest first
    #[must_use]
    pub fn active(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<_> = self.active.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by_key(|s| (s.started_at, s.id));
        sessions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Keeps a session registered while alive
#[derive(Debug)]
pub struct SessionGuard {
    id: Ulid,
    active: Arc<DashMap<Ulid, SessionInfo>>,
}

impl SessionGuard {
    #[inline]
    #[must_use]
    pub fn id(&self) -> Ulid {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some((id, info)) = self.active.remove(&self.id) {
            let elapsed = Utc::now() - info.started_at;
            tracing::debug!(
                "Session {} finished after {}ms",
                id,
                elapsed.num_milliseconds()
            );
        }
    }
}

/// One async mutex per specification name
///
/// Requests for the same specification run one at a time; different
/// specifications never contend.
#[derive(Debug, Default)]
pub struct SpecLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SpecLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `spec`
    pub async fn lock(&self, spec: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(
            self.locks
                .entry(spec.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn guard_drop_unregisters() {
        let registry = SessionRegistry::new();
        let first = registry.begin(SessionKind::TreeTest, "auth");
        let second = registry.begin(SessionKind::Debug, "billing");

        let active = registry.active();
        assert_eq!(active.len(), 2);
        assert!(active
            .iter()
            .any(|s| s.id == second.id() && s.kind == SessionKind::Debug && s.spec == "billing"));

        drop(first);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active()[0].id, second.id());

        drop(second);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn same_spec_is_serialized() {
        let locks = Arc::new(SpecLocks::new());
        let held = locks.lock("auth").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("auth").await;
            })
        };
        let other = locks.lock("billing").await;
        drop(other);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
    }
}
