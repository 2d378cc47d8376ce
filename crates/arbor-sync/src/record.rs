//! Version records and conflict resolution

use arbor_spec::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a federation member
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Known version of one specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub checksum: ContentHash,
    pub updated_at: DateTime<Utc>,
    pub source_node: NodeId,
}

/// `{spec, checksum}` broadcast to peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub spec: String,
    pub checksum: ContentHash,
    pub updated_at: DateTime<Utc>,
    pub source_node: NodeId,
}

impl Announcement {
    #[must_use]
    pub fn record(&self) -> VersionRecord {
        VersionRecord {
            checksum: self.checksum,
            updated_at: self.updated_at,
            source_node: self.source_node.clone(),
        }
    }
}

/// Outcome of an incoming announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Spec unknown locally; record accepted verbatim
    Accepted(VersionRecord),
    /// Same checksum already known
    Unchanged,
    /// Incoming record replaces the local one
    Replaced {
        record: VersionRecord,
        superseded: ContentHash,
    },
}

/// Resolve `incoming` against the locally known record
///
/// Always prefers the remote record when checksums differ. Timestamps are
/// carried but not compared.
#[must_use]
pub fn resolve(existing: Option<&VersionRecord>, incoming: &Announcement) -> Resolution {
    match existing {
        None => Resolution::Accepted(incoming.record()),
        Some(current) if current.checksum == incoming.checksum => Resolution::Unchanged,
        Some(current) => Resolution::Replaced {
            record: incoming.record(),
            superseded: current.checksum,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn announcement(byte: u8, secs: i64, node: &str) -> Announcement {
        Announcement {
            spec: "auth".into(),
            checksum: ContentHash::new([byte; 32]),
            updated_at: Utc.timestamp_opt(secs, 0).unwrap(),
            source_node: node.into(),
        }
    }

    #[test]
    fn unknown_is_accepted_verbatim() {
        let incoming = announcement(1, 10, "b");
        assert_eq!(resolve(None, &incoming), Resolution::Accepted(incoming.record()));
    }

    #[test]
    fn equal_checksum_is_noop() {
        let local = announcement(1, 10, "a").record();
        assert_eq!(resolve(Some(&local), &announcement(1, 99, "b")), Resolution::Unchanged);
    }

    #[test]
    fn older_remote_still_wins() {
        let local = announcement(1, 100, "a").record();
        let incoming = announcement(2, 5, "b");
        assert_eq!(
            resolve(Some(&local), &incoming),
            Resolution::Replaced {
                record: incoming.record(),
                superseded: local.checksum,
            }
        );
    }

    proptest! {
        #[test]
        fn resolution_is_a_pure_function(
            local in proptest::option::of((any::<u8>(), 0i64..1_000_000)),
            remote in (any::<u8>(), 0i64..1_000_000),
        ) {
            let existing = local.map(|(b, t)| announcement(b, t, "a").record());
            let incoming = announcement(remote.0, remote.1, "b");

            let first = resolve(existing.as_ref(), &incoming);
            let second = resolve(existing.clone().as_ref(), &incoming.clone());
            prop_assert_eq!(&first, &second);

            match (&existing, &first) {
                (None, Resolution::Accepted(r)) => prop_assert_eq!(r, &incoming.record()),
                (Some(e), Resolution::Unchanged) => prop_assert_eq!(e.checksum, incoming.checksum),
                (Some(e), Resolution::Replaced { record, superseded }) => {
                    prop_assert_eq!(*superseded, e.checksum);
                    prop_assert_eq!(record, &incoming.record());
                }
                (existing, outcome) => prop_assert!(false, "{:?} -> {:?}", existing, outcome),
            }
        }
    }
}
