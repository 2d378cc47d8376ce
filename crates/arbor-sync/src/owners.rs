//! Static spec-name prefix → owning component table

use crate::error::SyncError;
use std::collections::HashSet;

/// Validated prefix table; the longest matching prefix wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerRegistry {
    entries: Vec<(String, String)>,
}

impl OwnerRegistry {
    /// Build and validate the table
    ///
    /// # Errors
    /// `InvalidOwnerTable` on an empty prefix, an empty owner or a
    /// duplicated prefix.
    pub fn new<P, O>(entries: impl IntoIterator<Item = (P, O)>) -> Result<Self, SyncError>
    where
        P: Into<String>,
        O: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut table = Vec::new();
        for (prefix, owner) in entries {
            let (prefix, owner) = (prefix.into(), owner.into());
            if prefix.is_empty() {
                return Err(SyncError::InvalidOwnerTable(format!(
                    "empty prefix for owner {owner}"
                )));
            }
            if owner.is_empty() {
                return Err(SyncError::InvalidOwnerTable(format!(
                    "prefix {prefix} has no owner"
                )));
            }
            if !seen.insert(prefix.clone()) {
                return Err(SyncError::InvalidOwnerTable(format!(
                    "prefix {prefix} mapped twice"
                )));
            }
            table.push((prefix, owner));
        }
        table.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Ok(Self { entries: table })
    }

    /// Owner of `spec`, if any prefix matches
    #[must_use]
    pub fn owner_of(&self, spec: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(prefix, _)| spec.starts_with(prefix.as_str()))
            .map(|(_, owner)| owner.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
