//! Module reference resolution

use std::collections::BTreeSet;
use std::fmt::Debug;

/// Outcome of resolving a `module` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Implementation symbol is loadable
    Found,
    /// Implementation symbol is definitely absent
    Missing,
    /// Resolver has no knowledge either way
    Unknown,
}

/// Resolves implementation symbols named by `module`
pub trait ModuleResolver: Send + Sync + Debug {
    fn resolve(&self, module: &str) -> Resolution;
}

/// Resolver backed by a static set of known module names
///
/// An empty set knows nothing, so every lookup is [`Resolution::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownModules {
    modules: BTreeSet<String>,
}

impl KnownModules {
    #[must_use]
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleResolver for KnownModules {
    fn resolve(&self, module: &str) -> Resolution {
        if self.modules.is_empty() {
            Resolution::Unknown
        } else if self.modules.contains(module) {
            Resolution::Found
        } else {
            Resolution::Missing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_is_unknown() {
        assert_eq!(KnownModules::default().resolve("Auth"), Resolution::Unknown);
    }

    #[test]
    fn registry_lookup() {
        let known = KnownModules::new(["Auth.Service"]);
        assert_eq!(known.resolve("Auth.Service"), Resolution::Found);
        assert_eq!(known.resolve("Auth.Other"), Resolution::Missing);
    }
}
