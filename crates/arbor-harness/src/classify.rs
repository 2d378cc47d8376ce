//! Failure classification shared by the tree tester and the debug engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure type derived from an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    Timeout,
    Dependency,
    Permission,
    Interface,
    Resource,
    Unknown,
}

impl FailureType {
    /// Keyword match over an error message
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        if message.contains("timeout") || message.contains("timed out") {
            Self::Timeout
        } else if message.contains("not found") {
            Self::Dependency
        } else if message.contains("permission") {
            Self::Permission
        } else if message.contains("undefined") {
            Self::Interface
        } else if message.contains("memory") {
            Self::Resource
        } else {
            Self::Unknown
        }
    }

    /// Root-cause hypothesis for a failure of this type in `component`
    #[must_use]
    pub fn hypothesis(self, component: &str) -> String {
        match self {
            Self::Timeout => format!("{component} does not respond within its time budget"),
            Self::Dependency => format!("{component} references a dependency that cannot be found"),
            Self::Permission => format!("{component} lacks access to a required resource"),
            Self::Interface => format!("{component} does not implement its declared interface"),
            Self::Resource => format!("{component} exhausts its memory allowance"),
            Self::Unknown => format!("{component} fails for an unclassified reason"),
        }
    }

    /// One-line remediation sketch
    #[must_use]
    pub fn remediation(self) -> &'static str {
        match self {
            Self::Timeout => "profile the slow path and add a timeout with backoff",
            Self::Dependency => "restore the missing dependency or correct the reference",
            Self::Permission => "grant the required access or adjust the component's privileges",
            Self::Interface => "implement the missing functions or fix the interface declaration",
            Self::Resource => "bound memory usage and check for leaks",
            Self::Unknown => "inspect logs around the failure and add diagnostics",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timeout => "timeout",
            Self::Dependency => "dependency",
            Self::Permission => "permission",
            Self::Interface => "interface",
            Self::Resource => "resource",
            Self::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_classification() {
        assert_eq!(FailureType::from_message("request TIMEOUT"), FailureType::Timeout);
        assert_eq!(FailureType::from_message("module not found"), FailureType::Dependency);
        assert_eq!(FailureType::from_message("permission denied"), FailureType::Permission);
        assert_eq!(FailureType::from_message("function undefined"), FailureType::Interface);
        assert_eq!(FailureType::from_message("out of memory"), FailureType::Resource);
        assert_eq!(FailureType::from_message("boom"), FailureType::Unknown);
    }

    #[test]
    fn first_matching_keyword_wins() {
        assert_eq!(
            FailureType::from_message("timeout while module not found"),
            FailureType::Timeout
        );
    }
}
