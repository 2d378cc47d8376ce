//! Error types for the specification store

use arbor_spec::SpecError;
use std::path::PathBuf;

/// Errors loading a specification
///
/// Every variant is recoverable: the caller may retry after fixing the
/// document or the specification directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Resolved file does not exist
    #[error("specification '{name}' not found at {path}")]
    NotFound { name: String, path: PathBuf },

    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid YAML
    #[error("syntax error in {path}: {message}")]
    Syntax { path: PathBuf, message: String },

    /// File larger than the configured maximum
    #[error("file too large: {path} is {size} bytes (max: {max})")]
    TooLarge { path: PathBuf, size: usize, max: usize },

    /// Parsed document is not a valid specification
    #[error("invalid specification {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SpecError,
    },
}

impl LoadError {
    /// Create IO error for path, mapping `NotFound` to [`LoadError::NotFound`]
    pub fn io_error(name: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                name: name.to_string(),
                path,
            }
        } else {
            Self::Io { path, source }
        }
    }

    /// Create syntax error for path
    pub fn syntax_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Fields reported missing, if this is a missing-field error
    #[must_use]
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            Self::Invalid {
                source: SpecError::MissingRequiredFields(fields),
                ..
            } => Some(fields),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = LoadError::io_error(
            "auth",
            "/specs/auth.yaml",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, LoadError::NotFound { ref name, .. } if name == "auth"));
    }

    #[test]
    fn other_io_errors_are_kept() {
        let err = LoadError::io_error(
            "auth",
            "/specs/auth.yaml",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn missing_fields_accessor() {
        let err = LoadError::Invalid {
            path: "x.yaml".into(),
            source: SpecError::MissingRequiredFields(vec!["version".into()]),
        };
        assert_eq!(err.missing_fields(), Some(&["version".to_string()][..]));
        assert!(err.to_string().contains("missing required fields: version"));
    }
}
