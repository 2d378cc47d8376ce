//! YAML specification parser
//!
//! Uses `serde_yaml` for the document grammar; anchors and aliases are
//! resolved by the parser. Only the first document of a multi-document file
//! is considered.

use crate::error::LoadError;
use arbor_spec::{SourceInfo, Specification};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// Parse raw text into a YAML value
///
/// # Errors
/// `LoadError::Syntax` when the content is not valid YAML.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, LoadError> {
    match serde_yaml::Deserializer::from_str(content).next() {
        Some(document) => {
            Value::deserialize(document).map_err(|e| LoadError::syntax_error(path, e.to_string()))
        }
        None => Ok(Value::Null),
    }
}

/// Parse raw text into a stamped [`Specification`]
///
/// # Errors
/// - `LoadError::Syntax` when the content is not valid YAML
/// - `LoadError::Invalid` when required fields are missing
pub fn parse_specification(path: &Path, content: &str) -> Result<Specification, LoadError> {
    let document = parse_document(path, content)?;
    let source = SourceInfo::stamp(path, content.as_bytes());
    Specification::from_document(document, source).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_document_only() {
        let doc = parse_document(Path::new("m.yaml"), "id: a\n---\nid: b\n").unwrap();
        assert_eq!(doc.get("id").and_then(Value::as_str), Some("a"));
    }

    #[test]
    fn empty_content_is_null() {
        assert_eq!(parse_document(Path::new("e.yaml"), "").unwrap(), Value::Null);
    }

    #[test]
    fn syntax_errors_carry_path() {
        let err = parse_document(Path::new("bad.yaml"), "id: [unterminated\n").unwrap_err();
        assert!(matches!(err, LoadError::Syntax { ref path, .. } if path == Path::new("bad.yaml")));
    }

    #[test]
    fn missing_version_is_invalid() {
        let err = parse_specification(Path::new("s.yaml"), "id: s\nname: S\n").unwrap_err();
        assert_eq!(err.missing_fields(), Some(&["version".to_string()][..]));
    }

    #[test]
    fn checksum_is_stable() {
        let raw = "id: s\nname: S\nversion: '1'\n";
        let a = parse_specification(Path::new("s.yaml"), raw).unwrap();
        let b = parse_specification(Path::new("s.yaml"), raw).unwrap();
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.root, b.root);
    }
}
