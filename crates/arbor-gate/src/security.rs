//! Pattern-based security scan over a candidate document
//!
//! Every string scalar is scanned, and so is every `key: value` pair with a
//! scalar value, so that `password: hunter2` matches a credential rule.

use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;

#[derive(Debug, Clone)]
pub struct SecurityRule {
    pub id: String,
    pub description: String,
    pattern: Regex,
}

impl SecurityRule {
    /// # Errors
    /// When `pattern` is not a valid regular expression.
    pub fn new(id: &str, description: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            id: id.to_string(),
            description: description.to_string(),
            pattern: Regex::new(pattern)?,
        })
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

const BUILTIN_RULES: &[(&str, &str, &str)] = &[
    (
        "hardcoded_credential",
        "credential value committed in the document",
        r#"(?i)\b(password|passwd|secret|api[_-]?key|access[_-]?token|private[_-]?key)\s*[=:]\s*['"]?[^\s'"]{4,}"#,
    ),
    (
        "private_key_block",
        "embedded private key",
        r"-----BEGIN (RSA |EC |OPENSSH |DSA )?PRIVATE KEY-----",
    ),
    (
        "plaintext_endpoint",
        "unencrypted network endpoint",
        r"(?i)\b(http|ftp|telnet)://[^\s/]+",
    ),
    (
        "dynamic_evaluation",
        "runtime code evaluation",
        r"(?i)\b(eval|exec|eval_string|system)\s*\(",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityFinding {
    pub rule_id: String,
    pub description: String,
    /// Dotted location in the document, e.g. `children[0].metadata.url`
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scanned_strings: usize,
    pub findings: Vec<SecurityFinding>,
}

impl ScanReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SecurityScanner {
    rules: Vec<SecurityRule>,
}

impl Default for SecurityScanner {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SecurityScanner {
    /// Scanner with the built-in credential, endpoint and evaluation rules
    #[must_use]
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .filter_map(|(id, description, pattern)| {
                SecurityRule::new(id, description, pattern)
                    .map_err(|e| tracing::error!("Built-in security rule {} invalid: {}", id, e))
                    .ok()
            })
            .collect();
        Self { rules }
    }

    #[must_use]
    pub fn with_rules(rules: Vec<SecurityRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: SecurityRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[SecurityRule] {
        &self.rules
    }

    /// Scan every string in `document`
    #[must_use]
    pub fn scan(&self, document: &Value) -> ScanReport {
        let mut report = ScanReport::default();
        self.walk(document, "", &mut report);
        report
    }

    fn walk(&self, value: &Value, location: &str, report: &mut ScanReport) {
        match value {
            Value::String(s) => self.check(s, location, report),
            Value::Sequence(seq) => {
                for (i, item) in seq.iter().enumerate() {
                    self.walk(item, &format!("{location}[{i}]"), report);
                }
            }
            Value::Mapping(map) => {
                for (key, item) in map {
                    let Some(key) = key.as_str() else { continue };
                    let here = if location.is_empty() {
                        key.to_string()
                    } else {
                        format!("{location}.{key}")
                    };
                    if let Some(scalar) = scalar(item) {
                        self.check(&format!("{key}: {scalar}"), &here, report);
                    } else {
                        self.walk(item, &here, report);
                    }
                }
            }
            Value::Tagged(tagged) => self.walk(&tagged.value, location, report),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    fn check(&self, text: &str, location: &str, report: &mut ScanReport) {
        report.scanned_strings += 1;
        for rule in self.rules.iter().filter(|r| r.is_match(text)) {
            tracing::debug!("Security rule {} matched at {}", rule.id, location);
            report.findings.push(SecurityFinding {
                rule_id: rule.id.clone(),
                description: rule.description.clone(),
                location: location.to_string(),
            });
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
