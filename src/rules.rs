//! Declarative governance rules: loaded once at startup, immutable after.
//!
//! A rules document is a JSON object `{"rules": [...]}`. Rules are evaluated
//! in document order and the first match wins; when nothing matches the
//! verdict is allow. The system is additive hardening over an ecosystem
//! with no native gating, so the default must stay permissive.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::classifier::OperationClass;

// ── Error types ──

/// Errors from loading or validating a rules document.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The rules file could not be read.
    #[error("failed to read rules file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("rules file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The root is not an object carrying a `rules` array.
    #[error("rules document must be an object with a 'rules' array")]
    MissingRules,

    /// A rule is structurally invalid.
    #[error("rule {index}: missing or invalid field '{field}'")]
    InvalidRule {
        /// Zero-based index of the offending rule.
        index: usize,
        /// Name of the missing or malformed field.
        field: &'static str,
    },
}

// ── Rule model ──

/// Verdict a rule can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Forward the call to the target.
    Allow,
    /// Block the call and synthesize a denial.
    Deny,
}

/// A single governance rule: service × operation classes → permission.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Service this rule applies to.
    pub service: String,
    /// Operation classes gated by this rule; an empty list matches nothing.
    pub operations: Vec<OperationClass>,
    /// Verdict when the rule matches.
    pub permission: Permission,
    /// Optional justification, echoed into denials and audit records.
    pub reason: Option<String>,
}

/// Ordered rule list with an implicit default of allow.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

/// Outcome of evaluating a rule set for one classified call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Allow or deny.
    pub permission: Permission,
    /// Reason carried by the matching rule, if any.
    pub reason: Option<String>,
    /// Index of the matching rule; `None` for the implicit default.
    pub rule_index: Option<usize>,
}

impl RuleSet {
    /// An empty rule set: every call is allowed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and validate a rules document from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a rules document from a JSON string.
    ///
    /// Unknown fields (including the conventional `_comment` and
    /// `_location` annotations) are ignored.
    pub fn from_json_str(contents: &str) -> Result<Self, RulesError> {
        let document: Value = serde_json::from_str(contents)?;
        let raw_rules = document
            .get("rules")
            .and_then(Value::as_array)
            .ok_or(RulesError::MissingRules)?;

        let mut rules = Vec::with_capacity(raw_rules.len());
        for (index, raw) in raw_rules.iter().enumerate() {
            rules.push(parse_rule(index, raw)?);
        }
        Ok(Self { rules })
    }

    /// Number of rules in the set.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set carries no rules at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate the rule set for one classified call.
    ///
    /// Rules are scanned in document order; the first whose service equals
    /// `service` and whose operations contain `operation` wins. No match
    /// yields `{permission: Allow, rule_index: None}`. Pure and infallible.
    pub fn decide(&self, service: &str, operation: OperationClass) -> Decision {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.service == service && rule.operations.contains(&operation) {
                return Decision {
                    permission: rule.permission,
                    reason: rule.reason.clone(),
                    rule_index: Some(index),
                };
            }
        }
        Decision {
            permission: Permission::Allow,
            reason: None,
            rule_index: None,
        }
    }
}

/// Validate one raw rule object, reporting the offending field on failure.
fn parse_rule(index: usize, raw: &Value) -> Result<Rule, RulesError> {
    let service = raw
        .get("service")
        .and_then(Value::as_str)
        .ok_or(RulesError::InvalidRule {
            index,
            field: "service",
        })?;

    let raw_operations =
        raw.get("operations")
            .and_then(Value::as_array)
            .ok_or(RulesError::InvalidRule {
                index,
                field: "operations",
            })?;
    let mut operations = Vec::with_capacity(raw_operations.len());
    for op in raw_operations {
        let parsed = op
            .as_str()
            .and_then(|s| s.parse::<OperationClass>().ok())
            .ok_or(RulesError::InvalidRule {
                index,
                field: "operations",
            })?;
        operations.push(parsed);
    }

    let permission = match raw.get("permission").and_then(Value::as_str) {
        Some("allow") => Permission::Allow,
        Some("deny") => Permission::Deny,
        _ => {
            return Err(RulesError::InvalidRule {
                index,
                field: "permission",
            })
        }
    };

    let reason = raw
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(Rule {
        service: service.to_owned(),
        operations,
        permission,
        reason,
    })
}
