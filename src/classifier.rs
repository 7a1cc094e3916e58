//! Tool-name classification: service extraction and operation class lookup.
//!
//! Every MCP tool name maps to exactly one `(service, operation)` pair. The
//! service is the prefix before the first `_` or `-`; the name's tokens
//! (prefix included) are matched whole-token against per-class keyword
//! dictionaries, and the highest-priority class seen across the tokens wins.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error types ──

/// Errors from tool-name classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The tool name is empty after normalization.
    #[error("malformed tool name: empty")]
    MalformedToolName,
}

/// Error returned when parsing an operation class from a string.
#[derive(Debug, Error)]
#[error("unknown operation class '{0}'")]
pub struct UnknownOperationClass(pub String);

// ── Operation classes ──

/// Coarse operation category the rule engine reasons about.
///
/// Variant order is priority order: when a tool name carries keywords from
/// several classes, the highest variant wins (`Admin` outranks `Delete`
/// outranks `Execute` outranks `Write` outranks `Read`), so aggregation
/// across tokens is a plain `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OperationClass {
    /// Pure data retrieval with no side effects.
    Read,
    /// State creation or mutation.
    Write,
    /// Side-effecting actions: sending, running, dispatching.
    Execute,
    /// Destructive or lifecycle-ending actions.
    Delete,
    /// Administrative or permission-changing actions.
    Admin,
}

impl OperationClass {
    /// Lowercase wire name of this class.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationClass {
    type Err = UnknownOperationClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "execute" => Ok(Self::Execute),
            "delete" => Ok(Self::Delete),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownOperationClass(other.to_owned())),
        }
    }
}

// ── Keyword dictionaries ──

/// Keywords classified as `read` operations.
const READ_KEYWORDS: &[&str] = &[
    "read", "get", "fetch", "retrieve", "list", "show", "view", "display", "query", "search",
    "find", "lookup", "select", "scan", "index", "count", "check", "validate", "verify", "inspect",
    "examine", "test", "peek", "preview", "download", "dump", "export", "extract", "pull", "clone",
    "status", "info", "describe", "details", "summary", "stat",
];

/// Keywords classified as `write` operations.
const WRITE_KEYWORDS: &[&str] = &[
    "create", "add", "new", "insert", "post", "put", "make", "build", "generate", "initialize",
    "setup", "register", "update", "modify", "edit", "change", "set", "patch", "alter", "amend",
    "revise", "replace", "append", "push", "attach", "extend", "increment", "configure", "adjust",
    "tune", "customize",
];

/// Keywords classified as `execute` operations.
const EXECUTE_KEYWORDS: &[&str] = &[
    "send", "email", "mail", "notify", "message", "post", "publish", "broadcast", "transmit",
    "execute", "run", "invoke", "call", "trigger", "fire", "launch", "start", "begin", "process",
    "compile", "build", "deploy", "render", "convert", "transform", "schedule", "queue", "enqueue",
    "dispatch", "submit",
];

/// Keywords classified as `delete` operations.
const DELETE_KEYWORDS: &[&str] = &[
    "delete", "remove", "destroy", "drop", "purge", "clear", "erase", "archive", "trash",
    "discard", "abandon", "cancel", "abort", "terminate", "kill", "stop", "halt", "reset", "wipe",
    "flush", "clean", "prune",
];

/// Keywords classified as `admin` operations.
const ADMIN_KEYWORDS: &[&str] = &[
    "admin", "administer", "administrate", "manage", "grant", "revoke", "assign", "unassign",
    "invite", "approve", "reject", "block", "unblock", "ban", "unban", "promote", "demote",
    "permission", "authorize", "authenticate", "allow", "deny", "enable", "disable", "restart",
    "reboot", "upgrade", "downgrade", "scale", "provision", "install", "uninstall", "migrate",
];

/// Reverse map `token → class`, built once.
///
/// Lists are inserted in ascending priority so a token present in several
/// dictionaries (e.g. `post`, `build`) resolves to its highest-priority
/// class.
fn keyword_classes() -> &'static HashMap<&'static str, OperationClass> {
    static MAP: OnceLock<HashMap<&'static str, OperationClass>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for (tokens, class) in [
            (READ_KEYWORDS, OperationClass::Read),
            (WRITE_KEYWORDS, OperationClass::Write),
            (EXECUTE_KEYWORDS, OperationClass::Execute),
            (DELETE_KEYWORDS, OperationClass::Delete),
            (ADMIN_KEYWORDS, OperationClass::Admin),
        ] {
            for token in tokens {
                map.insert(*token, class);
            }
        }
        map
    })
}

// ── Classification ──

/// A classified tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Service prefix (the token before the first `_` or `-`).
    pub service: String,
    /// Operation class resolved from the remaining tokens.
    pub operation: OperationClass,
}

/// Classify a tool name into its service and operation class.
///
/// The name is lowercased and split at the first `_` or `-`; the prefix is
/// the service. When a separator is present, every token including the
/// prefix is looked up whole-token in the keyword table and the
/// highest-priority hit wins: `admin_delete_user` carries both an admin and
/// a delete keyword and classifies as admin. A name without a separator is
/// all service and carries no operation tokens. Either way, no keyword hit
/// defaults to [`OperationClass::Write`], the more restrictive of the two
/// non-dangerous classes.
pub fn classify(tool: &str) -> Result<Classification, ClassifyError> {
    let normalized = tool.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ClassifyError::MalformedToolName);
    }

    let (service, operation) = match normalized.split_once(['_', '-']) {
        Some((service, _)) => {
            let table = keyword_classes();
            let operation = normalized
                .split(['_', '-'])
                .filter(|token| !token.is_empty())
                .filter_map(|token| table.get(token).copied())
                .max()
                .unwrap_or(OperationClass::Write);
            (service, operation)
        }
        None => (normalized.as_str(), OperationClass::Write),
    };

    Ok(Classification {
        service: service.to_owned(),
        operation,
    })
}
