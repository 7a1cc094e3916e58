//! Newline-delimited JSON-RPC framing.
//!
//! The interceptor treats both stdio directions as line streams. Each line
//! is inspected just enough to recognize `tools/call` requests; everything
//! else stays opaque and passes through verbatim, which preserves servers
//! that print banners or emit notifications between responses.

use serde_json::{json, Value};

use crate::classifier::OperationClass;

/// JSON-RPC application error code used for governance denials.
pub const DENIAL_CODE: i64 = -32000;

/// Message carried by every governance denial.
pub const DENIAL_MESSAGE: &str = "Permission denied by governance rules";

/// A recognized `tools/call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallFrame {
    /// Request id, echoed into any synthesized response; `None` when the
    /// request carried no id.
    pub id: Option<Value>,
    /// Tool name from `params.name`; may be empty.
    pub name: String,
}

/// Strip one trailing `\n` or `\r\n` from a buffered line.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Recognize a `tools/call` request in a single line.
///
/// Returns `Some` only for a JSON object whose `method` is `"tools/call"`
/// and whose `params.name` is a string. Non-JSON lines, non-objects, other
/// methods, and requests with an absent or non-string name are not
/// governance material; the caller forwards them unchanged.
pub fn parse_tool_call(line: &str) -> Option<ToolCallFrame> {
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;
    if object.get("method").and_then(Value::as_str) != Some("tools/call") {
        return None;
    }
    let name = object.get("params")?.get("name")?.as_str()?.to_owned();
    Some(ToolCallFrame {
        id: object.get("id").cloned(),
        name,
    })
}

/// Synthesize a JSON-RPC error response for a blocked `tools/call`.
///
/// The response echoes the original request id (JSON `null` when the
/// request had none) and carries structured context in `error.data`;
/// `reason` is included only when the matching rule supplied one.
pub fn denial_response(
    id: Option<&Value>,
    service: &str,
    operation: OperationClass,
    reason: Option<&str>,
) -> String {
    let mut data = json!({
        "service": service,
        "operation": operation.as_str(),
    });
    if let (Some(map), Some(reason)) = (data.as_object_mut(), reason) {
        map.insert("reason".to_owned(), Value::String(reason.to_owned()));
    }
    json!({
        "jsonrpc": "2.0",
        "id": id.cloned().unwrap_or(Value::Null),
        "error": {
            "code": DENIAL_CODE,
            "message": DENIAL_MESSAGE,
            "data": data,
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Line endings ──

    #[test]
    fn test_trim_lf() {
        assert_eq!(trim_line_ending("{\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn test_trim_crlf() {
        assert_eq!(trim_line_ending("{\"a\":1}\r\n"), "{\"a\":1}");
    }

    #[test]
    fn test_trim_no_ending() {
        assert_eq!(trim_line_ending("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_trim_preserves_interior_cr() {
        assert_eq!(trim_line_ending("a\rb\n"), "a\rb");
    }

    // ── tools/call recognition ──

    #[test]
    fn test_parse_tool_call_full() {
        let frame = parse_tool_call(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"github_delete_repo","arguments":{"repo_name":"x"}}}"#,
        )
        .expect("should recognize");
        assert_eq!(frame.name, "github_delete_repo");
        assert_eq!(frame.id, Some(json!(7)));
    }

    #[test]
    fn test_parse_tool_call_string_id() {
        let frame = parse_tool_call(
            r#"{"jsonrpc":"2.0","id":"req-1","method":"tools/call","params":{"name":"a_get"}}"#,
        )
        .expect("should recognize");
        assert_eq!(frame.id, Some(json!("req-1")));
    }

    #[test]
    fn test_parse_tool_call_without_id() {
        let frame =
            parse_tool_call(r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"a_get"}}"#)
                .expect("should recognize");
        assert_eq!(frame.id, None);
    }

    #[test]
    fn test_parse_empty_name_is_recognized() {
        // An empty name is still a tools/call; the classifier rejects it
        // downstream and the line is forwarded.
        let frame =
            parse_tool_call(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":""}}"#)
                .expect("should recognize");
        assert_eq!(frame.name, "");
    }

    #[test]
    fn test_non_json_passes() {
        assert!(parse_tool_call("server starting on stdio...").is_none());
    }

    #[test]
    fn test_non_object_passes() {
        assert!(parse_tool_call("[1,2,3]").is_none());
        assert!(parse_tool_call("42").is_none());
    }

    #[test]
    fn test_other_methods_pass() {
        assert!(
            parse_tool_call(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
                .is_none()
        );
        assert!(
            parse_tool_call(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none()
        );
    }

    #[test]
    fn test_non_string_name_passes() {
        assert!(parse_tool_call(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":42}}"#
        )
        .is_none());
        assert!(parse_tool_call(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{}}"#
        )
        .is_none());
    }

    #[test]
    fn test_response_lines_pass() {
        assert!(parse_tool_call(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).is_none());
    }

    // ── Denial synthesis ──

    #[test]
    fn test_denial_response_shape() {
        let line = denial_response(
            Some(&json!(7)),
            "github",
            OperationClass::Delete,
            Some("Safety"),
        );
        let value: Value = serde_json::from_str(&line).expect("valid JSON");
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], -32000);
        assert_eq!(value["error"]["message"], DENIAL_MESSAGE);
        assert_eq!(value["error"]["data"]["service"], "github");
        assert_eq!(value["error"]["data"]["operation"], "delete");
        assert_eq!(value["error"]["data"]["reason"], "Safety");
    }

    #[test]
    fn test_denial_response_without_reason() {
        let line = denial_response(Some(&json!(3)), "db", OperationClass::Admin, None);
        let value: Value = serde_json::from_str(&line).expect("valid JSON");
        assert!(value["error"]["data"].get("reason").is_none());
    }

    #[test]
    fn test_denial_response_null_id_when_absent() {
        let line = denial_response(None, "db", OperationClass::Read, None);
        let value: Value = serde_json::from_str(&line).expect("valid JSON");
        assert!(value["id"].is_null());
    }

    #[test]
    fn test_denial_response_is_single_line() {
        let line = denial_response(Some(&json!(1)), "a", OperationClass::Write, Some("why"));
        assert!(!line.contains('\n'));
    }
}
