//! Result extraction
//!
//! A completed task must always hand the client a non-empty, human-readable
//! string, however malformed or partially populated the remote snapshot is.
//! Extraction walks an ordered fallback chain and bottoms out on a fixed
//! message; it never fails.

use relay_remote::{value_non_empty, TaskSnapshot};
use serde_json::Value;

/// Keys probed, in order, when a result-like field is a structured map
pub const RESULT_KEYS: &[&str] = &["content", "response", "message", "text", "answer"];

/// Final fallback for a completed task with no recoverable result
pub const DEFAULT_COMPLETED_MESSAGE: &str = "Task completed successfully.";

/// Final fallback for a failed task with no recoverable message
pub const DEFAULT_FAILURE_MESSAGE: &str = "Task failed with unknown error";

/// Longest step description forwarded to clients
const STEP_LIMIT: usize = 240;

/// Best-effort human-readable result for a completed task
///
/// Fallback chain, first non-empty wins:
/// 1. `result` as a plain string
/// 2. `result` as a map, probed with [`RESULT_KEYS`]
/// 3. the same probe on `summary`, then `output`
/// 4. the newest assistant-authored entry in `messages`
/// 5. a pointer at `web_url`
/// 6. [`DEFAULT_COMPLETED_MESSAGE`]
pub fn extract(snapshot: &TaskSnapshot) -> String {
    if let Some(text) = snapshot.result.as_ref().and_then(probe_text) {
        return text;
    }

    if let Some(text) = snapshot.summary.as_ref().and_then(probe_text) {
        return text;
    }

    if let Some(text) = non_empty(snapshot.output.as_deref()) {
        return text;
    }

    if let Some(text) = last_assistant_message(snapshot.messages.as_ref()) {
        return text;
    }

    if let Some(url) = non_empty(snapshot.web_url.as_deref()) {
        return format!("Task completed successfully. View details at: {}", url);
    }

    DEFAULT_COMPLETED_MESSAGE.to_string()
}

/// Best-effort failure message, same chain with `error`/`failure_reason`
/// substituted for `result`
pub fn extract_failure(snapshot: &TaskSnapshot) -> String {
    if let Some(text) = non_empty(snapshot.error.as_deref()) {
        return text;
    }

    if let Some(text) = non_empty(snapshot.failure_reason.as_deref()) {
        return text;
    }

    if let Some(text) = snapshot.summary.as_ref().and_then(probe_text) {
        return text;
    }

    if let Some(text) = non_empty(snapshot.output.as_deref()) {
        return text;
    }

    DEFAULT_FAILURE_MESSAGE.to_string()
}

/// Distinguishable "current step" value, when the snapshot carries one
///
/// Prefers the explicit `current_step` field, then the newest assistant
/// message. Always optional; step events are best-effort progress.
pub fn extract_step(snapshot: &TaskSnapshot) -> Option<String> {
    if let Some(step) = non_empty(snapshot.current_step.as_deref()) {
        return Some(truncate(step));
    }

    last_assistant_message(snapshot.messages.as_ref()).map(truncate)
}

/// Non-empty string content of a loosely-typed value
///
/// A plain string wins as-is; a map is probed with [`RESULT_KEYS`]. Other
/// non-empty shapes are serialized rather than dropped so that an odd but
/// populated payload still reaches the client.
fn probe_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Object(map) => {
            for key in RESULT_KEYS {
                if let Some(inner) = map.get(*key) {
                    if let Some(text) = probe_text(inner) {
                        return Some(text);
                    }
                }
            }
            None
        }
        other if value_non_empty(other) => Some(other.to_string()),
        _ => None,
    }
}

/// Scan a message list in reverse for the first assistant-authored entry
fn last_assistant_message(messages: Option<&Value>) -> Option<String> {
    let items = messages?.as_array()?;

    for entry in items.iter().rev() {
        let role = entry.get("role").and_then(Value::as_str).unwrap_or("");
        if !role.eq_ignore_ascii_case("assistant") {
            continue;
        }

        if let Some(text) = entry.get("content").and_then(message_content) {
            return Some(text);
        }
    }

    None
}

/// Flatten message content - a plain string, or a block list with `text`
/// entries
fn message_content(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(map) => map.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .filter(|s| !s.trim().is_empty())
                .collect();

            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        _ => None,
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn truncate(text: String) -> String {
    if text.chars().count() <= STEP_LIMIT {
        return text;
    }
    text.chars().take(STEP_LIMIT).collect()
}
