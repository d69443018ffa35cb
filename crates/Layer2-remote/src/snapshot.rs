//! Point-in-time view of a remote task
//!
//! The remote service exposes task objects with loosely-typed, optional
//! fields whose presence and shape vary by task and by poll. `TaskSnapshot`
//! models that honestly: everything is optional, `result`/`summary` may be
//! a plain string or a structured map, and unrecognized fields are kept in
//! `extra` rather than dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One refresh of a remote task, as reported by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Remote task identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Free-form status string, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Result payload - plain string or structured map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Summary payload - plain string or structured map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,

    /// Raw output text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Error message, when the task failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Alternate failure field some task implementations use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Link to the task in the service's web UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,

    /// Human-readable description of the current step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    /// Conversation-style message list, when the task carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Value>,

    /// Fields this version does not model
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl TaskSnapshot {
    /// Lowercased, trimmed status, `"unknown"` when absent or empty
    pub fn status_normalized(&self) -> String {
        match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_lowercase(),
            _ => "unknown".to_string(),
        }
    }

    /// Whether the status field carries anything at all
    pub fn has_status(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    /// Whether any result-bearing field (`result`, `output`, `web_url`)
    /// is present and non-empty
    pub fn is_result_bearing(&self) -> bool {
        self.result.as_ref().map(value_non_empty).unwrap_or(false)
            || self
                .output
                .as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
            || self
                .web_url
                .as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Whether a loosely-typed value carries usable content
pub fn value_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}
