//! Error payload formatting.
//!
//! Turns an [`Error`] into the JSON value stored under the response's
//! reserved `error` field: always `{message, type}`, plus a `debug` block
//! (source location, internal code, processed trace, request snapshot) in
//! development only. Production payloads never carry the debug block; that
//! is the information-disclosure boundary, not an omission.

use super::Error;
use crate::config::Environment;
use crate::request::Request;
use serde::Serialize;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;

/// Frames kept in a processed trace; deeper frames are dropped so the
/// payload stays bounded no matter how the failure was raised.
const MAX_TRACE_FRAMES: usize = 32;

#[derive(Serialize)]
struct ErrorPayload {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<DebugPayload>,
}

#[derive(Serialize)]
struct DebugPayload {
    file: String,
    line: u32,
    code: u16,
    trace: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<RequestPayload>,
}

#[derive(Serialize)]
struct RequestPayload {
    method: String,
    path: String,
    params: HashMap<String, Value>,
}

/// Format a caught failure as the structured `error` payload.
///
/// The `request`, when supplied, only contributes the development snapshot;
/// nothing of it leaks into production payloads.
pub fn error_payload(err: &Error, env: Environment, request: Option<&Request>) -> Value {
    let debug = env.is_development().then(|| DebugPayload {
        file: err.location().file().to_string(),
        line: err.location().line(),
        code: err.code(),
        trace: render_trace(err.backtrace()),
        request: request.map(|req| RequestPayload {
            method: req.method().to_string(),
            path: req.path().to_string(),
            params: req.params().clone(),
        }),
    });

    let payload = ErrorPayload {
        message: err.to_string(),
        kind: err.kind_tag(),
        debug,
    };

    serde_json::to_value(payload).unwrap_or_else(|_| {
        // All-string keys make serialization infallible in practice; if it
        // ever regresses, fall back to the bare message/type pair.
        serde_json::json!({ "message": err.to_string(), "type": err.kind_tag() })
    })
}

/// Reduce a captured backtrace to bounded symbol lines.
///
/// Keeps `symbol at file:line:col` entries and drops raw addresses and the
/// per-frame indent noise of the `Display` rendering. An uncaptured trace
/// (RUST_BACKTRACE unset) renders as an empty list.
fn render_trace(backtrace: &Backtrace) -> Vec<String> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }

    let rendered = backtrace.to_string();
    let mut frames: Vec<String> = Vec::new();
    for line in rendered.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" at ");
                last.push_str(rest);
            }
            continue;
        }
        if frames.len() >= MAX_TRACE_FRAMES {
            break;
        }
        // Frame lines look like `12: path::to::symbol`.
        if let Some((index, symbol)) = trimmed.split_once(": ") {
            if index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(symbol.to_string());
            }
        }
    }
    frames
}
