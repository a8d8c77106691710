//! Wire types for the editor protocol.
//!
//! Requests name a command plus a JSON record of parameters; responses are
//! `{class, value, notifications}`. Lines are 1-indexed, columns 0-indexed,
//! on both sides of the wire.

use serde::{Deserialize, Serialize};
use text_size::TextRange;

use kestrel_core::LineIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePos {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireRange {
    pub start: WirePos,
    pub end: WirePos,
}

/// Converts an internal range through the buffer's line index.
pub fn wire_range(index: &LineIndex, range: TextRange) -> WireRange {
    let (start, end) = index.range_bounds(range);
    WireRange {
        start: WirePos {
            line: start.line,
            col: start.col,
        },
        end: WirePos {
            line: end.line,
            col: end.col,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Replace the buffer contents.
    Tell,
    Outline,
    TypeAtPosition,
    CompletePrefix,
    RefactorOpen,
    Errors,
    /// Close a buffer (server mode).
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireOpenAction {
    Qualify,
    Unqualify,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub position: Option<WirePos>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub action: Option<WireOpenAction>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseClass {
    /// The command ran; `value` is its answer.
    Return,
    /// The command could not be applied (bad position, missing parameter).
    Failure,
    /// The buffer rejected the request (configuration, analysis setup).
    Error,
    /// Something internal escaped; the request died.
    Exception,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub class: ResponseClass,
    pub value: serde_json::Value,
    pub notifications: Vec<String>,
}

impl Response {
    pub fn ok(value: serde_json::Value) -> Response {
        Response {
            class: ResponseClass::Return,
            value,
            notifications: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Response {
        Response {
            class: ResponseClass::Failure,
            value: serde_json::Value::String(message.into()),
            notifications: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Response {
        Response {
            class: ResponseClass::Error,
            value: serde_json::Value::String(message.into()),
            notifications: Vec::new(),
        }
    }

    pub fn exception(message: impl Into<String>) -> Response {
        Response {
            class: ResponseClass::Exception,
            value: serde_json::Value::String(message.into()),
            notifications: Vec::new(),
        }
    }

    pub fn with_notifications(mut self, notifications: Vec<String>) -> Response {
        self.notifications = notifications;
        self
    }
}

/// Outline entry as the editor sees it.
#[derive(Debug, Clone, Serialize)]
pub struct WireOutlineItem {
    pub name: String,
    pub kind: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    pub start: WirePos,
    pub end: WirePos,
    pub children: Vec<WireOutlineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireEdit {
    pub start: WirePos,
    pub end: WirePos,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireCompletion {
    pub name: String,
    pub kind: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireDiagnostic {
    pub severity: String,
    pub message: String,
    pub start: WirePos,
    pub end: WirePos,
}
