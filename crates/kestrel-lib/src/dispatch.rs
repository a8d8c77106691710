//! Command dispatch: one request in, one response out.
//!
//! The outermost of the three error layers lives here. Analysis errors are
//! data inside `return` responses; missing or unusable parameters are
//! `failure`; a rejected configuration is `error`; anything internal that
//! escapes becomes `exception`. A request never takes the session down.

use text_size::TextSize;

use crate::Error;
use crate::buffer::Buffer;
use crate::cache::FileCache;
use crate::config::{self, Config, Discovered};
use crate::protocol::{
    Command, Request, Response, WireCompletion, WireDiagnostic, WireEdit, WireOpenAction,
    WireOutlineItem, wire_range,
};
use crate::query::complete::complete;
use crate::query::errors::diagnostics;
use crate::query::outline::{OutlineItem, outline};
use crate::query::refactor_open::{OpenAction, refactor_open};
use crate::query::type_at::type_at;

/// One analyzed document: its buffer, its project configuration, and the
/// notifications to attach to the next response.
pub struct Session {
    buffer: Buffer,
    config: Option<Config>,
    notifications: Vec<String>,
}

impl Session {
    /// Opens a session for a document. A configuration file that exists but
    /// cannot be used rejects the whole buffer.
    pub fn open(source: &str, path: Option<&str>) -> Result<Session, Error> {
        let mut notifications = Vec::new();
        let config = match path {
            Some(path) => {
                match config::discover(
                    std::path::Path::new(path),
                    FileCache::global(),
                    &mut notifications,
                ) {
                    Discovered::Found(config) => Some(config),
                    Discovered::None => None,
                    Discovered::Invalid(err) => return Err(Error::Config(err.to_string())),
                }
            }
            None => None,
        };
        let buffer = Buffer::new(source)?;
        Ok(Session {
            buffer,
            config,
            notifications,
        })
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Runs one request against this session.
    pub fn handle(&mut self, request: &Request) -> Response {
        let notifications = std::mem::take(&mut self.notifications);
        self.dispatch(request).with_notifications(notifications)
    }

    fn dispatch(&mut self, request: &Request) -> Response {
        match request.command {
            Command::Tell => {
                let Some(source) = &request.source else {
                    return Response::failure("tell requires source");
                };
                match self.buffer.update(source.clone()) {
                    Ok(()) => Response::ok(serde_json::Value::Bool(true)),
                    Err(err) => error_response(err),
                }
            }
            Command::Outline => {
                let items: Vec<WireOutlineItem> = outline(&self.buffer)
                    .iter()
                    .map(|item| self.wire_outline(item))
                    .collect();
                match serde_json::to_value(items) {
                    Ok(value) => Response::ok(value),
                    Err(err) => Response::exception(err.to_string()),
                }
            }
            Command::TypeAtPosition => {
                let Some(offset) = self.offset(request) else {
                    return Response::failure("type-at-position requires a valid position");
                };
                match type_at(&self.buffer, offset) {
                    Some(hit) => {
                        let range = wire_range(self.buffer.line_index(), hit.range);
                        Response::ok(serde_json::json!({
                            "type": hit.ty,
                            "start": range.start,
                            "end": range.end,
                        }))
                    }
                    None => Response::failure("no expression at this position"),
                }
            }
            Command::CompletePrefix => {
                let Some(offset) = self.offset(request) else {
                    return Response::failure("complete-prefix requires a valid position");
                };
                let prefix = request.prefix.as_deref().unwrap_or("");
                let entries: Vec<WireCompletion> = complete(&self.buffer, offset, prefix)
                    .into_iter()
                    .map(|entry| WireCompletion {
                        name: entry.name,
                        kind: entry.kind.as_str().to_string(),
                        ty: entry.ty,
                    })
                    .collect();
                Response::ok(serde_json::json!({ "entries": entries }))
            }
            Command::RefactorOpen => {
                let Some(offset) = self.offset(request) else {
                    return Response::failure("refactor-open requires a valid position");
                };
                let action = match request.action {
                    Some(WireOpenAction::Qualify) => OpenAction::Qualify,
                    Some(WireOpenAction::Unqualify) => OpenAction::Unqualify,
                    None => return Response::failure("refactor-open requires an action"),
                };
                let edits: Vec<WireEdit> = refactor_open(&self.buffer, offset, action)
                    .into_iter()
                    .map(|edit| {
                        let range = wire_range(self.buffer.line_index(), edit.range);
                        WireEdit {
                            start: range.start,
                            end: range.end,
                            content: edit.content,
                        }
                    })
                    .collect();
                match serde_json::to_value(edits) {
                    Ok(value) => Response::ok(value),
                    Err(err) => Response::exception(err.to_string()),
                }
            }
            Command::Errors => {
                let diags: Vec<WireDiagnostic> = diagnostics(&self.buffer)
                    .iter()
                    .map(|d| {
                        let range = wire_range(self.buffer.line_index(), d.range);
                        WireDiagnostic {
                            severity: d.severity.to_string(),
                            message: d.message.clone(),
                            start: range.start,
                            end: range.end,
                        }
                    })
                    .collect();
                match serde_json::to_value(diags) {
                    Ok(value) => Response::ok(value),
                    Err(err) => Response::exception(err.to_string()),
                }
            }
            Command::Drop => Response::failure("drop is handled by the server"),
        }
    }

    fn offset(&self, request: &Request) -> Option<TextSize> {
        let pos = request.position?;
        self.buffer.line_index().offset_at(pos.line, pos.col)
    }

    fn wire_outline(&self, item: &OutlineItem) -> WireOutlineItem {
        let range = wire_range(self.buffer.line_index(), item.range);
        WireOutlineItem {
            name: item.name.clone(),
            kind: item.kind.as_str().to_string(),
            ty: item.ty.clone(),
            start: range.start,
            end: range.end,
            children: item
                .children
                .iter()
                .map(|child| self.wire_outline(child))
                .collect(),
        }
    }
}

fn error_response(err: Error) -> Response {
    match err {
        Error::Config(_) | Error::InitialEnv(_) => Response::error(err.to_string()),
        Error::Internal(_) => Response::exception(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseClass;

    fn request(json: serde_json::Value) -> Request {
        serde_json::from_value(json).unwrap()
    }

    fn session(source: &str) -> Session {
        Session::open(source, None).unwrap()
    }

    #[test]
    fn outline_round_trip() {
        let mut s = session("module M = struct\n  let u = ()\nend\nopen M\nlet u = M.u");
        let response = s.handle(&request(serde_json::json!({ "command": "outline" })));
        assert_eq!(response.class, ResponseClass::Return);

        let value = response.value.as_array().unwrap();
        assert_eq!(value.len(), 2);
        assert_eq!(value[0]["name"], "M");
        assert_eq!(value[0]["kind"], "Module");
        assert_eq!(value[0]["children"][0]["name"], "u");
        assert_eq!(value[1]["name"], "u");
        assert_eq!(value[1]["kind"], "Value");
    }

    #[test]
    fn refactor_open_unqualify_wire_positions() {
        let mut s = session("module M = struct\n  let u = ()\nend\nopen M\nlet u = M.u");
        let response = s.handle(&request(serde_json::json!({
            "command": "refactor-open",
            "action": "unqualify",
            "position": { "line": 5, "col": 6 },
        })));
        assert_eq!(response.class, ResponseClass::Return);
        assert_eq!(
            response.value,
            serde_json::json!([{
                "start": { "line": 5, "col": 8 },
                "end": { "line": 5, "col": 11 },
                "content": "u",
            }])
        );
    }

    #[test]
    fn type_at_position_over_the_wire() {
        let mut s = session("let u = ()");
        let response = s.handle(&request(serde_json::json!({
            "command": "type-at-position",
            "position": { "line": 1, "col": 8 },
        })));
        assert_eq!(response.class, ResponseClass::Return);
        assert_eq!(response.value["type"], "unit");
    }

    #[test]
    fn missing_parameters_fail_without_dying() {
        let mut s = session("let u = ()");
        let response = s.handle(&request(serde_json::json!({ "command": "type-at-position" })));
        assert_eq!(response.class, ResponseClass::Failure);

        // The session is still usable.
        let response = s.handle(&request(serde_json::json!({ "command": "errors" })));
        assert_eq!(response.class, ResponseClass::Return);
    }

    #[test]
    fn tell_updates_the_buffer() {
        let mut s = session("let a = 1");
        let response = s.handle(&request(serde_json::json!({
            "command": "tell",
            "source": "let a = \"now a string\"",
        })));
        assert_eq!(response.class, ResponseClass::Return);

        let response = s.handle(&request(serde_json::json!({
            "command": "type-at-position",
            "position": { "line": 1, "col": 4 },
        })));
        assert_eq!(response.value["type"], "string");
    }

    #[test]
    fn errors_are_data_not_failures() {
        let mut s = session("let bad : string = 2");
        let response = s.handle(&request(serde_json::json!({ "command": "errors" })));
        assert_eq!(response.class, ResponseClass::Return);
        let diags = response.value.as_array().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0]["severity"], "error");
        assert_eq!(diags[0]["start"]["line"], 1);
    }
}
