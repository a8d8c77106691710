//! `kestrel server`: newline-delimited JSON requests until stdin closes.
//!
//! One session per document. Requests without a document fall back to a
//! single anonymous session, so simple clients can stay stateless.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use kestrel_lib::dispatch::Session;
use kestrel_lib::protocol::{Command, Request, Response};

const ANONYMOUS: &str = "<anonymous>";

pub fn run() -> i32 {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut sessions: HashMap<String, Session> = HashMap::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("kestrel: transport error: {err}");
                return 1;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&mut sessions, &line);
        let encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(err) => {
                eprintln!("kestrel: cannot encode response: {err}");
                return 1;
            }
        };
        if writeln!(out, "{encoded}").and_then(|()| out.flush()).is_err() {
            return 1;
        }
    }
    0
}

fn handle_line(sessions: &mut HashMap<String, Session>, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => return Response::failure(format!("malformed request: {err}")),
    };
    let key = request
        .document
        .as_ref()
        .map_or(ANONYMOUS, |d| d.path.as_str())
        .to_string();
    tracing::debug!(command = ?request.command, document = %key, "request");

    if request.command == Command::Drop {
        return match sessions.remove(&key) {
            Some(_) => Response::ok(serde_json::Value::Bool(true)),
            None => Response::failure(format!("no open document {key}")),
        };
    }

    match sessions.entry(key.clone()) {
        std::collections::hash_map::Entry::Occupied(mut entry) => entry.get_mut().handle(&request),
        std::collections::hash_map::Entry::Vacant(entry) => {
            // First contact must carry the buffer contents.
            let Some(source) = request.source.clone() else {
                return Response::failure(format!("document {key} is not open; tell it first"));
            };
            let path = request.document.as_ref().map(|d| d.path.as_str());
            match Session::open(&source, path) {
                Ok(mut session) => {
                    let response = session.handle(&request);
                    entry.insert(session);
                    response
                }
                Err(err) => Response::error(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(json: serde_json::Value) -> String {
        serde_json::to_string(&json).unwrap()
    }

    #[test]
    fn sessions_persist_across_requests() {
        let mut sessions = HashMap::new();
        let open = line(serde_json::json!({
            "command": "tell",
            "document": { "path": "a.k" },
            "source": "let u = ()",
        }));
        let response = handle_line(&mut sessions, &open);
        assert_eq!(serde_json::to_value(&response).unwrap()["class"], "return");
        assert_eq!(sessions.len(), 1);

        let query = line(serde_json::json!({
            "command": "type-at-position",
            "document": { "path": "a.k" },
            "position": { "line": 1, "col": 8 },
        }));
        let response = handle_line(&mut sessions, &query);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["value"]["type"], "unit");
    }

    #[test]
    fn documents_are_isolated() {
        let mut sessions = HashMap::new();
        for (path, source) in [("a.k", "let x = 1"), ("b.k", "let x = \"s\"")] {
            let open = line(serde_json::json!({
                "command": "tell",
                "document": { "path": path },
                "source": source,
            }));
            handle_line(&mut sessions, &open);
        }
        let query = |path: &str| {
            line(serde_json::json!({
                "command": "type-at-position",
                "document": { "path": path },
                "position": { "line": 1, "col": 4 },
            }))
        };
        let a = handle_line(&mut sessions, &query("a.k"));
        let b = handle_line(&mut sessions, &query("b.k"));
        assert_eq!(serde_json::to_value(&a).unwrap()["value"]["type"], "int");
        assert_eq!(
            serde_json::to_value(&b).unwrap()["value"]["type"],
            "string"
        );
    }

    #[test]
    fn drop_closes_a_document() {
        let mut sessions = HashMap::new();
        let open = line(serde_json::json!({
            "command": "tell",
            "document": { "path": "a.k" },
            "source": "let u = ()",
        }));
        handle_line(&mut sessions, &open);

        let drop = line(serde_json::json!({
            "command": "drop",
            "document": { "path": "a.k" },
        }));
        handle_line(&mut sessions, &drop);
        assert!(sessions.is_empty());

        let again = handle_line(&mut sessions, &drop);
        assert_eq!(serde_json::to_value(&again).unwrap()["class"], "failure");
    }

    #[test]
    fn querying_an_unopened_document_fails() {
        let mut sessions = HashMap::new();
        let query = line(serde_json::json!({
            "command": "outline",
            "document": { "path": "ghost.k" },
        }));
        let response = handle_line(&mut sessions, &query);
        assert_eq!(serde_json::to_value(&response).unwrap()["class"], "failure");
        assert!(sessions.is_empty());
    }

    #[test]
    fn malformed_requests_do_not_kill_the_loop() {
        let mut sessions = HashMap::new();
        let response = handle_line(&mut sessions, "{not json");
        assert_eq!(serde_json::to_value(&response).unwrap()["class"], "failure");
    }
}
