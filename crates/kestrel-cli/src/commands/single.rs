//! `kestrel single`: one stateless request on stdin, one response on
//! stdout.
//!
//! Exit code 0 covers everything the protocol can express — analysis
//! failures travel inside the response. Non-zero is reserved for transport
//! problems: unreadable stdin, unparseable request, unwritable stdout.

use std::io::Read;
use std::path::Path;

use kestrel_lib::dispatch::Session;
use kestrel_lib::protocol::{Request, Response};

pub fn run(path: Option<&Path>) -> i32 {
    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("kestrel: cannot read request: {err}");
        return 1;
    }

    let request: Request = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("kestrel: malformed request: {err}");
            return 1;
        }
    };

    let Some(source) = request.source.clone() else {
        return respond(&Response::failure("single requires inline source"));
    };

    let path = path.map(|p| p.display().to_string());
    let response = match Session::open(&source, path.as_deref()) {
        Ok(mut session) => session.handle(&request),
        Err(err) => Response::error(err.to_string()),
    };
    respond(&response)
}

fn respond(response: &Response) -> i32 {
    match serde_json::to_string(response) {
        Ok(line) => {
            println!("{line}");
            0
        }
        Err(err) => {
            eprintln!("kestrel: cannot encode response: {err}");
            1
        }
    }
}
