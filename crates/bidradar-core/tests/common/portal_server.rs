//! Minimal scripted HTTP/1.1 server standing in for the open-data portal.
//!
//! Connections are served one at a time, in order. The n-th request gets the
//! n-th scripted reply; once the script runs out the last reply repeats.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with a status line and body.
    Respond { status: u16, body: String },
    /// Hold the connection open without answering (drives client timeouts).
    Stall(Duration),
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Respond {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Respond {
            status,
            body: String::new(),
        }
    }
}

pub struct PortalServer {
    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:40000/svc`.
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl PortalServer {
    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Portal envelope around a list of items.
pub fn items_page(items: &[serde_json::Value]) -> String {
    serde_json::json!({
        "response": {
            "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
            "body": {
                "items": items,
                "numOfRows": 100,
                "pageNo": 1,
                "totalCount": items.len()
            }
        }
    })
    .to_string()
}

/// Portal envelope with `"items": ""`, what the portal sends past the last page.
pub fn empty_page() -> String {
    r#"{"response":{"header":{"resultCode":"00"},"body":{"items":"","totalCount":0}}}"#.to_string()
}

pub fn start(script: Vec<Reply>) -> PortalServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for (i, stream) in listener.incoming().flatten().enumerate() {
            let reply = script
                .get(i)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or_else(|| Reply::status(500));
            handle(stream, reply, &seen);
        }
    });
    PortalServer {
        base_url: format!("http://127.0.0.1:{}/svc", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, reply: Reply, seen: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    seen.lock().unwrap().push(target);

    match reply {
        Reply::Stall(d) => thread::sleep(d),
        Reply::Respond { status, body } => {
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json;charset=UTF-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(body.as_bytes());
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
