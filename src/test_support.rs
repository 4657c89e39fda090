//! Minimal HTTP/1.1 responder for exercising the real HTTP clients in tests.
//!
//! Each accepted connection consumes the next canned response; once the
//! queue is empty every request gets a 500. Requests are captured in order.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl StubResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct StubServer {
    pub base_url: String,
    requests: Receiver<CapturedRequest>,
}

impl StubServer {
    pub fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let response = queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| StubResponse::new(500, "no canned response"));
                handle(stream, response, &tx);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            requests: rx,
        }
    }

    /// Next captured request, waiting briefly for the handler thread
    pub fn next_request(&self) -> Option<CapturedRequest> {
        self.requests.recv_timeout(Duration::from_secs(2)).ok()
    }
}

fn handle(mut stream: TcpStream, response: StubResponse, tx: &Sender<CapturedRequest>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));

    let mut raw = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = raw[header_end..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }

    let _ = tx.send(CapturedRequest { method, path, headers, body });

    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
}
