#![allow(dead_code)]

// Shared fixtures: an in-memory catalog source and a one-shot HTTP server.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use code_search::catalog::{parse_catalog, CatalogSource, ParsedCatalog};
use code_search::{CodeDetail, LoadError};
use serde_json::{json, Value};

/// The two-record catalog used throughout the scenarios.
pub fn scenario_body() -> String {
    json!({
        "result": [
            {"code": "AAA", "name": "Alpha", "market": "1", "is_etf": "1", "is_spac": "N"},
            {"code": "BBB", "name": "Beta", "market": "2", "is_etf": "0", "is_spac": "Y"},
        ]
    })
    .to_string()
}

pub fn catalog_body(records: &[Value]) -> String {
    json!({ "result": records }).to_string()
}

/// Source that serves catalogs from a queue and details from a map. The
/// first call can be held back behind a gate to force out-of-order replies.
pub struct FakeSource {
    catalogs: Mutex<Vec<Result<String, LoadError>>>,
    details: HashMap<String, CodeDetail>,
    gate: Option<Mutex<Receiver<()>>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(catalogs: Vec<Result<String, LoadError>>) -> Self {
        let mut catalogs = catalogs;
        catalogs.reverse();
        Self {
            catalogs: Mutex::new(catalogs),
            details: HashMap::new(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_detail(mut self, detail: CodeDetail) -> Self {
        self.details.insert(detail.code.clone(), detail);
        self
    }

    /// Hold the first catalog call until something is sent on `gate`.
    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(Mutex::new(gate));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CatalogSource for FakeSource {
    fn fetch_catalog(&self) -> Result<ParsedCatalog, LoadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .catalogs
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(catalog_body(&[])));
        if call == 0 {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(5));
            }
        }
        parse_catalog(&next?)
    }

    fn fetch_detail(&self, code: &str) -> Result<CodeDetail, LoadError> {
        self.details
            .get(code)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                code: code.to_string(),
            })
    }
}

pub fn detail(code: &str, name: &str) -> CodeDetail {
    CodeDetail {
        code: code.to_string(),
        extend_code: Some(format!("KR{code}")),
        name: Some(name.to_string()),
        memedan: Some(1),
        market: Some("1".to_string()),
        is_etf: Some("1".to_string()),
        is_spac: Some("N".to_string()),
    }
}

pub fn transport_failure() -> LoadError {
    LoadError::Transport {
        url: "http://127.0.0.1:1/codes".to_string(),
        message: "connection refused".to_string(),
    }
}

/// Poll `done` until it holds or five seconds pass.
pub fn wait_until<F: FnMut() -> bool>(mut done: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

/// Minimal HTTP server answering one canned response per connection, in
/// order. The join handle yields the request lines it saw.
pub struct TestServer {
    pub base: String,
    handle: JoinHandle<Vec<String>>,
}

impl TestServer {
    pub fn serve(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                seen.push(request_line.trim_end().to_string());
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap_or(0) == 0 || header == "\r\n" {
                        break;
                    }
                }

                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    _ => "Error",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            seen
        });

        Self { base, handle }
    }

    /// Wait for the server thread and return the request lines it handled.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().expect("test server panicked")
    }
}

/// An address nothing listens on.
pub fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/codes")
}

pub fn shared(source: FakeSource) -> Arc<FakeSource> {
    Arc::new(source)
}
