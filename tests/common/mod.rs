//! Loopback HTTP server shared by integration tests

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Server answering each request with the next queued response, repeating the last
pub struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Starts a server on an ephemeral loopback port
    pub fn start(responses: Vec<(u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind loopback");
        let addr = listener.local_addr().expect("Failed to read local address");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                if !read_request(&mut stream) {
                    continue;
                }
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = &responses[n.min(responses.len() - 1)];
                let _ = write_response(&mut stream, *status, body);
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    /// Starts a server that sends the headers and first byte of `body`, waits
    /// for `stall`, then sends the rest
    pub fn stalled(body: Vec<u8>, stall: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind loopback");
        let addr = listener.local_addr().expect("Failed to read local address");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                if !read_request(&mut stream) {
                    continue;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = write_stalled_response(&mut stream, &body, stall);
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    /// Starts a server that answers 200 with each body in turn
    pub fn with_bodies(bodies: &[&[u8]]) -> Self {
        Self::start(bodies.iter().map(|b| (200, b.to_vec())).collect())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of requests served so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Reads request headers; returns false if the peer hung up first
fn read_request(stream: &mut TcpStream) -> bool {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    true
}

fn write_response(stream: &mut TcpStream, status: u16, body: &[u8]) -> std::io::Result<()> {
    let reason = if status == 200 { "OK" } else { "Error" };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}

fn write_stalled_response(stream: &mut TcpStream, body: &[u8], stall: Duration) -> std::io::Result<()> {
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let split = body.len().min(1);
    stream.write_all(header.as_bytes())?;
    stream.write_all(&body[..split])?;
    stream.flush()?;
    thread::sleep(stall);
    stream.write_all(&body[split..])?;
    stream.flush()
}
