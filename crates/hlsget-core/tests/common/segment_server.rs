//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths, each with a scriptable behavior: plain
//! body, a number of failures before succeeding, or a permanent status.
//! One thread per connection; runs until the process exits.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// What a path does when hit.
pub enum Behavior {
    /// Always 200 with this body.
    Serve(Vec<u8>),
    /// Return `status` for the first `failures` hits, then 200 with body.
    FailThenServe {
        failures: u32,
        status: u32,
        body: Vec<u8>,
    },
    /// Always return this status with an empty body.
    AlwaysStatus(u32),
}

struct Route {
    behavior: Behavior,
    hits: u32,
}

/// Starts the server in a background thread. Returns the base URL,
/// e.g. "http://127.0.0.1:12345".
pub fn start(routes: HashMap<String, Behavior>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(
        routes
            .into_iter()
            .map(|(path, behavior)| (path, Route { behavior, hits: 0 }))
            .collect(),
    ));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, routes: &Mutex<HashMap<String, Route>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(r) => r,
        Err(_) => return,
    };
    let path = match request.split_whitespace().nth(1) {
        Some(p) => p.to_string(),
        None => return,
    };

    let (status, body): (u32, Vec<u8>) = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&path) {
            None => (404, Vec::new()),
            Some(route) => {
                route.hits += 1;
                match &route.behavior {
                    Behavior::Serve(body) => (200, body.clone()),
                    Behavior::FailThenServe {
                        failures,
                        status,
                        body,
                    } => {
                        if route.hits <= *failures {
                            (*status, Vec::new())
                        } else {
                            (200, body.clone())
                        }
                    }
                    Behavior::AlwaysStatus(status) => (*status, Vec::new()),
                }
            }
        }
    };

    let reason = if status == 200 { "OK" } else { "Error" };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}
