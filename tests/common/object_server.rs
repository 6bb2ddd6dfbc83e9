//! Minimal in-memory object store over HTTP/1.1 for integration tests.
//!
//! Objects live at `/<bucket>/<object>`: HEAD answers Content-Length plus the
//! stored `x-amz-meta-*` headers, GET streams the body, PUT stores the body
//! and its metadata. `/auth/<action>/<bucket>/<object>` mimics the data API:
//! with the right token it answers a JSON envelope holding the object URL.
//! One thread per connection; every response closes the connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const TOKEN_HEADER: &str = "x-test-token";

#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub meta: Vec<(String, String)>,
}

impl StoredObject {
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Answer `method` requests on objects ending in `object` with `status`.
#[derive(Debug, Clone, Copy)]
pub struct Failure {
    pub method: &'static str,
    pub object: &'static str,
    pub status: &'static str,
    pub body: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectServerOptions {
    /// GET bodies are written in chunks of this size...
    pub chunk_size: usize,
    /// ...with this pause after each chunk (slows downloads for abort tests).
    pub chunk_delay: Duration,
    /// Pause before answering a PUT (slows uploads for abort tests).
    pub put_delay: Duration,
    pub fail: Option<Failure>,
}

impl Default for ObjectServerOptions {
    fn default() -> Self {
        Self {
            chunk_size: 16 * 1024,
            chunk_delay: Duration::ZERO,
            put_delay: Duration::ZERO,
            fail: None,
        }
    }
}

type Store = Arc<Mutex<HashMap<String, StoredObject>>>;

pub struct ObjectServer {
    base: String,
    token: String,
    store: Store,
}

impl ObjectServer {
    pub fn start(token: &str) -> Self {
        Self::start_with_options(token, ObjectServerOptions::default())
    }

    pub fn start_with_options(token: &str, opts: ObjectServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let base = format!("http://127.0.0.1:{}", port);
        let store: Store = Arc::new(Mutex::new(HashMap::new()));

        let ctx = Arc::new(Context {
            base: base.clone(),
            token: token.to_string(),
            store: Arc::clone(&store),
            opts,
        });
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || handle(stream, &ctx));
            }
        });
        Self {
            base,
            token: token.to_string(),
            store,
        }
    }

    /// e.g. "http://127.0.0.1:12345"
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Authorization endpoint template for `ClientConfig::api_url`.
    pub fn api_url(&self) -> String {
        format!("{}/auth/{{action}}/{{bucket}}/{{object}}", self.base)
    }

    /// Unauthenticated object template for `ClientConfig::public_storage_url`.
    pub fn public_url(&self) -> String {
        format!("{}/{{bucket}}/{{object}}", self.base)
    }

    pub fn insert(&self, bucket: &str, object: &str, body: Vec<u8>, meta: &[(&str, &str)]) {
        let meta = meta
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.store
            .lock()
            .unwrap()
            .insert(key(bucket, object), StoredObject { body, meta });
    }

    pub fn get(&self, bucket: &str, object: &str) -> Option<StoredObject> {
        self.store.lock().unwrap().get(&key(bucket, object)).cloned()
    }

    /// Sorted object names stored in `bucket`.
    pub fn objects(&self, bucket: &str) -> Vec<String> {
        let prefix = format!("{}/", bucket);
        let mut names: Vec<String> = self
            .store
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

struct Context {
    base: String,
    token: String,
    store: Store,
    opts: ObjectServerOptions,
}

fn key(bucket: &str, object: &str) -> String {
    format!("{}/{}", bucket, object)
}

struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Reads the request head, then exactly Content-Length body bytes.
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let head_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    };
    let head = std::str::from_utf8(&data[..head_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = data[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            // Client went away mid-body (aborted upload).
            return None;
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);
    Some(Request {
        method,
        path,
        headers,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[(String, String)], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (k, v) in headers {
        head.push_str(&format!("{}: {}\r\n", k, v));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn handle(mut stream: TcpStream, ctx: &Context) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let req = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let path = req.path.trim_start_matches('/').to_string();
    if let Some(rest) = path.strip_prefix("auth/") {
        return handle_auth(&mut stream, ctx, &req, rest);
    }

    if let Some(fail) = ctx.opts.fail {
        if req.method == fail.method && path.ends_with(fail.object) {
            let body = if req.method == "HEAD" { &b""[..] } else { fail.body.as_bytes() };
            return respond(&mut stream, fail.status, &[], body);
        }
    }

    match req.method.as_str() {
        "HEAD" => {
            let found = ctx.store.lock().unwrap().get(&path).cloned();
            match found {
                Some(obj) => {
                    let mut head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n",
                        obj.body.len()
                    );
                    for (k, v) in &obj.meta {
                        head.push_str(&format!("{}: {}\r\n", k, v));
                    }
                    head.push_str("\r\n");
                    let _ = stream.write_all(head.as_bytes());
                }
                None => respond(&mut stream, "404 Not Found", &[], b""),
            }
        }
        "GET" => {
            let found = ctx.store.lock().unwrap().get(&path).cloned();
            let obj = match found {
                Some(obj) => obj,
                None => return respond(&mut stream, "404 Not Found", &[], b"no such key"),
            };
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                obj.body.len()
            );
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            for chunk in obj.body.chunks(ctx.opts.chunk_size.max(1)) {
                if stream.write_all(chunk).is_err() {
                    return;
                }
                if !ctx.opts.chunk_delay.is_zero() {
                    let _ = stream.flush();
                    thread::sleep(ctx.opts.chunk_delay);
                }
            }
        }
        "PUT" => {
            let meta: Vec<(String, String)> = req
                .headers
                .iter()
                .filter(|(k, _)| k.to_ascii_lowercase().starts_with("x-amz-meta-"))
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect();
            if !ctx.opts.put_delay.is_zero() {
                thread::sleep(ctx.opts.put_delay);
            }
            ctx.store.lock().unwrap().insert(
                path,
                StoredObject {
                    body: req.body,
                    meta,
                },
            );
            respond(&mut stream, "200 OK", &[], b"");
        }
        _ => respond(&mut stream, "405 Method Not Allowed", &[], b""),
    }
}

/// `/auth/<action>/<bucket>/<object>`: signed URL for the object, or an
/// error envelope when the token is wrong.
fn handle_auth(stream: &mut TcpStream, ctx: &Context, req: &Request, rest: &str) {
    let json = vec![("Content-Type".to_string(), "application/json".to_string())];
    let (action, target) = match rest.split_once('/') {
        Some(parts) => parts,
        None => return respond(stream, "400 Bad Request", &[], b"malformed path"),
    };
    if !matches!(action, "head_object" | "get_object" | "put_object") {
        return respond(stream, "400 Bad Request", &[], b"unknown action");
    }
    if req.header(TOKEN_HEADER) != Some(ctx.token.as_str()) {
        let body = br#"{"code": 401, "message": "invalid token", "data": null}"#;
        return respond(stream, "200 OK", &json, body);
    }
    let body = format!(
        r#"{{"code": 200, "message": "", "data": {{"url": "{}/{}"}}}}"#,
        ctx.base, target
    );
    respond(stream, "200 OK", &json, body.as_bytes());
}
