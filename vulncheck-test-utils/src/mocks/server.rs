//! Minimal instrumented HTTP server for ordering and concurrency tests.
//!
//! Static mock servers can verify what was requested but not *when*.
//! `RecordingServer` timestamps every request, tracks how many are being
//! served at once, and can delay responses per route, which is what the
//! batch scheduling tests need.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Raw query string, empty when absent.
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
    /// When the request was fully read.
    pub arrived_at: Instant,
    /// When the response finished writing. `None` only while in flight.
    pub responded_at: Option<Instant>,
}

struct RouteRule {
    prefix: String,
    status: u16,
    body: String,
    delay: Duration,
}

#[derive(Default)]
struct Gauge {
    active: usize,
    peak: usize,
}

struct ServerState {
    routes: Vec<RouteRule>,
    log: Mutex<Vec<RequestRecord>>,
    gauge: Mutex<Gauge>,
}

/// Configures routes before the server starts listening.
pub struct RecordingServerBuilder {
    routes: Vec<RouteRule>,
}

impl RecordingServerBuilder {
    /// Serve `body` with `status` for any path starting with `prefix`.
    ///
    /// Routes match in registration order.
    pub fn route(self, prefix: &str, status: u16, body: impl Into<String>) -> Self {
        self.route_with_delay(prefix, status, body, Duration::ZERO)
    }

    /// Like [`route`](Self::route), but holds the response for `delay`
    /// so overlapping requests become observable.
    pub fn route_with_delay(
        mut self,
        prefix: &str,
        status: u16,
        body: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.routes.push(RouteRule {
            prefix: prefix.to_string(),
            status,
            body: body.into(),
            delay,
        });
        self
    }

    /// Bind to an ephemeral local port and start serving.
    pub async fn start(self) -> RecordingServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("test server address");
        let state = Arc::new(ServerState {
            routes: self.routes,
            log: Mutex::new(Vec::new()),
            gauge: Mutex::new(Gauge::default()),
        });

        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let conn_state = Arc::clone(&accept_state);
                tokio::spawn(handle_connection(stream, conn_state));
            }
        });

        RecordingServer {
            addr,
            state,
            accept_task,
        }
    }
}

/// In-process HTTP server that records request timing and concurrency.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use vulncheck_test_utils::RecordingServer;
///
/// # async fn example() {
/// let server = RecordingServer::builder()
///     .route_with_delay("/v3/search", 200, "{}", Duration::from_millis(50))
///     .start()
///     .await;
/// // ... drive the client against server.url() ...
/// assert!(server.peak_concurrency() <= 4);
/// # }
/// ```
pub struct RecordingServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    accept_task: JoinHandle<()>,
}

impl RecordingServer {
    pub fn builder() -> RecordingServerBuilder {
        RecordingServerBuilder { routes: Vec::new() }
    }

    /// Base URL to hand to the client under test.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.state.log.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`, in arrival order.
    pub fn requests_to(&self, prefix: &str) -> Vec<RequestRecord> {
        self.requests()
            .into_iter()
            .filter(|record| record.path.starts_with(prefix))
            .collect()
    }

    /// Number of requests whose path starts with `prefix`.
    pub fn hits(&self, prefix: &str) -> usize {
        self.requests_to(prefix).len()
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.state.gauge.lock().unwrap().peak
    }
}

impl Drop for RecordingServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<ServerState>) {
    loop {
        let Ok(Some(request)) = read_request(&mut stream).await else {
            return;
        };

        let record_index = {
            let mut log = state.log.lock().unwrap();
            log.push(request.to_record());
            log.len() - 1
        };
        {
            let mut gauge = state.gauge.lock().unwrap();
            gauge.active += 1;
            gauge.peak = gauge.peak.max(gauge.active);
        }

        let (status, body, delay) = match state
            .routes
            .iter()
            .find(|rule| request.path.starts_with(&rule.prefix))
        {
            Some(rule) => (rule.status, rule.body.clone(), rule.delay),
            None => (404, r#"{"message":"not found"}"#.to_string(), Duration::ZERO),
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let write_result = write_response(&mut stream, status, &body, request.close).await;

        {
            let mut gauge = state.gauge.lock().unwrap();
            gauge.active -= 1;
        }
        state.log.lock().unwrap()[record_index].responded_at = Some(Instant::now());

        if write_result.is_err() || request.close {
            return;
        }
    }
}

struct ParsedRequest {
    method: String,
    path: String,
    query: String,
    authorization: Option<String>,
    body: String,
    close: bool,
}

impl ParsedRequest {
    fn to_record(&self) -> RequestRecord {
        RequestRecord {
            method: self.method.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            authorization: self.authorization.clone(),
            body: self.body.clone(),
            arrived_at: Instant::now(),
            responded_at: None,
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<ParsedRequest>> {
    let mut buffer: Vec<u8> = Vec::new();
    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        let mut chunk = [0u8; 1024];
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    let mut close = false;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => content_length = value.parse().unwrap_or(0),
            "authorization" => authorization = Some(value.to_string()),
            "connection" => close = value.eq_ignore_ascii_case("close"),
            _ => {}
        }
    }

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0u8; 1024];
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("GET").to_string();
    let target = parts.next().unwrap_or("/");
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target.to_string(), String::new()),
    };

    Ok(Some(ParsedRequest {
        method,
        path,
        query,
        authorization,
        body: String::from_utf8_lossy(&body).to_string(),
        close,
    }))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

async fn write_response(
    stream: &mut TcpStream,
    status: u16,
    body: &str,
    close: bool,
) -> std::io::Result<()> {
    let connection = if close { "close" } else { "keep-alive" };
    let head = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: {connection}\r\n\r\n",
        reason(status),
        body.len(),
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await
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
        _ => "Response",
    }
}
