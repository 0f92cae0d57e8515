//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flproxy::lifecycle::{DrainOutcome, ServerLifecycle};
use flproxy::net::Listener;
use flproxy::{HttpServer, ProxyConfig, RetryPolicy, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What a mock backend does with one request.
pub enum Reply {
    /// Send a complete response after `delay`.
    Respond {
        status: u16,
        body: String,
        delay: Duration,
    },
    /// Close the connection without answering.
    Hangup,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Respond {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(delay: Duration, body: &str) -> Self {
        Reply::Respond {
            status: 200,
            body: body.to_string(),
            delay,
        }
    }
}

/// A request as seen by the backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Start a programmable backend on an ephemeral loopback port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        match f(request).await {
                            Reply::Respond { status, body, delay } => {
                                if !delay.is_zero() {
                                    tokio::time::sleep(delay).await;
                                }
                                let response = format!(
                                    "HTTP/1.1 {} Status\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                    status,
                                    body.len(),
                                    body
                                );
                                let _ = socket.write_all(response.as_bytes()).await;
                                let _ = socket.shutdown().await;
                            }
                            Reply::Hangup => drop(socket),
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request = RecordedRequest {
        head,
        body: buf[header_end..].to_vec(),
    };

    let content_length = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while request.body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        request.body.extend_from_slice(&chunk[..n]);
    }

    Some(request)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Short retry budget so failing tests finish quickly.
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        initial_interval: Duration::from_millis(20),
        multiplier: 1.5,
        randomization_factor: 0.0,
        max_interval: Duration::from_millis(100),
        max_elapsed_time: Duration::from_millis(500),
    }
}

pub fn config_for(backend: SocketAddr, limit: i64) -> ProxyConfig {
    let mut config = ProxyConfig::new(8080, i64::from(backend.port()), limit).unwrap();
    config.retry = fast_retry_policy();
    config
}

/// A running proxy bound to an ephemeral loopback port.
pub struct ProxyHandle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub lifecycle: watch::Receiver<ServerLifecycle>,
    pub task: JoinHandle<DrainOutcome>,
}

impl ProxyHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the drain to finish.
    pub async fn stop(self) -> DrainOutcome {
        self.shutdown.trigger();
        self.task.await.unwrap()
    }
}

pub async fn start_proxy(config: ProxyConfig) -> ProxyHandle {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let lifecycle = server.lifecycle();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.wait()));

    ProxyHandle {
        addr,
        shutdown,
        lifecycle,
        task,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
