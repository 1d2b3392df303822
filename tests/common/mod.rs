//! Shared stub origins and proxy launcher for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::{routing::any, routing::get, Router};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;

use vhost_proxy::config::{ProxyConfig, RouteConfig, TlsConfig};
use vhost_proxy::{HttpServer, Shutdown};

pub const TEST_BODY: &str = "This is a test backend";
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string()
    };
    format!(
        "method={} uri={} host={} x-no-proxy={} x-request-id={} body={}",
        method,
        uri,
        header("host"),
        header("x-no-proxy"),
        header("x-request-id"),
        String::from_utf8_lossy(&body)
    )
}

/// The test origin: fixed body with a custom header, a slow path, and an echo path.
pub async fn start_test_backend() -> SocketAddr {
    let router = Router::new()
        .route("/", get(|| async { ([("test-header", "test-value")], TEST_BODY) }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(SLOW_DELAY).await;
                TEST_BODY
            }),
        )
        .route(
            "/large",
            get(|| async { vec![b'x'; 4 * 1024 * 1024] }),
        )
        .route("/echo", any(echo));
    serve(router).await
}

/// An origin that answers every path with `name`.
pub async fn start_named_backend(name: &'static str) -> SocketAddr {
    serve(Router::new().fallback(move || async move { name })).await
}

/// Accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// A listener with a full accept queue: connection attempts never complete.
pub async fn start_saturated_backend() -> SocketAddr {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(0).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut held = Vec::new();
    for _ in 0..64 {
        match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => held.push(stream),
            _ => break,
        }
    }
    tokio::spawn(async move {
        let _keep = (listener, held);
        std::future::pending::<()>().await;
    });
    addr
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn route(host: &str, upstream: SocketAddr) -> RouteConfig {
    RouteConfig::single(host, upstream.to_string())
}

pub fn config(routes: Vec<RouteConfig>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routes = routes;
    config
}

pub fn with_tls(mut config: ProxyConfig) -> ProxyConfig {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    config.listener.tls = Some(TlsConfig {
        cert_path: fixtures.join("cert.pem").to_string_lossy().into_owned(),
        key_path: fixtures.join("key.pem").to_string_lossy().into_owned(),
    });
    config
}

/// A running proxy. Dropping it shuts the proxy down.
pub struct ProxyHandle {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
    shutdown: Shutdown,
    tls: bool,
}

impl ProxyHandle {
    pub fn url(&self, path: &str) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.addr, path)
    }
}

impl Drop for ProxyHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> ProxyHandle {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let tls = config.listener.tls.is_some();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    ProxyHandle {
        addr,
        updates,
        shutdown,
        tls,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .http1_only()
        .no_proxy()
        .build()
        .unwrap()
}
