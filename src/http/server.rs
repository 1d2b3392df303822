//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router (single fallback handler for every path)
//! - Wire up middleware (request ID, tracing)
//! - Serve plaintext via `axum::serve` or TLS via `axum_server`
//! - Apply route updates by swapping the routing snapshot

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum_server::tls_rustls::RustlsConfig;
use axum::http::HeaderName;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::admin::{AdminEndpoint, DEFAULT_BYPASS_HEADER};
use crate::http::dispatcher::proxy_handler;
use crate::http::request::request_id_layer;
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::net::{load_tls_config, TlsError};
use crate::observability::metrics;
use crate::routing::RoutingTable;
use crate::upstream::UpstreamConnector;

/// Shared routing snapshot, replaced wholesale on reload.
pub type SharedRoutes = Arc<ArcSwap<RoutingTable>>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: SharedRoutes,
    pub connector: UpstreamConnector,
    pub admin: AdminEndpoint,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> Self {
        let bypass_header = HeaderName::from_str(&config.admin.bypass_header).unwrap_or_else(|_| {
            tracing::warn!(
                header = %config.admin.bypass_header,
                "Invalid bypass header, using {}", DEFAULT_BYPASS_HEADER
            );
            HeaderName::from_static(DEFAULT_BYPASS_HEADER)
        });

        let connector = UpstreamConnector::new(
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.request_secs),
        )
        .with_loop_guard(bypass_header.clone());

        Self {
            routes: Arc::new(ArcSwap::from_pointee(RoutingTable::from_config(&config.routes))),
            connector,
            admin: AdminEndpoint::new(bypass_header, config.admin.enabled),
        }
    }
}

/// Error type for serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    routes: SharedRoutes,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let state = AppState::new(&config);
        let routes = state.routes.clone();
        let router = Self::build_router(state);

        tracing::info!(routes = routes.load().len(), "Routing table compiled");

        Self {
            router,
            config,
            routes,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(request_id_layer())
    }

    /// Handle to the live routing snapshot.
    pub fn routes(&self) -> SharedRoutes {
        self.routes.clone()
    }

    /// Run the server on `listener` until `stop` fires.
    ///
    /// Configurations received on `config_updates` replace the routing table;
    /// listener and TLS settings in them are ignored.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        stop: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let HttpServer {
            router,
            config,
            routes,
        } = self;
        let addr = listener.local_addr()?;

        // Everything fallible happens before any task is spawned.
        let transport = match &config.listener.tls {
            None => Transport::Plain(listener),
            Some(tls) => Transport::Tls(
                listener.into_std()?,
                load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?,
            ),
        };

        let reload = tokio::spawn(apply_route_updates(
            routes,
            config_updates,
            stop.resubscribe(),
        ));

        let app = router.into_make_service_with_connect_info::<SocketAddr>();

        let served = match transport {
            Transport::Plain(listener) => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(wait_for_shutdown(stop))
                    .await
                    .map_err(ServerError::from)
            }
            Transport::Tls(listener, tls_config) => {
                let handle = axum_server::Handle::new();
                let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
                let drain = handle.clone();
                tokio::spawn(async move {
                    wait_for_shutdown(stop).await;
                    drain.graceful_shutdown(Some(grace));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener, tls_config)
                    .handle(handle)
                    .serve(app)
                    .await
                    .map_err(ServerError::from)
            }
        };

        reload.abort();
        tracing::info!(address = %addr, "HTTP server stopped");
        served
    }
}

enum Transport {
    Plain(TcpListener),
    Tls(std::net::TcpListener, RustlsConfig),
}

/// Swap in a new routing table for every configuration received.
async fn apply_route_updates(
    routes: SharedRoutes,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    let table = RoutingTable::from_config(&config.routes);
                    tracing::info!(routes = table.len(), "Routing table reloaded");
                    routes.store(Arc::new(table));
                    metrics::record_reload(true);
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
