use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, Response},
    middleware,
    routing::get,
};
use chrono::{DateTime, Utc};
use geocache_index::LocationIndex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::{
    config::AppConfig, create_cache_backend, create_store, handlers, metrics,
    middleware as app_middleware, service::LocationService,
};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: LocationService,
    pub config: Arc<AppConfig>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: LocationService, config: AppConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
            started_at: Utc::now(),
        }
    }
}

pub struct GeocacheServer {
    addr: SocketAddr,
    app: Router,
}

/// Root span for one request, tagged with the request id set by
/// [`app_middleware::request_id`].
fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .extensions()
        .get::<HeaderValue>()
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    tracing::info_span!(
        "http.request",
        method = %req.method(),
        uri = %req.uri(),
        status = tracing::field::Empty,
        request_id,
    )
}

fn record_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status().as_u16();
    span.record("status", status);
    tracing::info!(status, elapsed_ms = latency.as_millis() as u64, "request handled");
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let trace = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_response(record_response);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route(
            "/locations/{id}",
            get(handlers::get_location)
                .put(handlers::update_location)
                .delete(handlers::delete_location),
        )
        .route_layer(middleware::from_fn(app_middleware::http_metrics))
        // Outermost first, so the request id is set before the span opens.
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(trace)
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connect the backing store and cache, and assemble the router.
    pub async fn build(self) -> anyhow::Result<GeocacheServer> {
        metrics::init_metrics();

        let store = create_store(&self.config.storage).await?;
        let backend = create_cache_backend(&self.config.redis).await;
        let index = LocationIndex::new(backend, self.config.cache.ttl());
        let service = LocationService::new(store, index, self.config.cache.op_timeout());

        tracing::info!(
            store = service.store_backend(),
            cache = service.cache_mode(),
            ttl_secs = self.config.cache.ttl_secs,
            "location service ready"
        );

        let app = build_app(AppState::new(service, self.config));
        Ok(GeocacheServer {
            addr: self.addr,
            app,
        })
    }
}

impl GeocacheServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
