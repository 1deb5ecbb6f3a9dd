//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatch handler
//! - Wire up middleware (request ID, tracing, security headers)
//! - Route `/fhir` traffic to the proxy, everything else to the SPA bundle
//! - Serve on a bound listener until shutdown

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::proxy::{FhirProxy, ProxyBuildError};
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::static_files::{accepts_gzip, StaticAssets};
use crate::lifecycle::shutdown::triggered;
use crate::observability::metrics::{self, RouteKind};
use crate::security::{security_headers_middleware, HealthcareApiValidator, StoreBaseValidator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<FhirProxy>,
    pub assets: Arc<StaticAssets>,
    pub proxy_prefix: Arc<str>,
}

/// The SPA server and FHIR proxy.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server that only proxies to Cloud Healthcare API stores.
    pub fn new(config: ServerConfig) -> Result<Self, ProxyBuildError> {
        Self::with_validator(config, Arc::new(HealthcareApiValidator))
    }

    /// Create a server with a custom store base policy.
    pub fn with_validator(
        config: ServerConfig,
        validator: Arc<dyn StoreBaseValidator>,
    ) -> Result<Self, ProxyBuildError> {
        let state = AppState {
            proxy: Arc::new(FhirProxy::new(&config.proxy, validator)?),
            assets: Arc::new(StaticAssets::new(&config.static_files)),
            proxy_prefix: Arc::from(config.proxy.path_prefix.as_str()),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn(security_headers_middleware)),
            )
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            content_root = %self.config.static_files.content_root,
            proxy_prefix = %self.config.proxy.path_prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(triggered(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Composition root: proxy prefix goes upstream, everything else is the SPA.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let (route, response) = if path.starts_with(&*state.proxy_prefix) {
        (RouteKind::Proxy, state.proxy.handle(request).await)
    } else {
        let accept_gzip = accepts_gzip(request.headers());
        state.assets.serve(&path, accept_gzip).await
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), route, start);
    response
}
