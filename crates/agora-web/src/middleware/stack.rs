//! Shared Middleware Stack
//!
//! Applied to every route so the API behaves the same everywhere.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    pub cors_enabled: bool,
    /// CORS allowed origins (None = any)
    pub cors_origins: Option<Vec<String>>,
    pub compression_enabled: bool,
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    pub request_logging: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors_enabled: true,
            cors_origins: None,
            compression_enabled: true,
            timeout: Duration::from_secs(30),
            request_logging: true,
        }
    }
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}

/// Apply the middleware stack to a router
pub fn apply_middleware(router: Router, config: MiddlewareConfig) -> Router {
    // Security headers (innermost - runs first on response)
    let mut router = router.layer(middleware::from_fn(security_headers_middleware));

    if config.request_logging {
        router = router.layer(middleware::from_fn(request_logging_middleware));
    }

    router = router.layer(TimeoutLayer::new(config.timeout));

    if config.compression_enabled {
        router = router.layer(CompressionLayer::new());
    }

    router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
    );

    // CORS (outermost - runs first on request)
    if config.cors_enabled {
        let cors = match config.cors_origins {
            Some(ref origins) => {
                let origins: Vec<HeaderValue> =
                    origins.iter().filter_map(|o| o.parse().ok()).collect();
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
            None => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        };
        router = router.layer(cors);
    }

    router
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}

async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!("{} {} {} - {}ms", method, uri, status.as_u16(), duration.as_millis());
    } else if status.is_client_error() {
        tracing::warn!("{} {} {} - {}ms", method, uri, status.as_u16(), duration.as_millis());
    } else {
        tracing::info!("{} {} {} - {}ms", method, uri, status.as_u16(), duration.as_millis());
    }

    response
}
