//! Router layers.
use tower_http::cors::CorsLayer;
use tower_http::trace::{HttpMakeClassifier, TraceLayer};

/// Any origin, method and header.
pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// Request spans; 5xx responses are logged as failures.
pub fn trace() -> TraceLayer<HttpMakeClassifier> {
    TraceLayer::new_for_http()
}
