//! Axum router configuration

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use std::path::Path;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Create the router serving `directory`
///
/// The index and segments are rewritten every few seconds, so no response
/// may be cached by browsers or intermediaries, error responses included.
pub fn create_router(directory: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::RANGE, header::ORIGIN])
        .max_age(Duration::from_secs(3600));

    let files = ServeDir::new(directory.as_ref()).append_index_html_on_directories(false);

    Router::new()
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
}
