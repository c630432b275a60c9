//! Response hardening and CORS.
//!
//! # Responsibilities
//! - Build the CORS policy for the frontend origin (credentials allowed)
//! - Add security response headers without overriding handler-set values

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

/// Security headers applied to every response.
pub fn security_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
    ]
}

/// One `SetResponseHeaderLayer` per security header.
pub fn security_header_layers() -> Vec<SetResponseHeaderLayer<HeaderValue>> {
    security_headers()
        .into_iter()
        .map(|(name, value)| SetResponseHeaderLayer::if_not_present(name, value))
        .collect()
}

/// CORS for the single frontend origin, with cookies.
///
/// An unparseable origin yields a policy that allows no cross-origin access.
pub fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = frontend_url.trim_end_matches('/');
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Frontend URL is not a valid origin, CORS disabled");
            layer
        }
    }
}
