use crate::config::ServerConfig;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const LOCAL_DEV_ORIGIN: &str = "http://localhost:3000";

/// Origins allowed to call the API. `None` means any origin.
///
/// Without an explicit frontend URL every origin is accepted.
pub fn allowed_origins(server: &ServerConfig) -> Option<Vec<String>> {
    let frontend = server.frontend_url.as_deref()?;

    let mut origins = vec![LOCAL_DEV_ORIGIN.to_string(), frontend.to_string()];
    if let Some(host) = frontend.strip_prefix("https://") {
        origins.push(format!("http://{}", host));
    } else if let Some(host) = frontend.strip_prefix("http://") {
        origins.push(format!("https://{}", host));
    }

    if let Some(vercel) = server.vercel_url.as_deref() {
        origins.push(format!("https://{}", vercel));
        origins.push(format!("http://{}", vercel));
    }

    origins.dedup();
    Some(origins)
}

/// Build the CORS layer for the configured origins.
pub fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers(Any)
        .expose_headers(Any);

    match allowed_origins(server) {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}
