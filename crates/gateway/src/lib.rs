//! HTTP API gateway for Gongbu.
//!
//! Exposes the health check and the v1 JSON API that the web front end
//! calls for study guides, tutor chat, roles, the notice banner and admin
//! content collection.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use gongbu_config::AppConfig;
use gongbu_core::store::Store;
use gongbu_store::SqliteStore;

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - CORS restricted to `gateway.allowed_origins`
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: api_v1::SharedApiState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .gateway
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(api_v1::USER_ID_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let router = gongbu_providers::router::build_from_config(&config);
    let provider = router
        .default()
        .ok_or("No default provider configured; set default_provider to openai, ollama or a [providers] entry with api_url")?;
    if !config.has_api_key() {
        warn!("No API key configured; guide and chat requests will fail");
    }

    let database_url = config.database_url();
    let store: Arc<dyn Store> =
        Arc::new(SqliteStore::new(&database_url, config.database.max_connections).await?);

    let state = Arc::new(api_v1::ApiV1State::new(config, provider, store));
    let app = build_router(state);

    info!(addr = %addr, database = %database_url, "Gateway starting with v1 API");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gongbu_store::InMemoryStore;
    use tower::ServiceExt;

    fn test_state(config: AppConfig) -> api_v1::SharedApiState {
        let router = gongbu_providers::router::build_from_config(&config);
        let provider = router.default().expect("No default provider configured");
        Arc::new(api_v1::ApiV1State::new(config, provider, Arc::new(InMemoryStore::new())))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(AppConfig::default()));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn v1_is_nested() {
        let app = build_router(test_state(AppConfig::default()));

        let req = Request::builder()
            .uri("/v1/notice")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let mut config = AppConfig::default();
        config.gateway.allowed_origins = vec!["http://localhost:5173".into(), "not a url\n".into()];
        let app = build_router(test_state(config));

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/v1/guides")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
    }
}
