use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    let api_routes = Router::new()
        .route("/health", get(api::health::health))
        .route("/simulate", post(api::simulate::simulate))
        .route("/score", post(api::score::score))
        .route("/rules", get(api::rules::list_rules))
        .route("/rules/validate", post(api::rules::validate_rules))
        .route("/rules/reload", post(api::rules::reload_rules))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `*` allows any origin; anything else is used as the single allowed origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(origin = %origin, "invalid CORS_ORIGIN; falling back to permissive CORS");
            CorsLayer::permissive()
        }
    }
}
