use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AdmissionOrder;
use crate::handlers::{
    health_handler, metrics_handler, openapi_handler, query_handler, redoc_handler,
    swagger_handler,
};
use crate::middleware::{api_key_stage, rate_limit_stage};
use crate::state::AppState;

// Full router: /query behind the admission stages, health and metrics open,
// API docs outside production only
pub fn build_router(state: Arc<AppState>) -> Router {
    let query = Router::new().route("/query", post(query_handler));

    // The layer added last runs first
    let query = match state.config.admission_order {
        AdmissionOrder::KeyFirst => query
            .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_stage))
            .route_layer(middleware::from_fn_with_state(state.clone(), api_key_stage)),
        AdmissionOrder::RateLimitFirst => query
            .route_layer(middleware::from_fn_with_state(state.clone(), api_key_stage))
            .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_stage)),
    };

    let app = Router::new()
        .route("/", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(query);

    // docs and access log only outside production
    let app = if state.config.is_production() {
        app.layer(cors_layer())
    } else {
        app.route("/openapi.json", get(openapi_handler))
            .route("/docs", get(swagger_handler))
            .route("/redoc", get(redoc_handler))
            .layer(cors_layer())
            .layer(TraceLayer::new_for_http())
    };

    app.with_state(state)
}

// Any origin, method and header
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}
