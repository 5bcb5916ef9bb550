// admission stages for /query, stacked in routes.rs

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::admission::{Rejection, api_key_from_headers, client_identity};
use crate::metrics::ADMISSION_REJECTIONS;
use crate::state::AppState;

pub async fn rate_limit_stage(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    // ConnectInfo is absent when the router is driven without a listener
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identity(req.headers(), peer, state.config.trust_proxy_headers);

    if let Err(rejection) = state.guard.check_rate(&client) {
        tracing::info!(client = %client, "Rate limit exceeded");
        return reject(&state, rejection);
    }

    next.run(req).await
}

pub async fn api_key_stage(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(rejection) = state.guard.check_key(api_key_from_headers(req.headers())) {
        tracing::warn!(path = %req.uri().path(), "Invalid or missing API key");
        return reject(&state, rejection);
    }

    next.run(req).await
}

fn reject(state: &AppState, rejection: Rejection) -> Response {
    ADMISSION_REJECTIONS
        .with_label_values(&[rejection.reason()])
        .inc();
    state.guard.rejection_error(rejection).into_response()
}
