use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Instant;
use crate::error::GatewayError;
use crate::metrics::{INFERENCE_FAILURES, QUERY_TOTAL, REQUEST_LATENCY};
use crate::models::{QueryRequest, QueryResponse};
use crate::state::AppState;

// Only reached once both admission stages have let the request through
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, GatewayError> {
    QUERY_TOTAL.inc();
    let start_time = Instant::now();

    let result = state.forwarder.forward(payload.prompt).await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(response) => Ok(Json(QueryResponse { response })),
        Err(e) => {
            INFERENCE_FAILURES.with_label_values(&[e.kind()]).inc();
            // full detail goes to the log, the caller may get a redacted one
            tracing::error!(error = %e, kind = e.kind(), "Query failed");
            Err(GatewayError::from_inference(&e, state.config.expose_errors()))
        }
    }
}
