// gateway errors + http mapping

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

// Failure of a single call into the inference backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    // The backend failed or returned something unusable.
    #[error("{0}")]
    Backend(String),

    // The call did not finish within the configured limit.
    #[error("Inference timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    // No worker is left to take the job.
    #[error("Inference workers unavailable")]
    Unavailable,
}

impl InferenceError {
    // label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Backend(_) => "backend",
            InferenceError::Timeout(_) => "timeout",
            InferenceError::Unavailable => "unavailable",
        }
    }
}

// Everything a `/query` call can fail with.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid API Key")]
    Unauthorized,

    #[error("Rate limit exceeded: {quota}")]
    RateLimited { quota: String, retry_after: Duration },

    // `detail` is what the caller sees, which may be redacted.
    #[error("{detail}")]
    Inference { kind: InferenceErrorKind, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceErrorKind {
    Backend,
    Timeout,
    Unavailable,
}

impl GatewayError {
    // Convert a backend failure, hiding its text unless `expose` is set
    pub fn from_inference(err: &InferenceError, expose: bool) -> Self {
        let kind = match err {
            InferenceError::Backend(_) => InferenceErrorKind::Backend,
            InferenceError::Timeout(_) => InferenceErrorKind::Timeout,
            InferenceError::Unavailable => InferenceErrorKind::Unavailable,
        };
        let detail = if expose {
            err.to_string()
        } else {
            match kind {
                InferenceErrorKind::Backend => "Inference failed".to_string(),
                // these carry nothing internal
                InferenceErrorKind::Timeout | InferenceErrorKind::Unavailable => err.to_string(),
            }
        };
        GatewayError::Inference { kind, detail }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Inference { kind, .. } => match kind {
                InferenceErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
                InferenceErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                InferenceErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

// Whole seconds until retry, never 0
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    let secs = if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs };
    secs.max(1)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            GatewayError::RateLimited { retry_after, .. } => {
                let mut res = (status, Json(serde_json::json!({ "error": message }))).into_response();
                res.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(retry_after)),
                );
                res
            }
            _ => (status, Json(serde_json::json!({ "detail": message }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_is_redacted_in_production() {
        let err = InferenceError::Backend("model 'x' not found at /var/lib/ollama".to_string());

        let redacted = GatewayError::from_inference(&err, false);
        assert_eq!(redacted.to_string(), "Inference failed");
        assert_eq!(redacted.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let raw = GatewayError::from_inference(&err, true);
        assert_eq!(raw.to_string(), "model 'x' not found at /var/lib/ollama");
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = InferenceError::Timeout(Duration::from_secs(30));
        let mapped = GatewayError::from_inference(&err, false);

        assert_eq!(mapped.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(mapped.to_string(), "Inference timed out after 30 seconds");
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn rate_limited_response_has_retry_after() {
        let err = GatewayError::RateLimited {
            quota: "5 per 1 minute".to_string(),
            retry_after: Duration::from_secs(42),
        };
        let res = err.into_response();

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[header::RETRY_AFTER], "42");
    }
}
