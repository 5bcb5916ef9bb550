mod docs;
mod health;
mod metrics;
mod query;

pub use docs::{openapi_document, openapi_handler, redoc_handler, swagger_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use query::query_handler;
