// api key + rate limit gateway in front of an ollama model

pub mod admission;
pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod tls;
pub mod worker;

pub use config::Config;
pub use error::{GatewayError, InferenceError};
pub use inference::{InferenceBackend, OllamaBackend};
pub use routes::build_router;
pub use state::AppState;
