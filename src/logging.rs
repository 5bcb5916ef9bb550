use tracing_subscriber::EnvFilter;

use crate::config::Environment;

// RUST_LOG wins; otherwise info in production and debug elsewhere
pub fn default_filter(environment: Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match environment {
            Environment::Production => "info",
            Environment::Development => "debug",
        };
        EnvFilter::new(format!("llm_chat_gateway={level},tower_http={level},warn"))
    })
}

// Call once, before anything logs
pub fn init_logging(environment: Environment) {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(environment))
        .with_target(false)
        .init();
}
