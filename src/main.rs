use anyhow::{Context, anyhow};
use clap::Parser; // for cli
use llm_chat_gateway::{
    AppState, Config, OllamaBackend, build_router, logging, rate_limit, tls,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments / environment
    let config = Config::parse();
    config.validate().map_err(|e| anyhow!(e))?;

    logging::init_logging(config.environment);

    let backend = Arc::new(OllamaBackend::new(
        reqwest::Client::new(),
        &config.ollama_url,
        &config.model,
        config.model_options.clone(),
    ));

    let state = AppState::new(config.clone(), backend);

    // sweep expired rate windows in the background
    tokio::spawn(rate_limit::cleanup_loop(
        state.guard.limiter().clone(),
        config.rate_cleanup_interval(),
    ));

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.http_addr()))?;

    tracing::info!(
        addr = %config.http_addr(),
        model = %config.model,
        ollama = %config.ollama_url,
        environment = config.environment.as_str(),
        workers = config.workers,
        "Gateway listening"
    );
    tracing::info!(
        "Rate limit: {} requests per {} seconds ({:?} order)",
        config.rate_limit, config.rate_window, config.admission_order
    );

    let http = axum::serve(
        listener,
        app.clone().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .into_future();

    match config.tls_paths() {
        None => http.await.context("HTTP server failed")?,
        Some((cert, key)) => {
            let tls_config = tls::load_server_config(cert, key)?;
            let tls_listener = tokio::net::TcpListener::bind(config.https_addr())
                .await
                .with_context(|| format!("Failed to bind {}", config.https_addr()))?;

            tracing::info!(addr = %config.https_addr(), "HTTPS listener enabled");

            // HTTPS stops when the HTTP side has shut down
            tokio::select! {
                res = http => res.context("HTTP server failed")?,
                res = tls::serve_tls(tls_listener, tls_config, app) => res?,
            }
        }
    }

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
