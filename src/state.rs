use std::sync::Arc;

use crate::admission::AdmissionGuard;
use crate::config::Config;
use crate::inference::InferenceBackend;
use crate::rate_limit::RateLimiter;
use crate::worker::Forwarder;

// app's shared state, built once at startup

pub struct AppState {
    pub config: Config,
    pub guard: AdmissionGuard,
    pub forwarder: Forwarder,
    pub model: String,
}

impl AppState {
    // Spawns the inference workers, so call it inside the runtime
    pub fn new(config: Config, backend: Arc<dyn InferenceBackend>) -> Arc<Self> {
        let limiter = RateLimiter::new(config.rate_limit, config.rate_window());
        let guard = AdmissionGuard::new(&config.api_key, limiter, config.admission_order);
        let model = backend.model().to_string();
        let forwarder = Forwarder::spawn(
            backend,
            config.workers,
            config.queue_capacity,
            config.inference_timeout(),
        );

        Arc::new(Self {
            config,
            guard,
            forwarder,
            model,
        })
    }
}
