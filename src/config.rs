use clap::{ArgAction, Args, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// Deployment mode. Anything other than production gets debug logs,
// an access log and raw inference errors in responses.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

// Which admission stage runs first on /query
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOrder {
    // invalid keys are rejected before they can spend rate budget
    KeyFirst,
    // every caller spends budget, authenticated or not
    RateLimitFirst,
}

// Sampling options forwarded to Ollama as `options`
#[derive(Args, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelOptions {
    #[arg(long, env = "TEMPERATURE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[arg(long, env = "TOP_P")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[arg(long, env = "TOP_K")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    // max tokens to generate, -1 for unlimited
    #[arg(long, env = "NUM_PREDICT", allow_hyphen_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,

    #[arg(long, env = "REPEAT_PENALTY")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
}

impl ModelOptions {
    pub fn is_empty(&self) -> bool {
        *self == ModelOptions::default()
    }
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "llm-chat-gateway")]
#[command(about = "API key gated, rate limited HTTP gateway for an Ollama model")]
pub struct Config {
    // Model to run on the Ollama server
    #[arg(short, long, env = "MODEL_NAME", default_value = "deepseek-r1:70b-llama-distill-q4_K_M")]
    pub model: String,

    // Shared secret expected in X-Api-Key
    #[arg(long, env = "API_KEY", default_value = "1234", hide_env_values = true)]
    pub api_key: String,

    // Address to bind
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port for plain HTTP
    #[arg(short, long, env = "HTTP_PORT", default_value_t = 8000)]
    pub port: u16,

    // Port for HTTPS, only used when a certificate and key are given
    #[arg(long, env = "HTTPS_PORT", default_value_t = 8443)]
    pub https_port: u16,

    // PEM certificate chain
    #[arg(long, env = "TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    // PEM private key
    #[arg(long, env = "TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    // Ollama server url
    #[arg(short, long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    // Number of inference workers
    #[arg(short, long, env = "WORKERS", default_value_t = 6)]
    pub workers: usize,

    // Jobs that may wait for a free worker before callers are held back
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 32)]
    pub queue_capacity: usize,

    #[arg(short, long, env = "ENVIRONMENT", value_enum, default_value_t = Environment::Production)]
    pub environment: Environment,

    // Rate limit max requests per window, 0 disables limiting
    #[arg(long, env = "RATE_LIMIT", default_value_t = 5)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // How often expired rate windows are swept, in seconds
    #[arg(long, env = "RATE_CLEANUP_INTERVAL", default_value_t = 60)]
    pub rate_cleanup_interval: u64,

    #[arg(long, env = "ADMISSION_ORDER", value_enum, default_value_t = AdmissionOrder::KeyFirst)]
    pub admission_order: AdmissionOrder,

    // Take the client address from the left-most X-Forwarded-For entry.
    // Only safe behind a proxy that overwrites the header: any direct
    // caller can change it per request and dodge the rate limit.
    // Set to false when clients connect directly.
    #[arg(long, env = "TRUST_PROXY_HEADERS", default_value_t = true, action = ArgAction::Set)]
    pub trust_proxy_headers: bool,

    // Per-call inference timeout in seconds, 0 waits forever
    #[arg(long, env = "INFERENCE_TIMEOUT", default_value_t = 300)]
    pub inference_timeout: u64,

    #[command(flatten)]
    pub model_options: ModelOptions,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    // Raw backend errors are only shown to callers outside production
    pub fn expose_errors(&self) -> bool {
        !self.is_production()
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn rate_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.rate_cleanup_interval.max(1))
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        match self.inference_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn https_addr(&self) -> String {
        format!("{}:{}", self.host, self.https_port)
    }

    // Both paths or neither, clap enforces the pairing
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue capacity must be at least 1".to_string());
        }
        if self.rate_limit > 0 && self.rate_window == 0 {
            return Err("rate window must be at least 1 second".to_string());
        }
        Ok(())
    }
}
