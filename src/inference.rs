// model backend the prompts go to

use async_trait::async_trait;

use crate::config::ModelOptions;
use crate::error::InferenceError;
use crate::models::{GenerateRequest, GenerateResponse, OllamaError};

// Something that turns a prompt into a completion.
// Calls are independent: no conversation state is kept between them.
#[async_trait]
pub trait InferenceBackend: Send + Sync + 'static {
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError>;

    // Model identifier, reported by the health endpoint.
    fn model(&self) -> &str;
}

// Non-streaming client for Ollama's /api/generate
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: Option<ModelOptions>,
}

impl OllamaBackend {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, options: ModelOptions) -> Self {
        // add http:// if not present
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };

        Self {
            client,
            base_url,
            model: model.to_string(),
            options: if options.is_empty() { None } else { Some(options) },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: self.options.clone(),
        };

        let res = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::Backend(format!("Request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(InferenceError::Backend(format!(
                "Ollama returned {}: {}",
                status, message
            )));
        }

        let body = res
            .json::<GenerateResponse>()
            .await
            .map_err(|e| InferenceError::Backend(format!("Parse Error: {}", e)))?;

        Ok(body.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
