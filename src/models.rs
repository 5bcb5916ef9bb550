use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::ModelOptions;
use crate::error::InferenceError;

// Body of POST /query
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct QueryRequest {
    pub prompt: String,
}

// Successful /query reply
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct QueryResponse {
    pub response: String,
}

// Ollama API request format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

// Ollama API response format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
}

// Ollama reports failures as {"error": "..."}
#[derive(Deserialize, Debug)]
pub struct OllamaError {
    pub error: String,
}

// Inference job - holds the prompt + response channel
pub struct InferenceJob {
    pub prompt: String,
    pub response_tx: oneshot::Sender<Result<String, InferenceError>>, // one-time channel to send back the result
}
