// Shared fixtures for the router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use clap::Parser;
use http_body_util::BodyExt;
use llm_chat_gateway::{AppState, Config, InferenceBackend, InferenceError, build_router};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// Backend that always answers with the same text and counts its calls.
pub struct StaticBackend {
    reply: String,
    calls: AtomicUsize,
}

impl StaticBackend {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for StaticBackend {
    async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

// Backend that always fails with the given message.
pub struct FailingBackend(pub String);

#[async_trait]
impl InferenceBackend for FailingBackend {
    async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Backend(self.0.clone()))
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

// Parse a config the way the binary would, with extra flags appended.
pub fn test_config(extra: &[&str]) -> Config {
    let mut args = vec!["llm-chat-gateway", "--workers", "2"];
    args.extend_from_slice(extra);
    Config::try_parse_from(args).expect("valid test config")
}

pub fn test_app(config: Config, backend: Arc<dyn InferenceBackend>) -> Router {
    build_router(AppState::new(config, backend))
}

pub fn query_request(key: Option<&str>, client: &str, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/query")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
