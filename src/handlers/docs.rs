use axum::{Json, extract::State, response::Html};
use std::sync::Arc;
use crate::state::AppState;

// Only mounted outside production

pub async fn openapi_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(openapi_document(&state))
}

pub async fn swagger_handler() -> Html<&'static str> {
    Html(SWAGGER_PAGE)
}

pub async fn redoc_handler() -> Html<&'static str> {
    Html(REDOC_PAGE)
}

// Hand written OpenAPI description of / and /query
pub fn openapi_document(state: &AppState) -> serde_json::Value {
    let quota = state.guard.limiter().describe_quota();

    serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "LLM Chat API",
            "description": format!("Gateway for the {} model", state.model),
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/": {
                "get": {
                    "summary": "Health check",
                    "responses": {
                        "200": {
                            "description": "Service is up",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Health" } } }
                        }
                    }
                }
            },
            "/query": {
                "post": {
                    "summary": "Send a prompt to the model",
                    "description": format!("Rate limited to {} per client", quota),
                    "security": [ { "ApiKey": [] } ],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/QueryRequest" } } }
                    },
                    "responses": {
                        "200": {
                            "description": "Model output",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/QueryResponse" } } }
                        },
                        "401": { "description": "Invalid API Key", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Detail" } } } },
                        "429": {
                            "description": "Rate limit exceeded",
                            "headers": { "Retry-After": { "schema": { "type": "integer" } } }
                        },
                        "500": { "description": "Inference failed", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Detail" } } } },
                        "503": { "description": "Inference workers unavailable" },
                        "504": { "description": "Inference timed out" }
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "ApiKey": { "type": "apiKey", "in": "header", "name": "X-Api-Key" }
            },
            "schemas": {
                "QueryRequest": {
                    "type": "object",
                    "required": ["prompt"],
                    "properties": { "prompt": { "type": "string" } }
                },
                "QueryResponse": {
                    "type": "object",
                    "required": ["response"],
                    "properties": { "response": { "type": "string" } }
                },
                "Detail": {
                    "type": "object",
                    "properties": { "detail": { "type": "string" } }
                },
                "Health": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" },
                        "service": { "type": "string" },
                        "model": { "type": "string" },
                        "environment": { "type": "string" },
                        "timestamp": { "type": "string", "format": "date-time" }
                    }
                }
            }
        }
    })
}

const SWAGGER_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<title>LLM Chat API - Swagger UI</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
</script>
</body>
</html>
"##;

const REDOC_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>LLM Chat API - ReDoc</title>
</head>
<body>
<redoc spec-url="/openapi.json"></redoc>
<script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>
"#;
