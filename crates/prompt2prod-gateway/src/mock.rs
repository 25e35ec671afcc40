//! Mock upstream gateway for local development and integration tests
//!
//! Serves `/openai` and `/ollama` with canned, prompt-driven answers in the
//! choices shape, so the API can run end to end without any model server.

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use prompt2prod_core::ChatMessage;

/// Chat payload as the mock accepts it; sampling fields are optional
#[derive(Debug, Clone, Deserialize)]
pub struct MockChatRequest {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MockChoice {
    pub message: ChatMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MockChatResponse {
    pub choices: Vec<MockChoice>,
    pub model: String,
    pub usage: Value,
}

impl MockChatRequest {
    fn last_prompt(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

fn head(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Canned cloud answer chosen by prompt keywords
pub fn cloud_reply(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    if lower.contains("python") {
        concat!(
            "def hello_world():\n",
            "    '''Simple Python function that returns Hello World'''\n",
            "    return \"Hello, World!\"\n",
            "\n",
            "print(hello_world())",
        )
        .to_string()
    } else if lower.contains("hello") {
        "print('Hello World!')".to_string()
    } else if lower.contains("function") {
        concat!(
            "def example_function():\n",
            "    '''Example function for testing'''\n",
            "    return \"This is a test function\"\n",
            "\n",
            "# Call the function\n",
            "result = example_function()\n",
            "print(result)",
        )
        .to_string()
    } else {
        format!("Mock response for: {}...", head(prompt, 50))
    }
}

/// Canned local answer, shorter than the cloud one
pub fn local_reply(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    if lower.contains("python") {
        "# Python Hello World\nprint(\"Hello from Ollama!\")".to_string()
    } else if lower.contains("function") {
        "def test_func():\n    return \"Local AI response\"\n\ntest_func()".to_string()
    } else {
        format!("Local model response: {}...", head(prompt, 30))
    }
}

fn chat_response(model: String, content: String) -> MockChatResponse {
    MockChatResponse {
        choices: vec![MockChoice {
            message: ChatMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: "stop".to_string(),
        }],
        model,
        usage: json!({"prompt_tokens": 10, "completion_tokens": 50, "total_tokens": 60}),
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "mock-kgateway"}))
}

async fn openai_handler(Json(req): Json<MockChatRequest>) -> Json<MockChatResponse> {
    debug!("Mock /openai request for model {}", req.model);
    let content = cloud_reply(req.last_prompt());
    Json(chat_response(req.model, content))
}

async fn ollama_handler(Json(req): Json<MockChatRequest>) -> Json<MockChatResponse> {
    debug!("Mock /ollama request for model {}", req.model);
    let content = local_reply(req.last_prompt());
    Json(chat_response(req.model, content))
}

/// Router of the mock gateway
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/openai", post(openai_handler))
        .route("/ollama", post(ollama_handler))
}

/// Serve the mock gateway until `shutdown` is cancelled
pub async fn serve(bind: SocketAddr, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Mock gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
