//! Upstream adapter: one mode-specific call through the gateway

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::join_url;
use crate::error::UpstreamFailure;
use crate::transport::UpstreamTransport;
use crate::types::Mode;

pub const MAX_TOKENS: u32 = 4000;
pub const TEMPERATURE: f32 = 0.7;

/// Message in the chat payload sent to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completions payload; both routes take the same shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

/// Sends exactly one POST per call and never retries.
///
/// The adapter does not know which concrete backend sits behind `/ollama` or
/// `/openai`, and it does not look inside successful bodies.
#[derive(Clone)]
pub struct UpstreamAdapter {
    transport: Arc<dyn UpstreamTransport>,
    gateway_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for UpstreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamAdapter")
            .field("transport", &"<dyn UpstreamTransport>")
            .field("gateway_url", &self.gateway_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl UpstreamAdapter {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        gateway_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            gateway_url: gateway_url.into(),
            timeout,
        }
    }

    /// Gateway route for a mode
    pub fn route(&self, mode: Mode) -> String {
        let path = match mode {
            Mode::Local => "ollama",
            Mode::Cloud => "openai",
        };
        join_url(&self.gateway_url, path)
    }

    pub fn payload(prompt: &str, model: &str) -> ChatPayload {
        ChatPayload {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            stream: false,
        }
    }

    /// Issue the call and hand back the raw upstream JSON
    pub async fn call(
        &self,
        mode: Mode,
        prompt: &str,
        model: &str,
    ) -> Result<Value, UpstreamFailure> {
        let endpoint = self.route(mode);
        let payload = serde_json::to_value(Self::payload(prompt, model))
            .map_err(|e| UpstreamFailure::unexpected(format!("failed to encode payload: {}", e)))?;

        debug!(
            "POST {} (mode: {}, model: {}, prompt: {} chars)",
            endpoint,
            mode,
            model,
            prompt.chars().count()
        );

        self.transport
            .post_json(&endpoint, &payload, self.timeout)
            .await
    }
}
