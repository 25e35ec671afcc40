//! Immutable runtime configuration shared by every request

use std::time::Duration;

use crate::types::Mode;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_CLOUD_MODEL: &str = "gpt-4o-mini";

/// Generation calls wait on model inference, so the ceiling is minutes
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(180);
/// Metadata calls (local model registry)
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);

/// Model used when a request omits one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefaults {
    pub local: String,
    pub cloud: String,
}

impl ModelDefaults {
    pub fn for_mode(&self, mode: Mode) -> &str {
        match mode {
            Mode::Local => &self.local,
            Mode::Cloud => &self.cloud,
        }
    }
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            local: DEFAULT_LOCAL_MODEL.to_string(),
            cloud: DEFAULT_CLOUD_MODEL.to_string(),
        }
    }
}

/// Upstream endpoints and timeouts, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL of the gateway exposing `/ollama` and `/openai`
    pub gateway_url: String,
    /// Base URL of the local model registry (`/api/tags`)
    pub ollama_host: String,
    pub generate_timeout: Duration,
    pub registry_timeout: Duration,
    pub models: ModelDefaults,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
            registry_timeout: DEFAULT_REGISTRY_TIMEOUT,
            models: ModelDefaults::default(),
        }
    }
}

/// Join a base URL and a path without doubling the slash
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
