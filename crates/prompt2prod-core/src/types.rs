//! Shared types for prompt2prod-core

use serde::{Deserialize, Serialize};

/// Prompt used when the caller does not send one
pub const DEFAULT_PROMPT: &str = "Create a Python hello world script";

/// Routing hint chosen by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Locally hosted model server behind the gateway's `/ollama` route
    Local,
    /// Cloud provider behind the gateway's `/openai` route
    #[default]
    Cloud,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode string is neither `local` nor `cloud`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized mode '{0}' (expected 'local' or 'cloud')")]
pub struct UnknownMode(pub String);

impl std::str::FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Identity of the backend that produced the text, inferred from response shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAi,
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Absent or `null` means cloud; any other string is rejected at decode time
    #[serde(default)]
    pub mode: Option<Mode>,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

/// Canonical result returned for every successful generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationResult {
    #[serde(rename = "response")]
    pub text: String,
    pub model: String,
    pub provider: Provider,
    pub mode: Mode,
}
