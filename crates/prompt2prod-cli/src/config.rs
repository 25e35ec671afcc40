use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use prompt2prod_core::{ModelDefaults, UpstreamConfig};
use prompt2prod_core::config::{
    DEFAULT_CLOUD_MODEL, DEFAULT_GATEWAY_URL, DEFAULT_LOCAL_MODEL, DEFAULT_OLLAMA_HOST,
};
use prompt2prod_gateway::server::DEFAULT_MAX_BODY_BYTES;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt2ProdConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub models: ModelsSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamSection {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,
    #[serde(default = "default_registry_timeout_secs")]
    pub registry_timeout_secs: u64,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}
fn default_ollama_host() -> String {
    DEFAULT_OLLAMA_HOST.to_string()
}
fn default_generate_timeout_secs() -> u64 {
    180
}
fn default_registry_timeout_secs() -> u64 {
    10
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            ollama_host: default_ollama_host(),
            generate_timeout_secs: default_generate_timeout_secs(),
            registry_timeout_secs: default_registry_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsSection {
    #[serde(default = "default_local_model")]
    pub local_default: String,
    #[serde(default = "default_cloud_model")]
    pub cloud_default: String,
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}
fn default_cloud_model() -> String {
    DEFAULT_CLOUD_MODEL.to_string()
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            local_default: default_local_model(),
            cloud_default: default_cloud_model(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prompt2prod")
}

impl Prompt2ProdConfig {
    /// Load the config file (if any), then apply environment overrides.
    ///
    /// Unlike a missing default file, a missing `--config` path is an error.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let mut config = match custom_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_dir().join("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!("No config at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        // Expand environment variables before parsing
        let expanded = expand_env_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }

    /// Environment wins over the file
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("KGATEWAY_ENDPOINT").filter(|v| !v.is_empty()) {
            self.upstream.gateway_url = url;
        }
        if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
            self.upstream.ollama_host = host;
        }
        if let Some(port) = lookup("PROMPT2PROD_PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("PROMPT2PROD_PORT is not a valid port: {}", port))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_base_url("upstream.gateway_url", &self.upstream.gateway_url)?;
        validate_base_url("upstream.ollama_host", &self.upstream.ollama_host)?;
        if self.upstream.generate_timeout_secs == 0 || self.upstream.registry_timeout_secs == 0 {
            return Err(anyhow!("Upstream timeouts must be at least one second"));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.bind, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid bind address {}:{}",
                    self.server.bind, self.server.port
                )
            })
    }

    /// Immutable settings handed to the dispatcher and catalog
    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            gateway_url: self.upstream.gateway_url.clone(),
            ollama_host: self.upstream.ollama_host.clone(),
            generate_timeout: Duration::from_secs(self.upstream.generate_timeout_secs),
            registry_timeout: Duration::from_secs(self.upstream.registry_timeout_secs),
            models: ModelDefaults {
                local: self.models.local_default.clone(),
                cloud: self.models.cloud_default.clone(),
            },
        }
    }
}

fn validate_base_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .with_context(|| format!("{} is not a valid URL: {}", field, value))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("{} must use http or https, got '{}'", field, other)),
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &["KGATEWAY_ENDPOINT", "OLLAMA_HOST", "HOME", "USER"];

fn expand_env_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = lookup(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len(); // Skip past the expanded value
    }
    result
}
