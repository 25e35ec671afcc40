//! Model catalog: a static cloud list plus the live local registry
//!
//! Listing never fails. When the local registry cannot be read the local list
//! is empty and the status says why.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::{UpstreamConfig, join_url};
use crate::error::UpstreamFailure;
use crate::transport::UpstreamTransport;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudModel {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub context_length: u32,
    pub pricing: Pricing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModel {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub size_gb: f64,
    pub modified: String,
    pub family: String,
    pub parameters: String,
}

/// Outcome of the local registry lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RegistryStatus {
    Available { count: usize },
    Error { error: String },
    Unreachable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLists {
    pub local: Vec<LocalModel>,
    pub cloud: Vec<CloudModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub total: usize,
    pub local_count: usize,
    pub cloud_count: usize,
    pub ollama_status: RegistryStatus,
}

/// Body of `GET /models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelListing {
    pub models: ModelLists,
    pub summary: CatalogSummary,
    pub usage: Value,
}

// ── Local registry wire format (`GET /api/tags`) ──

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_at: String,
    #[serde(default)]
    details: RegistryDetails,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryDetails {
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    parameter_size: Option<String>,
}

impl From<RegistryEntry> for LocalModel {
    fn from(entry: RegistryEntry) -> Self {
        Self {
            name: entry.name.replace(':', " "),
            description: format!("Local model {}", entry.name),
            size_gb: round_one_decimal(entry.size as f64 / BYTES_PER_GB),
            modified: entry.modified_at,
            family: entry.details.family.unwrap_or_else(|| "unknown".to_string()),
            parameters: entry
                .details
                .parameter_size
                .unwrap_or_else(|| "unknown".to_string()),
            provider: "ollama".to_string(),
            kind: "local".to_string(),
            id: entry.name,
        }
    }
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Fixed list of supported cloud models
pub fn cloud_models() -> Vec<CloudModel> {
    vec![
        CloudModel {
            id: "gpt-4o-mini".to_string(),
            name: "GPT-4o Mini".to_string(),
            provider: "openai".to_string(),
            kind: "cloud".to_string(),
            description: "Fast and cost-efficient OpenAI model".to_string(),
            context_length: 128_000,
            pricing: Pricing {
                input: 0.15,
                output: 0.60,
                unit: "$/1M tokens".to_string(),
            },
        },
        CloudModel {
            id: "gpt-3.5-turbo".to_string(),
            name: "GPT-3.5 Turbo".to_string(),
            provider: "openai".to_string(),
            kind: "cloud".to_string(),
            description: "Fast conversational OpenAI model".to_string(),
            context_length: 16_385,
            pricing: Pricing {
                input: 0.50,
                output: 1.50,
                unit: "$/1M tokens".to_string(),
            },
        },
    ]
}

fn usage_hints() -> Value {
    json!({
        "local": "Set mode='local' and model='model_id'",
        "cloud": "Set mode='cloud' and model='model_id'",
        "example": {
            "local": {"prompt": "Hello", "mode": "local", "model": "llama3.2:1b"},
            "cloud": {"prompt": "Hello", "mode": "cloud", "model": "gpt-4o-mini"}
        }
    })
}

/// Lists cloud and local models
#[derive(Clone)]
pub struct ModelCatalog {
    transport: Arc<dyn UpstreamTransport>,
    ollama_host: String,
    timeout: Duration,
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("ollama_host", &self.ollama_host)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelCatalog {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        ollama_host: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            ollama_host: ollama_host.into(),
            timeout,
        }
    }

    pub fn from_config(transport: Arc<dyn UpstreamTransport>, config: &UpstreamConfig) -> Self {
        Self::new(transport, config.ollama_host.clone(), config.registry_timeout)
    }

    /// Read the local registry, absorbing every failure into the status
    pub async fn local_models(&self) -> (Vec<LocalModel>, RegistryStatus) {
        let url = join_url(&self.ollama_host, "api/tags");
        debug!("Fetching local models from {}", url);

        let body = match self.transport.get_json(&url, self.timeout).await {
            Ok(body) => body,
            Err(UpstreamFailure::Http { status, .. }) => {
                warn!("Local model registry answered HTTP {}", status);
                return (
                    Vec::new(),
                    RegistryStatus::Error {
                        error: format!("HTTP {}", status),
                    },
                );
            }
            Err(failure) => {
                warn!("Local model registry unreachable: {}", failure);
                return (
                    Vec::new(),
                    RegistryStatus::Unreachable {
                        error: failure.to_string(),
                    },
                );
            }
        };

        match serde_json::from_value::<TagsResponse>(body) {
            Ok(tags) => {
                let models: Vec<LocalModel> =
                    tags.models.into_iter().map(LocalModel::from).collect();
                let status = RegistryStatus::Available {
                    count: models.len(),
                };
                (models, status)
            }
            Err(e) => {
                warn!("Local model registry sent an unreadable listing: {}", e);
                (
                    Vec::new(),
                    RegistryStatus::Unreachable {
                        error: format!("malformed registry response: {}", e),
                    },
                )
            }
        }
    }

    pub async fn listing(&self) -> ModelListing {
        let (local, ollama_status) = self.local_models().await;
        let cloud = cloud_models();

        ModelListing {
            summary: CatalogSummary {
                total: local.len() + cloud.len(),
                local_count: local.len(),
                cloud_count: cloud.len(),
                ollama_status,
            },
            models: ModelLists { local, cloud },
            usage: usage_hints(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn catalog(transport: Arc<ScriptedTransport>) -> ModelCatalog {
        ModelCatalog::new(transport, "http://localhost:11434", Duration::from_secs(10))
    }

    #[test]
    fn test_cloud_catalog_is_static() {
        let models = cloud_models();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "gpt-4o-mini");
        assert_eq!(models[0].context_length, 128_000);
        assert_eq!(models[1].id, "gpt-3.5-turbo");
        let json = serde_json::to_value(&models[0]).unwrap();
        assert_eq!(json["type"], "cloud");
        assert_eq!(json["pricing"]["unit"], "$/1M tokens");
    }

    #[tokio::test]
    async fn test_listing_with_registry_available() {
        let transport = Arc::new(ScriptedTransport::new().push_get(Ok(json!({
            "models": [{
                "name": "llama3.2:1b",
                "size": 1_073_741_824u64,
                "modified_at": "2024-01-01T00:00:00Z",
                "details": {"family": "llama", "parameter_size": "1B"}
            }]
        }))));
        let listing = catalog(transport.clone()).listing().await;

        assert_eq!(listing.models.local.len(), 1);
        let local = &listing.models.local[0];
        assert_eq!(local.id, "llama3.2:1b");
        assert_eq!(local.name, "llama3.2 1b");
        assert_eq!(local.size_gb, 1.0);
        assert_eq!(local.family, "llama");
        assert_eq!(local.parameters, "1B");
        assert_eq!(listing.summary.ollama_status, RegistryStatus::Available { count: 1 });
        assert_eq!(listing.summary.total, 3);
        assert_eq!(transport.calls()[0].url, "http://localhost:11434/api/tags");
        assert_eq!(transport.calls()[0].timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_registry_entry_without_details() {
        let transport = Arc::new(ScriptedTransport::new().push_get(Ok(json!({
            "models": [{
                "name": "mistral:7b-instruct",
                "size": 4_294_967_296u64,
                "modified_at": "x"
            }]
        }))));
        let (models, _) = catalog(transport).local_models().await;
        assert_eq!(models[0].family, "unknown");
        assert_eq!(models[0].parameters, "unknown");
        assert_eq!(models[0].size_gb, 4.0);
    }

    #[tokio::test]
    async fn test_listing_registry_unreachable() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .push_get(Err(UpstreamFailure::unexpected("connection refused"))),
        );
        let listing = catalog(transport).listing().await;

        assert!(listing.models.local.is_empty());
        assert_eq!(listing.models.cloud.len(), 2);
        let status = serde_json::to_value(&listing.summary.ollama_status).unwrap();
        assert_eq!(status["status"], "unreachable");
        assert!(status["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_listing_registry_timeout_is_unreachable() {
        let transport = Arc::new(ScriptedTransport::new().push_get(Err(UpstreamFailure::Timeout)));
        let (models, status) = catalog(transport).local_models().await;
        assert!(models.is_empty());
        assert!(matches!(status, RegistryStatus::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_listing_registry_http_error() {
        let transport = Arc::new(ScriptedTransport::new().push_get(Err(UpstreamFailure::Http {
            status: 500,
            body: "boom".to_string(),
        })));
        let (_, status) = catalog(transport).local_models().await;
        assert_eq!(
            status,
            RegistryStatus::Error {
                error: "HTTP 500".to_string()
            }
        );
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, json!({"status": "error", "error": "HTTP 500"}));
    }

    #[tokio::test]
    async fn test_listing_registry_malformed() {
        let transport = Arc::new(
            ScriptedTransport::new().push_get(Ok(json!({"models": [{"size": "huge"}]}))),
        );
        let (models, status) = catalog(transport).local_models().await;
        assert!(models.is_empty());
        assert!(matches!(status, RegistryStatus::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_listing_usage_hints() {
        let transport = Arc::new(ScriptedTransport::new().push_get(Ok(json!({"models": []}))));
        let listing = catalog(transport).listing().await;
        assert_eq!(listing.usage["example"]["local"]["mode"], "local");
        assert_eq!(listing.summary.ollama_status, RegistryStatus::Available { count: 0 });
    }
}
