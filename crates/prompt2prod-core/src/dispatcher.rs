//! Dispatcher: defaults, one upstream call, normalization
//!
//! Per request: `Received → Routing → AwaitingUpstream → Normalizing →
//! Completed`, or `Failed` when the adapter reports an [`UpstreamFailure`].
//! Nothing loops back and nothing is retried.

use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::adapter::UpstreamAdapter;
use crate::config::{ModelDefaults, UpstreamConfig};
use crate::error::UpstreamFailure;
use crate::normalizer;
use crate::transport::UpstreamTransport;
use crate::types::{GenerationRequest, GenerationResult, Mode};

/// A request after defaults have been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub mode: Mode,
    pub model: String,
    pub prompt: String,
}

/// Stateless across requests; safe to share behind an `Arc`
#[derive(Debug, Clone)]
pub struct Dispatcher {
    adapter: UpstreamAdapter,
    defaults: ModelDefaults,
}

impl Dispatcher {
    pub fn new(adapter: UpstreamAdapter, defaults: ModelDefaults) -> Self {
        Self { adapter, defaults }
    }

    pub fn from_config(transport: Arc<dyn UpstreamTransport>, config: &UpstreamConfig) -> Self {
        let adapter = UpstreamAdapter::new(
            transport,
            config.gateway_url.clone(),
            config.generate_timeout,
        );
        Self::new(adapter, config.models.clone())
    }

    /// Apply defaults: cloud mode, then the mode's default model.
    /// A blank model name counts as absent.
    pub fn resolve(&self, request: GenerationRequest) -> ResolvedRequest {
        let mode = request.mode.unwrap_or_default();
        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.defaults.for_mode(mode).to_string());
        ResolvedRequest {
            mode,
            model,
            prompt: request.prompt,
        }
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, UpstreamFailure> {
        let resolved = self.resolve(request);
        let span = info_span!(
            "generate",
            request_id = %Uuid::new_v4(),
            mode = %resolved.mode,
            model = %resolved.model,
        );

        async move {
            debug!("Routing request to {}", self.adapter.route(resolved.mode));

            let body = match self
                .adapter
                .call(resolved.mode, &resolved.prompt, &resolved.model)
                .await
            {
                Ok(body) => body,
                Err(failure) => {
                    warn!("Generation failed: {}", failure);
                    return Err(failure);
                }
            };

            let normalized = normalizer::normalize(&body);
            info!(
                "Generation completed (provider: {}, {} chars)",
                normalized.provider,
                normalized.text.chars().count()
            );

            Ok(GenerationResult {
                text: normalized.text,
                model: resolved.model,
                provider: normalized.provider,
                mode: resolved.mode,
            })
        }
        .instrument(span)
        .await
    }

    pub fn defaults(&self) -> &ModelDefaults {
        &self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::types::Provider;
    use serde_json::json;

    fn dispatcher(transport: Arc<ScriptedTransport>) -> Dispatcher {
        let config = UpstreamConfig {
            gateway_url: "http://kgateway:80".to_string(),
            ..UpstreamConfig::default()
        };
        Dispatcher::from_config(transport, &config)
    }

    #[test]
    fn test_resolve_defaults_to_cloud() {
        let d = dispatcher(Arc::new(ScriptedTransport::new()));
        let resolved = d.resolve(GenerationRequest::new("hi"));
        assert_eq!(resolved.mode, Mode::Cloud);
        assert_eq!(resolved.model, "gpt-4o-mini");

        // Resolving an already-resolved request changes nothing
        let again = d.resolve(
            GenerationRequest::new("hi")
                .with_mode(resolved.mode)
                .with_model(resolved.model.clone()),
        );
        assert_eq!(again, resolved);
    }

    #[test]
    fn test_resolve_local_default_model() {
        let d = dispatcher(Arc::new(ScriptedTransport::new()));
        let resolved = d.resolve(GenerationRequest::new("hi").with_mode(Mode::Local));
        assert_eq!(resolved.model, "llama3.2:1b");
    }

    #[test]
    fn test_resolve_keeps_caller_model() {
        let d = dispatcher(Arc::new(ScriptedTransport::new()));
        let resolved = d.resolve(
            GenerationRequest::new("hi")
                .with_mode(Mode::Local)
                .with_model("mistral:7b-instruct"),
        );
        assert_eq!(resolved.model, "mistral:7b-instruct");
    }

    #[test]
    fn test_resolve_blank_model_uses_default() {
        let d = dispatcher(Arc::new(ScriptedTransport::new()));
        let resolved = d.resolve(GenerationRequest::new("hi").with_model("  "));
        assert_eq!(resolved.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_generate_cloud_success() {
        let transport = Arc::new(ScriptedTransport::new().push_post(Ok(json!({
            "choices": [{"message": {"content": "print('Hello World!')"}}],
            "model": "gpt-4o-mini-2024-07-18"
        }))));
        let d = dispatcher(transport.clone());

        let result = d
            .generate(GenerationRequest::new("Create a hello world").with_model("gpt-4o-mini"))
            .await
            .unwrap();
        assert_eq!(result.text, "print('Hello World!')");
        assert_eq!(result.provider, Provider::OpenAi);
        assert_eq!(result.mode, Mode::Cloud);
        // Model echoes the request, not the upstream body
        assert_eq!(result.model, "gpt-4o-mini");
        assert_eq!(transport.calls()[0].url, "http://kgateway:80/openai");
    }

    #[tokio::test]
    async fn test_generate_local_with_choices_reports_openai() {
        let transport = Arc::new(ScriptedTransport::new().push_post(Ok(json!({
            "choices": [{"message": {"content": "# Python Hello World"}}]
        }))));
        let d = dispatcher(transport.clone());

        let result = d
            .generate(GenerationRequest::new("hi").with_mode(Mode::Local))
            .await
            .unwrap();
        assert_eq!(result.text, "# Python Hello World");
        assert_eq!(result.provider, Provider::OpenAi);
        assert_eq!(result.mode, Mode::Local);
        assert_eq!(transport.calls()[0].url, "http://kgateway:80/ollama");
    }

    #[tokio::test]
    async fn test_generate_flat_under_cloud_reports_ollama() {
        let transport =
            Arc::new(ScriptedTransport::new().push_post(Ok(json!({"response": "flat text"}))));
        let d = dispatcher(transport);

        let result = d.generate(GenerationRequest::new("hi")).await.unwrap();
        assert_eq!(result.provider, Provider::Ollama);
        assert_eq!(result.mode, Mode::Cloud);
    }

    #[tokio::test]
    async fn test_generate_failure_passes_through() {
        let transport =
            Arc::new(ScriptedTransport::new().push_post(Err(UpstreamFailure::Timeout)));
        let d = dispatcher(transport.clone());

        let err = d.generate(GenerationRequest::new("hi")).await.unwrap_err();
        assert_eq!(err, UpstreamFailure::Timeout);
        assert_eq!(transport.calls().len(), 1);
    }
}
