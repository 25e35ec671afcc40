//! prompt2prod-core - routing and normalization for the prompt2prod API
//!
//! This crate provides:
//! - Upstream adapter that sends one chat payload to the gateway's `/ollama` or `/openai` route
//! - Response normalizer that infers the answering provider from the body's shape
//! - Dispatcher that applies request defaults and ties the two together
//! - Model catalog combining a static cloud list with the live local registry
//! - A transport trait so all outbound HTTP can be replaced in tests

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod normalizer;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types for convenience
pub use adapter::{ChatMessage, ChatPayload, UpstreamAdapter};
pub use catalog::{ModelCatalog, ModelListing, RegistryStatus};
pub use config::{ModelDefaults, UpstreamConfig};
pub use dispatcher::{Dispatcher, ResolvedRequest};
pub use error::UpstreamFailure;
pub use normalizer::{Normalized, UpstreamShape, normalize};
pub use transport::{ReqwestTransport, UpstreamTransport};
pub use types::{GenerationRequest, GenerationResult, Mode, Provider};
