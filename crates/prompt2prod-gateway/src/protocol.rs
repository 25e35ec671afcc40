//! JSON bodies of the HTTP API that are not core types

use serde::{Deserialize, Serialize};

/// Name reported by `GET /`
pub const APP_NAME: &str = "Prompt2Prod API";

/// `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootStatus {
    pub message: String,
    pub status: String,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl RootStatus {
    pub fn running(app_name: &str) -> Self {
        Self {
            message: app_name.to_string(),
            status: "running".to_string(),
        }
    }
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
