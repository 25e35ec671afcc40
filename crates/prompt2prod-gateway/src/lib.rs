//! prompt2prod-gateway: HTTP surface of the prompt2prod API
//!
//! Serves `/`, `/health`, `/generate` and `/models` on top of the core
//! dispatcher and model catalog, and ships a mock upstream gateway for
//! running the API without any model server.

pub mod error;
pub mod mock;
pub mod protocol;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
