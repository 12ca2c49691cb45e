//! HTTP service for the movie score model.
//!
//! This crate provides:
//! - Environment-driven configuration
//! - Request validation against the model metadata
//! - `/health`, `/meta`, `/predict` and `/admin/reload` handlers
//! - Shared model state with atomic hot reload

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, LoadedModel, Prediction};
pub use validation::PredictRequest;
