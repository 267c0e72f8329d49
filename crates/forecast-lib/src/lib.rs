//! Inventory reorder forecasting
//!
//! This crate provides the core functionality for:
//! - Catalog access with a synthetic fallback
//! - Feature extraction and labelling of inventory records
//! - Training and inference of a small reorder classifier
//! - Pipeline orchestration with status tracking
//! - Health checks and observability

pub mod catalog;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;

pub use error::{Operation, PipelineError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use pipeline::{
    LoadOutcome, OrchestratorConfig, PipelineOrchestrator, PipelineSnapshot, PipelineStatus,
};
