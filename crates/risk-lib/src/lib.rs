//! Core library for health risk prediction
//!
//! This crate provides:
//! - The feature schema mapping each condition to the measurements it needs
//! - Artifact naming, storage backends and a caching model store
//! - Classifier families (ONNX and native JSON artifacts)
//! - The prediction dispatcher producing a per-target, per-family result table
//! - Input validation, health checks and observability

pub mod dispatch;
pub mod error;
pub mod health;
pub mod input;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod resolver;
pub mod schema;
pub mod store;

pub use dispatch::{ArtifactCoverage, CoverageEntry, Dispatcher};
pub use error::{DispatchError, InputError, LoadError, PredictionError, SchemaError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use input::{FeatureRecord, FeatureValues};
pub use models::*;
pub use observability::{RiskMetrics, StructuredLogger};
pub use predictor::{ArtifactFormat, Classifier, ModelFamily};
pub use resolver::{ModelKey, ModelResolver};
pub use schema::{FeatureSchema, TargetSpec};
pub use store::{ArtifactStore, FsBackend, MemoryBackend, ModelStore};
