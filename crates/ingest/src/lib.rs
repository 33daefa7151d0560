//! Alert Ingestion
//!
//! Runs one inbound batch through normalize -> persist -> notify and
//! aggregates the per-alert outcomes.

mod config;
mod pipeline;
mod result;

pub use config::PipelineConfig;
pub use pipeline::IngestionPipeline;
pub use result::{AlertError, BatchResult, ErrorKind};

use thiserror::Error;

/// Errors while assembling a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Notification destination is not configured")]
    MissingDestination,
    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),
}
