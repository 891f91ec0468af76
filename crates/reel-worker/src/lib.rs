//! Background pipeline for ReelPress.
//!
//! This crate provides:
//! - The ingest worker that drains the cloud import queue one item at a time
//! - The video processing orchestrator (probe, transcribe, metadata)
//! - The publish orchestrator (trim, caption resync, multipart submission)
//! - Clip derivation and LLM transcript analyzers

pub mod analyzers;
pub mod clips;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod processor;
pub mod publish;

#[cfg(test)]
mod test_support;

pub use clips::{create_clip, ClipRequest};
pub use config::WorkerConfig;
pub use context::PipelineContext;
pub use error::{WorkerError, WorkerResult};
pub use ingest::IngestWorker;
pub use logging::JobLogger;
pub use metadata::spawn_metadata;
pub use processor::{ProcessedVideo, VideoProcessor};
pub use publish::{PublishOrchestrator, PublishRequest};
