//! Shared data models for the ReelPress pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Videos and their editing/publishing lifecycle
//! - Cloud import requests and their queue lifecycle
//! - Cloud-storage connections and listings
//! - LLM analysis results (metadata, content boundaries, sensitive segments)
//!
//! Status enums carry exhaustive transition tables. Every persisted status
//! change goes through [`VideoUpdate::apply`] or [`ImportUpdate::apply`].

pub mod analysis;
pub mod cloud;
pub mod error;
pub mod import;
pub mod video;

pub use analysis::{ContentBoundary, GeneratedMetadata, SensitiveSegment};
pub use cloud::{CloudConnection, CloudFile, CloudProvider};
pub use error::{ModelError, ModelResult};
pub use import::{ImportRequest, ImportRequestId, ImportStatus, ImportUpdate};
pub use video::{PlatformRef, TrimRange, Video, VideoId, VideoSource, VideoStatus, VideoUpdate};
