//! Cloudflare R2 storage for ReelPress.
//!
//! The transcription service fetches media over HTTP, so local files are
//! pushed to R2 and handed over as short-lived presigned URLs.

pub mod client;
pub mod error;
pub mod resolver;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use resolver::{content_type_for, media_key, FileUrlResolver, MediaUrlResolver, R2MediaUrls};
