//! HTTP clients for the services the pipeline talks to.
//!
//! Each service sits behind a trait so orchestrators can be exercised
//! against fakes:
//! - [`Transcriber`]: speech-to-text returning captions and/or text
//! - [`CompletionClient`]: Gemini `generateContent` with model fallback
//! - [`Publisher`]: multipart submission to the hosting platform
//! - [`CloudStorageClient`]: Dropbox listing and temporary download links

pub mod dropbox;
pub mod error;
pub mod gemini;
mod http;
pub mod publisher;
pub mod transcription;

pub use dropbox::{CloudStorageClient, DropboxClient, DropboxConfig};
pub use error::{ServiceError, ServiceResult};
pub use gemini::{extract_json_object, parse_json_reply, CompletionClient, GeminiClient, GeminiConfig};
pub use publisher::{PublishClient, PublishConfig, PublishSubmission, PublishedVideo, Publisher, ThumbnailSource};
pub use transcription::{HttpTranscriber, Transcriber, Transcription, TranscriptionConfig};
