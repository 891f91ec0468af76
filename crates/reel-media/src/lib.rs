//! FFmpeg CLI adapter and caption tooling.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - Duration probing via FFprobe
//! - Copy-mode trimming and frame extraction
//! - SRT caption resynchronization for trimmed media
//! - Namespaced scratch file naming

pub mod captions;
pub mod command;
pub mod error;
pub mod probe;
pub mod scratch;
pub mod thumbnail;
pub mod tool;
pub mod trim;

pub use captions::{cue_count, shift_captions, window_captions};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration_ms;
pub use scratch::{extension_of, remove_scratch_files, scratch_path};
pub use thumbnail::generate_thumbnail;
pub use tool::{FfmpegTool, MediaTool};
pub use trim::trim;
