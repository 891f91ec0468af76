//! Media tool abstraction used by the pipeline orchestrators.

use async_trait::async_trait;
use std::path::Path;

use crate::error::MediaResult;

/// Media operations the pipeline depends on.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Duration in milliseconds, or `None` when it cannot be determined.
    async fn probe_duration_ms(&self, path: &Path) -> Option<u64>;

    /// Write a copy of `input` cut to `[start_ms, end_ms)` without re-encoding.
    async fn trim(&self, input: &Path, output: &Path, start_ms: u64, end_ms: Option<u64>) -> MediaResult<()>;

    /// Write a single-frame still of `input`.
    async fn thumbnail(&self, input: &Path, output: &Path, duration_ms: Option<u64>) -> MediaResult<()>;
}

/// [`MediaTool`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    timeout_secs: u64,
}

impl FfmpegTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new(600)
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe_duration_ms(&self, path: &Path) -> Option<u64> {
        crate::probe::probe_duration_ms(path).await
    }

    async fn trim(&self, input: &Path, output: &Path, start_ms: u64, end_ms: Option<u64>) -> MediaResult<()> {
        crate::trim::trim(input, output, start_ms, end_ms, self.timeout_secs).await
    }

    async fn thumbnail(&self, input: &Path, output: &Path, duration_ms: Option<u64>) -> MediaResult<()> {
        crate::thumbnail::generate_thumbnail(input, output, duration_ms).await
    }
}
