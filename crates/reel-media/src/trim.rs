//! Copy-mode trimming.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build the trim command: seek to `start_ms`, optionally bound the length to
/// `end_ms - start_ms`, and copy streams without re-encoding.
pub fn trim_command(
    input: &Path,
    output: &Path,
    start_ms: u64,
    end_ms: Option<u64>,
) -> MediaResult<FfmpegCommand> {
    let mut cmd = FfmpegCommand::new(input, output).seek(start_ms as f64 / 1000.0);
    if let Some(end_ms) = end_ms {
        if end_ms <= start_ms {
            return Err(MediaError::invalid_range(format!(
                "end {}ms is not after start {}ms",
                end_ms, start_ms
            )));
        }
        cmd = cmd.duration((end_ms - start_ms) as f64 / 1000.0);
    }
    Ok(cmd.codec_copy())
}

/// Write a trimmed copy of `input` to `output`.
pub async fn trim(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_ms: u64,
    end_ms: Option<u64>,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = trim_command(input, output, start_ms, end_ms)?;

    info!(
        "Trimming {} -> {} (start: {}ms, end: {:?})",
        input.display(),
        output.display(),
        start_ms,
        end_ms
    );

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await
}
