//! Thumbnail generation.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Width of generated thumbnails; height keeps the aspect ratio.
pub const THUMBNAIL_SCALE_WIDTH: u32 = 1280;

/// Frame grabbed for the thumbnail, in seconds.
pub const THUMBNAIL_TIMESTAMP_SECS: f64 = 1.0;

fn thumbnail_command(video_path: &Path, output_path: &Path, at_secs: f64) -> FfmpegCommand {
    FfmpegCommand::new(video_path, output_path)
        .seek(at_secs)
        .single_frame()
        .video_filter(format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH))
}

/// Generate a thumbnail from a video file.
///
/// Grabs the frame at [`THUMBNAIL_TIMESTAMP_SECS`], or the first frame for
/// media shorter than that.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    duration_ms: Option<u64>,
) -> MediaResult<()> {
    let at_secs = match duration_ms {
        Some(ms) if (ms as f64) / 1000.0 <= THUMBNAIL_TIMESTAMP_SECS => 0.0,
        _ => THUMBNAIL_TIMESTAMP_SECS,
    };
    let cmd = thumbnail_command(video_path.as_ref(), output_path.as_ref(), at_secs);
    FfmpegRunner::new().with_timeout(60).run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_command() {
        let args = thumbnail_command(Path::new("v.mp4"), Path::new("t.jpg"), 1.0).build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-ss 1.000 -i v.mp4"));
        assert!(joined.contains("-vframes 1"));
        assert!(joined.contains("scale=1280:-2"));
    }
}
