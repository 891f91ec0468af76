//! FFprobe duration probing.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file's duration in milliseconds.
///
/// Returns `None` when the tool is missing or fails, or when its output has no
/// usable duration. Never errors.
pub async fn probe_duration_ms(path: impl AsRef<Path>) -> Option<u64> {
    let path = path.as_ref();
    if !path.exists() || check_ffprobe().is_err() {
        return None;
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_entries",
            "format=duration",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        debug!(path = %path.display(), "ffprobe exited with {}", output.status);
        return None;
    }

    parse_duration_ms(&output.stdout)
}

/// Extract `format.duration` (seconds, as a string) from FFprobe JSON.
fn parse_duration_ms(stdout: &[u8]) -> Option<u64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout).ok()?;
    let secs: f64 = probe.format?.duration?.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = br#"{"format":{"duration":"63.480000"}}"#;
        assert_eq!(parse_duration_ms(json), Some(63480));
    }

    #[test]
    fn test_parse_duration_missing_or_garbage() {
        assert_eq!(parse_duration_ms(b""), None);
        assert_eq!(parse_duration_ms(br#"{"format":{}}"#), None);
        assert_eq!(parse_duration_ms(br#"{"format":{"duration":"N/A"}}"#), None);
        assert_eq!(parse_duration_ms(br#"{}"#), None);
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_none() {
        assert_eq!(probe_duration_ms("/definitely/not/here.mp4").await, None);
    }
}
