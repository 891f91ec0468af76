//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often the ingest worker looks for queued imports
    pub poll_interval: Duration,
    /// Scratch directory for downloads, trims, clips and thumbnails
    pub work_dir: PathBuf,
    pub download_timeout: Duration,
    pub publish_timeout: Duration,
    /// Language hint sent to the transcription service
    pub transcription_language: String,
    /// Transcript prefix length given to the LLM
    pub metadata_transcript_chars: usize,
    /// Privacy used when a publish request does not name one
    pub default_privacy: String,
    /// Lifetime of presigned media URLs
    pub media_url_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            work_dir: PathBuf::from("/tmp/reelpress"),
            download_timeout: Duration::from_secs(600), // 10 minutes
            publish_timeout: Duration::from_secs(900),  // 15 minutes
            transcription_language: "en".to_string(),
            metadata_transcript_chars: 6000,
            default_privacy: "private".to_string(),
            media_url_ttl: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("INGEST_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(5),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/reelpress")),
            download_timeout: Duration::from_secs(
                std::env::var("DOWNLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            publish_timeout: Duration::from_secs(
                std::env::var("PUBLISH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
            transcription_language: std::env::var("TRANSCRIPTION_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            metadata_transcript_chars: std::env::var("METADATA_TRANSCRIPT_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6000),
            default_privacy: std::env::var("PUBLISH_DEFAULT_PRIVACY").unwrap_or_else(|_| "private".to_string()),
            media_url_ttl: Duration::from_secs(
                std::env::var("MEDIA_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "INGEST_POLL_INTERVAL_SECS",
        "WORKER_WORK_DIR",
        "DOWNLOAD_TIMEOUT_SECS",
        "PUBLISH_DEFAULT_PRIVACY",
    ];

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        for var in VARS {
            std::env::remove_var(var);
        }
        let config = WorkerConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.download_timeout, Duration::from_secs(600));
        assert_eq!(config.publish_timeout, Duration::from_secs(900));
        assert_eq!(config.default_privacy, "private");
    }

    #[test]
    #[serial]
    fn test_overrides_and_bad_values() {
        std::env::set_var("INGEST_POLL_INTERVAL_SECS", "0");
        std::env::set_var("DOWNLOAD_TIMEOUT_SECS", "abc");
        std::env::set_var("WORKER_WORK_DIR", "/var/tmp/reels");
        let config = WorkerConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.download_timeout, Duration::from_secs(600));
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/reels"));
        for var in VARS {
            std::env::remove_var(var);
        }
    }
}
