//! Scratch-directory file naming and cleanup.
//!
//! Temporary media is named `{kind}-{owner_id}-{unix_millis}.{ext}` so that
//! concurrent items never collide and leftovers for one owner can be found.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Build a namespaced scratch path under `dir`.
pub fn scratch_path(dir: impl AsRef<Path>, kind: &str, owner_id: &str, ext: &str) -> PathBuf {
    let ext = ext.trim_start_matches('.');
    let name = format!("{}-{}-{}.{}", kind, sanitize(owner_id), Utc::now().timestamp_millis(), ext);
    dir.as_ref().join(name)
}

/// Lowercase extension of `name`, defaulting to `mp4`.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "mp4".to_string())
}

fn sanitize(owner_id: &str) -> String {
    owner_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Delete scratch files of `kind` belonging to `owner_id`. Returns how many were removed.
pub async fn remove_scratch_files(dir: impl AsRef<Path>, kind: &str, owner_id: &str) -> usize {
    let prefix = format!("{}-{}-", kind, sanitize(owner_id));
    let mut entries = match tokio::fs::read_dir(dir.as_ref()).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.strip_prefix(&prefix).is_some_and(is_stamp_and_ext) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Removed stale scratch file {}", name);
                removed += 1;
            }
            Err(e) => warn!("Failed to remove scratch file {}: {}", name, e),
        }
    }
    removed
}

/// `{unix_millis}.{ext}`, the tail [`scratch_path`] appends after the owner.
fn is_stamp_and_ext(rest: &str) -> bool {
    let Some((stamp, ext)) = rest.split_once('.') else {
        return false;
    };
    !stamp.is_empty()
        && stamp.bytes().all(|b| b.is_ascii_digit())
        && !ext.is_empty()
        && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}
