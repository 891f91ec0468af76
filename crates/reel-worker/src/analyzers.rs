//! LLM transcript analyzers.
//!
//! Each analyzer builds a prompt, asks the completion client, and decodes the
//! first JSON object in the reply. Results that fail validation are dropped
//! rather than persisted.

use reel_models::{ContentBoundary, GeneratedMetadata, SensitiveSegment};
use reel_services::{parse_json_reply, CompletionClient};
use serde::Deserialize;
use tracing::debug;

use crate::error::WorkerResult;

/// At most `max_chars` characters of `transcript`, cut on a char boundary.
pub fn transcript_excerpt(transcript: &str, max_chars: usize) -> &str {
    match transcript.char_indices().nth(max_chars) {
        Some((idx, _)) => &transcript[..idx],
        None => transcript,
    }
}

fn metadata_prompt(excerpt: &str) -> String {
    format!(
        r#"You write publishing metadata for a video from its transcript.

Return ONLY a single JSON object with this schema:
{{
  "title": "Compelling title, at most 100 characters",
  "description": "Two or three sentences describing the video",
  "tags": ["up to 10 short keywords"]
}}

TRANSCRIPT:
{excerpt}
"#
    )
}

fn boundary_prompt(excerpt: &str, duration_ms: Option<u64>) -> String {
    let duration = duration_ms
        .map(|ms| format!("The video is {} ms long.", ms))
        .unwrap_or_default();
    format!(
        r#"The transcript below may include small talk, setup or sign-off around the main content.
Find where the substantive content starts and ends. {duration}

Return ONLY a single JSON object with this schema:
{{
  "start_ms": 0,
  "end_ms": 0
}}

Use the cue timestamps in the transcript. Both values are milliseconds from the start of the video.

TRANSCRIPT:
{excerpt}
"#
    )
}

fn confidentiality_prompt(transcript: &str) -> String {
    format!(
        r#"Review this transcript for confidential material that should not be published:
personal contact details, financial figures, client names, credentials, unreleased plans.

Return ONLY a single JSON object with this schema:
{{
  "segments": [
    {{"start_ms": 0, "end_ms": 0, "reason": "What is sensitive"}}
  ]
}}

Return an empty list when nothing is sensitive.

TRANSCRIPT:
{transcript}
"#
    )
}

/// Title, description and tags for a transcript.
pub async fn generate_metadata(
    llm: &dyn CompletionClient,
    transcript: &str,
    max_chars: usize,
) -> WorkerResult<GeneratedMetadata> {
    let reply = llm
        .complete(&metadata_prompt(transcript_excerpt(transcript, max_chars)))
        .await?;
    Ok(parse_json_reply(&reply)?)
}

/// Suggested trim points, or `None` when the suggestion does not fit the media.
pub async fn content_boundary(
    llm: &dyn CompletionClient,
    transcript: &str,
    max_chars: usize,
    duration_ms: Option<u64>,
) -> WorkerResult<Option<ContentBoundary>> {
    let reply = llm
        .complete(&boundary_prompt(transcript_excerpt(transcript, max_chars), duration_ms))
        .await?;
    let boundary: ContentBoundary = parse_json_reply(&reply)?;
    if boundary.is_valid_for(duration_ms) {
        Ok(Some(boundary))
    } else {
        debug!(?boundary, ?duration_ms, "Discarding invalid content boundary");
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct SegmentsReply {
    #[serde(default)]
    segments: Vec<SensitiveSegment>,
}

/// Transcript spans the LLM flags as confidential. Empty spans are dropped.
pub async fn confidential_segments(
    llm: &dyn CompletionClient,
    transcript: &str,
) -> WorkerResult<Vec<SensitiveSegment>> {
    let reply = llm.complete(&confidentiality_prompt(transcript)).await?;
    let parsed: SegmentsReply = parse_json_reply(&reply)?;
    Ok(parsed
        .segments
        .into_iter()
        .filter(|s| s.end_ms > s.start_ms)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeLlm;

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(transcript_excerpt("héllo", 2), "hé");
        assert_eq!(transcript_excerpt("short", 100), "short");
    }

    #[tokio::test]
    async fn test_metadata_parses_partial_reply() {
        let llm = FakeLlm::replying(|_| Ok("Sure! {\"title\": \"Quarterly recap\"} Hope that helps".into()));
        let meta = generate_metadata(&llm, "transcript", 100).await.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Quarterly recap"));
        assert!(meta.tags.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_keeps_good_fields_when_one_is_malformed() {
        let llm = FakeLlm::replying(|_| Ok(r#"{"title":"Good title","description":"Desc","tags":"a, b"}"#.into()));
        let meta = generate_metadata(&llm, "transcript", 100).await.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Good title"));
        assert_eq!(meta.description.as_deref(), Some("Desc"));
        assert!(meta.tags.is_empty());
    }

    #[tokio::test]
    async fn test_boundary_outside_duration_is_dropped() {
        let llm = FakeLlm::replying(|_| Ok("{\"start_ms\": 1000, \"end_ms\": 90000}".into()));
        assert_eq!(content_boundary(&llm, "t", 100, Some(60_000)).await.unwrap(), None);
        assert_eq!(
            content_boundary(&llm, "t", 100, Some(120_000)).await.unwrap(),
            Some(ContentBoundary {
                start_ms: 1000,
                end_ms: 90000
            })
        );
    }

    #[tokio::test]
    async fn test_inverted_boundary_is_dropped() {
        let llm = FakeLlm::replying(|_| Ok("{\"start_ms\": 5000, \"end_ms\": 5000}".into()));
        assert_eq!(content_boundary(&llm, "t", 100, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_confidential_segments_filter_empty_spans() {
        let llm = FakeLlm::replying(|_| {
            Ok(r#"{"segments": [
                {"start_ms": 1000, "end_ms": 4000, "reason": "phone number"},
                {"start_ms": 9000, "end_ms": 9000, "reason": "empty"}
            ]}"#
            .into())
        });
        let segments = confidential_segments(&llm, "t").await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].reason, "phone number");
    }

    #[tokio::test]
    async fn test_reply_without_json_is_an_error() {
        let llm = FakeLlm::replying(|_| Ok("I cannot help with that.".into()));
        assert!(confidential_segments(&llm, "t").await.is_err());
    }
}
