//! Results of LLM transcript analysis.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Publishing metadata suggested from a transcript.
///
/// Every field is optional; only the fields the model produced are persisted.
/// A field of the wrong type is treated as missing without discarding the
/// others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedMetadata {
    #[serde(default, deserialize_with = "lenient")]
    #[schemars(with = "Option<String>")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    #[schemars(with = "Option<String>")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    #[schemars(with = "Vec<String>")]
    pub tags: Vec<String>,
}

/// Decode `T`, falling back to its default when the value has another shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

impl GeneratedMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.tags.is_empty()
    }
}

/// Suggested start/end of the substantive content, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentBoundary {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl ContentBoundary {
    /// A boundary is usable when it is non-empty and fits the media.
    pub fn is_valid_for(&self, duration_ms: Option<u64>) -> bool {
        self.end_ms > self.start_ms && duration_ms.map_or(true, |d| self.end_ms <= d)
    }
}

/// A span of the transcript flagged as confidential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SensitiveSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_missing_fields() {
        let meta: GeneratedMetadata = serde_json::from_str(r#"{"title":"Hello"}"#).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert!(meta.tags.is_empty());
        assert!(!meta.is_empty());
    }

    #[test]
    fn test_metadata_keeps_fields_beside_an_ill_typed_one() {
        let meta: GeneratedMetadata =
            serde_json::from_str(r#"{"title":"Good title","description":"Desc","tags":"a, b"}"#).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Good title"));
        assert_eq!(meta.description.as_deref(), Some("Desc"));
        assert!(meta.tags.is_empty());

        let meta: GeneratedMetadata = serde_json::from_str(r#"{"title":42,"tags":["x"]}"#).unwrap();
        assert!(meta.title.is_none());
        assert_eq!(meta.tags, vec!["x".to_string()]);
    }

    #[test]
    fn test_boundary_validity() {
        let b = ContentBoundary { start_ms: 1000, end_ms: 9000 };
        assert!(b.is_valid_for(Some(10000)));
        assert!(!b.is_valid_for(Some(5000)));
        assert!(b.is_valid_for(None));
        assert!(!ContentBoundary { start_ms: 9000, end_ms: 9000 }.is_valid_for(None));
    }
}
