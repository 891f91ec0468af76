//! Cloud-storage connection and listing models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported cloud-storage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    #[default]
    Dropbox,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Dropbox => "dropbox",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dropbox" => Some(CloudProvider::Dropbox),
            _ => None,
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's linked cloud-storage account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CloudConnection {
    pub user_id: String,
    pub provider: CloudProvider,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub connected_at: DateTime<Utc>,
}

/// A file entry returned by a cloud listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CloudFile {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}
