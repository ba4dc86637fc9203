use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STEP_DURATION_MINUTES: u32 = 5;
pub const DEFAULT_TITLE: &str = "Untitled codelab";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedDocument {
    pub title: String,
    pub metadata: BTreeMap<String, String>,
    pub steps: Vec<Step>,
}

impl ParsedDocument {
    /// Title to show and persist; never empty.
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() { DEFAULT_TITLE } else { title }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub title: String,
    pub content: String,
    pub duration: u32,
}

impl Step {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            duration: DEFAULT_STEP_DURATION_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheRecord {
    pub id: i64,
    pub original_url: String,
    pub converted_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn view_path(&self) -> String {
        format!("/view/{}", self.converted_id)
    }
}
