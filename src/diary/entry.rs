//! Diary entry data models.

use serde::{Deserialize, Serialize};

use super::date::EntryDate;

/// One diary document, keyed by its date. `content` is loaded on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    pub date: EntryDate,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub exists: bool,
}

impl DiaryEntry {
    /// Listing form: metadata only.
    pub fn listed(date: EntryDate) -> Self {
        Self {
            filename: date.filename(),
            date,
            content: None,
            exists: true,
        }
    }

    pub fn with_content(date: EntryDate, content: String) -> Self {
        Self {
            filename: date.filename(),
            date,
            content: Some(content),
            exists: true,
        }
    }
}
