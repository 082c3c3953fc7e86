//! Label-related data models.
//!
//! Labels are global (not per entry); entries reference them by id through
//! the marker embedded in their markdown, see [`super::codec`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a label for categorizing diary entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating a label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelInput {
    pub name: String,
    pub color: String,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Seeded into an empty catalog the first time the database is created.
pub const DEFAULT_LABELS: [(&str, &str, &str); 6] = [
    ("1", "Work", "#3b82f6"),
    ("2", "Personal", "#10b981"),
    ("3", "Ideas", "#f59e0b"),
    ("4", "Goals", "#8b5cf6"),
    ("5", "Reflection", "#ec4899"),
    ("6", "Travel", "#06b6d4"),
];

/// Read-only id -> label lookup used when rendering the visible summary.
pub trait LabelCatalog {
    fn lookup(&self, id: &str) -> Option<&Label>;
}

impl LabelCatalog for [Label] {
    fn lookup(&self, id: &str) -> Option<&Label> {
        self.iter().find(|label| label.id == id)
    }
}

impl LabelCatalog for Vec<Label> {
    fn lookup(&self, id: &str) -> Option<&Label> {
        self.as_slice().lookup(id)
    }
}

/// Validation for user-supplied label fields
pub mod validation {
    use crate::error::DiaryError;

    pub const MAX_NAME_LEN: usize = 64;

    pub fn validate_name(name: &str) -> Result<String, DiaryError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DiaryError::InvalidInput("Label name cannot be empty".into()));
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(DiaryError::InvalidInput(format!(
                "Label name too long (max {MAX_NAME_LEN} chars)"
            )));
        }
        Ok(trimmed.to_string())
    }

    pub fn validate_color(color: &str) -> Result<(), DiaryError> {
        let Some(hex_part) = color.strip_prefix('#') else {
            return Err(DiaryError::InvalidInput(
                "Invalid color format. Must be hex (#RRGGBB)".into(),
            ));
        };

        if hex_part.len() != 6 && hex_part.len() != 8 {
            return Err(DiaryError::InvalidInput(
                "Invalid color format. Must be hex (#RRGGBB or #RRGGBBAA)".into(),
            ));
        }

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DiaryError::InvalidInput(
                "Invalid color format. Must be hex (#RRGGBB)".into(),
            ));
        }

        Ok(())
    }

}
