use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::{
    db::{helpers::parse_datetime, Database},
    error::DiaryError,
    labels::{
        models::{validation, Label, LabelInput, LabelUpdate},
        repository::LabelRepository,
    },
};

const LABEL_COLUMNS: &str = "id, name, color, order_index, created_at, updated_at";

fn row_to_label(row: &Row) -> Result<Label> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Label {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        order_index: row.get("order_index")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn fetch_label(conn: &rusqlite::Connection, label_id: &str) -> Result<Option<Label>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LABEL_COLUMNS} FROM labels WHERE id = ?1 AND deleted_at IS NULL"
    ))?;
    let mut rows = stmt.query(params![label_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_label(row)?)),
        None => Ok(None),
    }
}

fn label_not_found(label_id: &str) -> DiaryError {
    DiaryError::NotFound(format!("Label {label_id}"))
}

impl LabelRepository for Database {
    async fn list(&self) -> Result<Vec<Label>, DiaryError> {
        let labels = self
            .execute(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {LABEL_COLUMNS}
                     FROM labels
                     WHERE deleted_at IS NULL
                     ORDER BY order_index ASC"
                ))?;

                let mut rows = stmt.query([])?;
                let mut labels = Vec::new();
                while let Some(row) = rows.next()? {
                    labels.push(row_to_label(row)?);
                }

                Ok(labels)
            })
            .await?;
        Ok(labels)
    }

    async fn create(&self, input: LabelInput) -> Result<Label, DiaryError> {
        let name = validation::validate_name(&input.name)?;
        validation::validate_color(&input.color)?;
        let color = input.color;

        let label = self
            .execute(move |conn| {
                let now = Utc::now().to_rfc3339();
                let label_id = Uuid::new_v4().to_string();

                let next_index: i64 = conn.query_row(
                    "SELECT COALESCE(MAX(order_index), -1) + 1 FROM labels WHERE deleted_at IS NULL",
                    [],
                    |row| row.get(0),
                )?;

                conn.execute(
                    "INSERT INTO labels (id, name, color, order_index, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![label_id, name, color, next_index, now, now],
                )?;

                fetch_label(conn, &label_id)?
                    .ok_or_else(|| anyhow::anyhow!("Label not found after insert"))
            })
            .await?;
        Ok(label)
    }

    async fn update(&self, id: &str, update: LabelUpdate) -> Result<Label, DiaryError> {
        let name = update
            .name
            .as_deref()
            .map(validation::validate_name)
            .transpose()?;
        if let Some(color) = update.color.as_deref() {
            validation::validate_color(color)?;
        }
        if name.is_none() && update.color.is_none() {
            return Err(DiaryError::InvalidInput("No fields to update".into()));
        }

        let label_id = id.to_string();
        let color = update.color;
        let updated = self
            .execute(move |conn| {
                let rows_affected = conn.execute(
                    "UPDATE labels
                     SET name = COALESCE(?1, name),
                         color = COALESCE(?2, color),
                         updated_at = ?3
                     WHERE id = ?4 AND deleted_at IS NULL",
                    params![name, color, Utc::now().to_rfc3339(), label_id],
                )?;
                if rows_affected == 0 {
                    return Ok(None);
                }
                fetch_label(conn, &label_id)
            })
            .await?;

        updated.ok_or_else(|| label_not_found(id))
    }

    async fn delete(&self, id: &str) -> Result<(), DiaryError> {
        let label_id = id.to_string();
        let rows_affected = self
            .execute(move |conn| {
                let now = Utc::now().to_rfc3339();
                let rows = conn.execute(
                    "UPDATE labels
                     SET deleted_at = ?1, updated_at = ?1
                     WHERE id = ?2 AND deleted_at IS NULL",
                    params![now, label_id],
                )?;
                Ok(rows)
            })
            .await?;

        if rows_affected == 0 {
            return Err(label_not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
impl Database {
    /// Single live label by id.
    pub async fn get_label(&self, label_id: &str) -> Result<Option<Label>> {
        let label_id = label_id.to_string();
        self.execute(move |conn| fetch_label(conn, &label_id)).await
    }

    /// Whether a label row exists, including soft-deleted ones.
    pub async fn label_row_exists(&self, label_id: &str) -> Result<bool> {
        let label_id = label_id.to_string();
        self.execute(move |conn| {
            let rows: i64 = conn.query_row(
                "SELECT COUNT(*) FROM labels WHERE id = ?1",
                params![label_id],
                |row| row.get(0),
            )?;
            Ok(rows > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::models::DEFAULT_LABELS;
    use tempfile::TempDir;

    fn open() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("labels.sqlite3")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_defaults_are_seeded_in_order() {
        let (_dir, db) = open();
        let labels = db.list().await.unwrap();
        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Personal", "Ideas", "Goals", "Reflection", "Travel"]);
        assert_eq!(labels[0].id, DEFAULT_LABELS[0].0);
    }

    #[tokio::test]
    async fn test_create_appends_with_uuid() {
        let (_dir, db) = open();
        let label = db
            .create(LabelInput {
                name: "  Health ".into(),
                color: "#22c55e".into(),
            })
            .await
            .unwrap();

        assert_eq!(label.name, "Health");
        assert!(Uuid::parse_str(&label.id).is_ok());
        assert_eq!(label.order_index, DEFAULT_LABELS.len() as i64);
        assert_eq!(db.list().await.unwrap().last().unwrap().id, label.id);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (_dir, db) = open();
        let empty = db
            .create(LabelInput {
                name: " ".into(),
                color: "#22c55e".into(),
            })
            .await;
        assert!(matches!(empty, Err(DiaryError::InvalidInput(_))));

        let bad_color = db
            .create(LabelInput {
                name: "Ok".into(),
                color: "green".into(),
            })
            .await;
        assert!(matches!(bad_color, Err(DiaryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let (_dir, db) = open();
        let updated = db
            .update(
                "1",
                LabelUpdate {
                    name: Some("Job".into()),
                    color: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Job");
        assert_eq!(updated.color, "#3b82f6");

        let missing = db
            .update(
                "nope",
                LabelUpdate {
                    name: Some("X".into()),
                    color: None,
                },
            )
            .await;
        assert!(matches!(missing, Err(DiaryError::NotFound(_))));

        let nothing = db.update("1", LabelUpdate::default()).await;
        assert!(matches!(nothing, Err(DiaryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let (_dir, db) = open();
        db.delete("2").await.unwrap();

        assert!(db.get_label("2").await.unwrap().is_none());
        assert!(db.label_row_exists("2").await.unwrap());
        assert!(db.list().await.unwrap().iter().all(|l| l.id != "2"));
        assert!(matches!(db.delete("2").await, Err(DiaryError::NotFound(_))));
    }
}
