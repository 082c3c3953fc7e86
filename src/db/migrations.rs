use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};

use crate::labels::models::DEFAULT_LABELS;

const CURRENT_SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => {
            tx.execute_batch(include_str!("schemas/schema_v1.sql"))
                .context("failed to execute schema_v1.sql")?;
            seed_default_labels(tx)
        }
        _ => bail!("unknown migration target version: {version}"),
    }
}

fn seed_default_labels(tx: &Transaction<'_>) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    for (index, (id, name, color)) in DEFAULT_LABELS.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO labels (id, name, color, order_index, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, name, color, index as i64, now, now],
        )
        .with_context(|| format!("failed to seed label {name}"))?;
    }
    Ok(())
}
