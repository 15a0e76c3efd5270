//! Schema creation and store initialization.
//!
//! The `records` table is append-only. `store_meta` holds the embedding
//! dimension fixed by `docmind init`; every later open checks the
//! configured dimension against it.

use anyhow::{Context, Result};
use docmind_core::ConfigurationError;
use sqlx::SqlitePool;

pub const META_DIMS: &str = "dims";
pub const META_EMBEDDING_MODEL: &str = "embedding_model";

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Read the dimension fixed at init, if the store has been initialized.
pub async fn stored_dims(pool: &SqlitePool) -> Result<Option<usize>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
        .bind(META_DIMS)
        .fetch_optional(pool)
        .await?;

    value
        .map(|v| {
            v.parse::<usize>()
                .with_context(|| format!("corrupt store_meta dims value: '{}'", v))
        })
        .transpose()
}

/// Create the schema and fix the store dimension.
///
/// Re-running on an initialized database is a no-op when `dims` matches and
/// a [`ConfigurationError::DimensionMismatch`] otherwise.
pub async fn init_store(pool: &SqlitePool, dims: usize, model: Option<&str>) -> Result<usize> {
    run_migrations(pool).await?;

    if let Some(existing) = stored_dims(pool).await? {
        if existing != dims {
            return Err(ConfigurationError::DimensionMismatch {
                store: existing,
                embedder: dims,
            })
            .context("database was initialized with a different embedding dimension");
        }
        return Ok(existing);
    }

    sqlx::query("INSERT INTO store_meta (key, value) VALUES (?, ?)")
        .bind(META_DIMS)
        .bind(dims.to_string())
        .execute(pool)
        .await?;

    if let Some(model) = model {
        sqlx::query("INSERT OR REPLACE INTO store_meta (key, value) VALUES (?, ?)")
            .bind(META_EMBEDDING_MODEL)
            .bind(model)
            .execute(pool)
            .await?;
    }

    tracing::info!(dims, "initialized vector store");
    Ok(dims)
}
