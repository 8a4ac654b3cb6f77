//! Database schema management for `fieldwise-advisor`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs`, and only when `DATABASE_URL` is set.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `recommendations` table holding one row per composed
/// recommendation: summary columns for listing plus the full JSON payload.
/// Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recommendations (
            id                UUID        PRIMARY KEY,
            farm_id           TEXT,
            created_at        TIMESTAMPTZ NOT NULL,
            crop              TEXT        NOT NULL,
            fertilizer        TEXT        NOT NULL,
            confidence        DOUBLE PRECISION NOT NULL,
            source            TEXT        NOT NULL,
            soil_score        SMALLINT    NOT NULL,
            soil_category     TEXT        NOT NULL,
            total_cost        BIGINT      NOT NULL,
            payload           JSONB       NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_recommendations_farm_id
            ON recommendations (farm_id, created_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
