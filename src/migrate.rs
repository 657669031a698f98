use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and index. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Create farms table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS farms (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL UNIQUE,
            owner_name TEXT NOT NULL,
            location TEXT NOT NULL,
            area_hectares REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create soil_reports table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS soil_reports (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            n REAL NOT NULL,
            p REAL NOT NULL,
            k REAL NOT NULL,
            ph REAL NOT NULL,
            organic_matter REAL,
            test_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create recommendations table; input and recommendations are JSON text
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recommendations (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            input_json TEXT NOT NULL,
            recommendations_json TEXT NOT NULL,
            season TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create feedback table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            recommendation_id TEXT,
            crop TEXT NOT NULL,
            accepted INTEGER NOT NULL,
            rating INTEGER,
            comments TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_soil_reports_farm ON soil_reports(farm_id, test_date DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_recommendations_farm ON recommendations(farm_id, created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_feedback_crop ON feedback(crop)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_feedback_farm ON feedback(farm_id)")
        .execute(pool)
        .await?;

    Ok(())
}
