use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::CoreError;
use crate::models::SYSTEM_CATEGORY_SEED;

pub use sqlx::SqlitePool as DbPool;

/// Establishes a connection pool to the SQLite database, runs migrations,
/// and seeds the eight system categories if the table is empty (spec §3,
/// §6.4: "Categories are created at first process start if the category
/// table is empty").
pub async fn establish_connection(db_path: &str) -> Result<SqlitePool, CoreError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    if db_path != ":memory:" && !Path::new(db_path).exists() {
        tokio::fs::File::create(db_path).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_path)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    seed_system_categories(&pool).await?;

    Ok(pool)
}

async fn seed_system_categories(pool: &SqlitePool) -> Result<(), CoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for (id, name, bg, fg) in SYSTEM_CATEGORY_SEED {
        sqlx::query(
            "INSERT INTO categories (id, name, bg_color, fg_color, sort_order, is_system) \
             VALUES ($1, $2, $3, $4, $1, 1)",
        )
        .bind(id)
        .bind(name)
        .bind(bg)
        .bind(fg)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
