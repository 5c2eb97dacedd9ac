pub mod ingredients;
pub mod models;
pub mod recipes;

use crate::config::DatabaseConfig;
use crate::error::Result;
use models::GraphCounts;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

/// Rows per bulk statement; keeps every statement well under SQLite's bind limit
pub(crate) const BULK_CHUNK: usize = 200;

/// Identity key for recipe and ingredient names: trimmed, Unicode-lowercased
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Initialize database connection pool
pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let config = DatabaseConfig {
        url: database_url.to_string(),
        ..DatabaseConfig::in_memory()
    };
    init_pool_with_config(&config).await
}

/// Initialize database connection pool with custom configuration
pub async fn init_pool_with_config(config: &DatabaseConfig) -> Result<DbPool> {
    // Create data directory if it doesn't exist (for file-backed SQLite)
    if let Some(path) = config.url.strip_prefix("sqlite:") {
        if !path.contains(":memory:") {
            if let Some(parent) = Path::new(path.trim_start_matches("//")).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Count every node and edge in the graph
pub async fn count_graph(pool: &DbPool) -> Result<GraphCounts> {
    let counts = sqlx::query_as::<_, GraphCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM recipes) AS recipes,
            (SELECT COUNT(*) FROM portions) AS portions,
            (SELECT COUNT(*) FROM ingredients) AS ingredients,
            (SELECT COUNT(*) FROM recipe_portions) AS made_with,
            (SELECT COUNT(*) FROM recipe_ingredients) AS has_item
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
