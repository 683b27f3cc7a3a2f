use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open the dispatch database. `sqlite::memory:` gives a throwaway in-memory
/// database (dev runs without a data dir); anything else is treated as a file
/// path, created on first use. Store schemas are applied by each store's
/// `migrate()`.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let file_path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

    if file_path == ":memory:" {
        // One connection only: each pooled connection would otherwise get its
        // own empty in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        return Ok(pool);
    }

    // Resolve the file path and ensure the parent directory exists.
    // Handles both "sqlite:./foo.db" and "sqlite:../foo.db" forms.
    let abs_path = std::env::current_dir()?.join(file_path);
    if let Some(parent) = abs_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(&abs_path)
            .create_if_missing(true),
    )
    .await?;

    Ok(pool)
}
