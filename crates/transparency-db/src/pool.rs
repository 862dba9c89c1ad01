use crate::error::DbResult;
use sqlx::{Any, Pool, any::AnyPoolOptions};
use tracing::debug;

const INITIAL_MIGRATION: &str = include_str!("../migrations/001_initial.sql");

/// Create a database pool from a connection string
///
/// In-memory SQLite databases live and die with their connection, so those
/// pools are pinned to a single connection that is never recycled.
pub async fn create_pool(database_url: &str, max_connections: u32) -> DbResult<Pool<Any>> {
    sqlx::any::install_default_drivers();

    let in_memory = database_url.contains(":memory:");
    let options = if in_memory {
        AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        AnyPoolOptions::new().max_connections(max_connections)
    };

    let options = if database_url.starts_with("sqlite") {
        options.after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                Ok(())
            })
        })
    } else {
        options
    };

    let pool = options.connect(database_url).await?;
    Ok(pool)
}

/// Run migrations on the database
///
/// Statements are separated by blank lines in the migration file and executed
/// one by one; every statement is idempotent.
pub async fn run_migrations(pool: &Pool<Any>) -> DbResult<()> {
    for statement in split_statements(INITIAL_MIGRATION) {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!("Migrations applied");

    Ok(())
}

fn split_statements(sql: &str) -> Vec<&str> {
    sql.split("\n\n")
        .map(str::trim)
        .filter(|block| {
            block
                .lines()
                .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
        })
        .collect()
}
