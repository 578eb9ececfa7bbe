pub mod models;
pub mod records;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::state::DbPool;

pub type Migration = (&'static str, &'static str);

pub const RECORD_MIGRATIONS: &[Migration] = &[(
    "001_initial",
    include_str!("../../migrations/records/001_initial.sql"),
)];

pub const MEDIA_MIGRATIONS: &[Migration] = &[(
    "001_media",
    include_str!("../../migrations/media/001_media.sql"),
)];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::builder().max_size(4).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    Ok(pool)
}

/// Apply any migrations not yet recorded in `schema_version`. Safe to call on
/// every open.
pub fn run_migrations(pool: &DbPool, migrations: &[Migration]) -> anyhow::Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in migrations {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    Ok(())
}

/// Create a pool at `path` and bring its schema up to date.
pub fn open(path: &Path, migrations: &[Migration]) -> anyhow::Result<DbPool> {
    let pool = create_pool(path)?;
    run_migrations(&pool, migrations)?;
    tracing::debug!("Opened store at {}", path.display());
    Ok(pool)
}
