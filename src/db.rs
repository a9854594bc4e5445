use std::path::Path;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

use crate::Result;

pub type DB = SqlitePool;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS exercises (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        category    TEXT    NOT NULL,
        focus       TEXT    NOT NULL DEFAULT '',
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_exercises_category ON exercises(category)",
    "CREATE TABLE IF NOT EXISTS exercise_days (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        name            TEXT    NOT NULL,
        category        TEXT    NOT NULL,
        exercises       TEXT    NOT NULL,
        rotation_order  INTEGER NOT NULL,
        created_at      INTEGER NOT NULL,
        updated_at      INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_exercise_days_category ON exercise_days(category)",
    "CREATE INDEX IF NOT EXISTS idx_exercise_days_rotation ON exercise_days(rotation_order)",
    "CREATE TABLE IF NOT EXISTS trainings (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        exercise_day_id  INTEGER NOT NULL,
        date             INTEGER NOT NULL,
        sets             TEXT    NOT NULL,
        total_volume     REAL    NOT NULL,
        completed        INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_trainings_day ON trainings(exercise_day_id)",
    "CREATE INDEX IF NOT EXISTS idx_trainings_date ON trainings(date)",
    "CREATE TABLE IF NOT EXISTS settings (
        id                    INTEGER PRIMARY KEY CHECK (id = 1),
        last_exercise_day_id  INTEGER,
        theme                 TEXT    NOT NULL,
        rest_timer_duration   INTEGER NOT NULL,
        rest_timer_volume     INTEGER NOT NULL
    )",
];

/// Open (creating if needed) the database at `path` and bring its schema up
/// to date.
pub async fn open(path: &Path) -> Result<DB> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let opts = SqliteConnectOptions::new().filename(path).create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    migrate(&pool).await?;
    debug!(path = %path.display(), "database opened");
    Ok(pool)
}

/// A private in-memory database. Every pooled connection to `:memory:` is
/// its own database, so the pool holds exactly one connection forever.
pub async fn open_in_memory() -> Result<DB> {
    let opts = SqliteConnectOptions::new().in_memory(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &DB) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
