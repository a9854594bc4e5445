use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::debug;

use super::{clean_name, name_key};
use crate::{
    Error, Result,
    models::{Exercise, ExerciseId, ExercisePatch, NewExercise, Timestamp},
    types::MuscleCategory,
};

const COLUMNS: &str = "id, name, category, focus, created_at, updated_at";

/* ─────────────────────────────── raw rows ─────────────────────────────── */

pub async fn insert<'e, E: SqliteExecutor<'e>>(ex: E, exercise: &NewExercise) -> Result<ExerciseId> {
    let res = sqlx::query(
        "INSERT INTO exercises (name, category, focus, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&exercise.name)
    .bind(exercise.category)
    .bind(&exercise.focus)
    .bind(exercise.created_at)
    .bind(exercise.updated_at)
    .execute(ex)
    .await?;

    let id = ExerciseId(res.last_insert_rowid());
    debug!(%id, name = %exercise.name, "exercise inserted");
    Ok(id)
}

/// Insert keeping the record's own id.
pub async fn insert_with_id<'e, E: SqliteExecutor<'e>>(ex: E, exercise: &Exercise) -> Result<()> {
    sqlx::query(
        "INSERT INTO exercises (id, name, category, focus, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(exercise.id)
    .bind(&exercise.name)
    .bind(exercise.category)
    .bind(&exercise.focus)
    .bind(exercise.created_at)
    .bind(exercise.updated_at)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn bulk_insert(conn: &mut SqliteConnection, exercises: &[NewExercise]) -> Result<Vec<ExerciseId>> {
    let mut ids = Vec::with_capacity(exercises.len());
    for exercise in exercises {
        ids.push(insert(&mut *conn, exercise).await?);
    }
    Ok(ids)
}

pub async fn get<'e, E: SqliteExecutor<'e>>(ex: E, id: ExerciseId) -> Result<Option<Exercise>> {
    let sql = format!("SELECT {COLUMNS} FROM exercises WHERE id = ?1");
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(ex).await?)
}

/// All exercises, alphabetically.
pub async fn all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Exercise>> {
    let sql = format!("SELECT {COLUMNS} FROM exercises ORDER BY name COLLATE NOCASE, id");
    Ok(sqlx::query_as(&sql).fetch_all(ex).await?)
}

pub async fn by_category<'e, E: SqliteExecutor<'e>>(ex: E, category: MuscleCategory) -> Result<Vec<Exercise>> {
    let sql = format!("SELECT {COLUMNS} FROM exercises WHERE category = ?1 ORDER BY name COLLATE NOCASE, id");
    Ok(sqlx::query_as(&sql).bind(category).fetch_all(ex).await?)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: ExerciseId) -> Result<bool> {
    let res = sqlx::query("DELETE FROM exercises WHERE id = ?1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn clear<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    Ok(sqlx::query("DELETE FROM exercises").execute(ex).await?.rows_affected())
}

/// Case-insensitive lookup by display name.
pub async fn find_by_name<'e, E: SqliteExecutor<'e>>(ex: E, name: &str) -> Result<Option<Exercise>> {
    // SQLite's NOCASE only folds ASCII, so compare in Rust.
    let key = name_key(name);
    Ok(all(ex).await?.into_iter().find(|e| name_key(&e.name) == key))
}

/* ──────────────────────────── service rules ───────────────────────────── */

/// Store a new exercise, rejecting names already taken.
pub async fn create(conn: &mut SqliteConnection, mut draft: NewExercise) -> Result<Exercise> {
    draft.name = clean_name("exercise", &draft.name)?;
    if find_by_name(&mut *conn, &draft.name).await?.is_some() {
        return Err(Error::NameConflict {
            kind: "exercise",
            name: draft.name,
        });
    }
    let id = insert(&mut *conn, &draft).await?;
    Ok(draft.with_id(id))
}

pub async fn update(conn: &mut SqliteConnection, id: ExerciseId, patch: ExercisePatch, now: Timestamp) -> Result<Exercise> {
    let mut exercise = get(&mut *conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("exercise {id}")))?;

    if let Some(name) = patch.name {
        let name = clean_name("exercise", &name)?;
        if let Some(other) = find_by_name(&mut *conn, &name).await? {
            if other.id != id {
                return Err(Error::NameConflict { kind: "exercise", name });
            }
        }
        exercise.name = name;
    }
    if let Some(category) = patch.category {
        exercise.category = category;
    }
    if let Some(focus) = patch.focus {
        exercise.focus = focus;
    }
    exercise.updated_at = now;

    sqlx::query("UPDATE exercises SET name = ?1, category = ?2, focus = ?3, updated_at = ?4 WHERE id = ?5")
        .bind(&exercise.name)
        .bind(exercise.category)
        .bind(&exercise.focus)
        .bind(exercise.updated_at)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    debug!(%id, "exercise updated");
    Ok(exercise)
}
