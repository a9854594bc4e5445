use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::debug;

use crate::{
    Error, Result,
    models::{ExerciseDayId, ExerciseId, NewTraining, SetData, Timestamp, Training, TrainingId, TrainingPatch},
    volume,
};

const COLUMNS: &str = "id, exercise_day_id, date, sets, total_volume, completed";
const NEWEST_FIRST: &str = "ORDER BY date DESC, id DESC";

#[derive(sqlx::FromRow)]
struct TrainingRow {
    id: TrainingId,
    exercise_day_id: ExerciseDayId,
    date: Timestamp,
    sets: String,
    total_volume: f64,
    completed: bool,
}

impl TryFrom<TrainingRow> for Training {
    type Error = Error;

    fn try_from(row: TrainingRow) -> Result<Self> {
        Ok(Training {
            id: row.id,
            exercise_day_id: row.exercise_day_id,
            date: row.date,
            sets: serde_json::from_str(&row.sets)?,
            total_volume: row.total_volume,
            completed: row.completed,
        })
    }
}

fn decode(rows: Vec<TrainingRow>) -> Result<Vec<Training>> {
    rows.into_iter().map(Training::try_from).collect()
}

pub async fn insert<'e, E: SqliteExecutor<'e>>(ex: E, training: &NewTraining) -> Result<TrainingId> {
    let res = sqlx::query(
        "INSERT INTO trainings (exercise_day_id, date, sets, total_volume, completed)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(training.exercise_day_id)
    .bind(training.date)
    .bind(serde_json::to_string(&training.sets)?)
    .bind(training.total_volume)
    .bind(training.completed)
    .execute(ex)
    .await?;

    let id = TrainingId(res.last_insert_rowid());
    debug!(%id, day = %training.exercise_day_id, "training inserted");
    Ok(id)
}

pub async fn insert_with_id<'e, E: SqliteExecutor<'e>>(ex: E, training: &Training) -> Result<()> {
    sqlx::query(
        "INSERT INTO trainings (id, exercise_day_id, date, sets, total_volume, completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(training.id)
    .bind(training.exercise_day_id)
    .bind(training.date)
    .bind(serde_json::to_string(&training.sets)?)
    .bind(training.total_volume)
    .bind(training.completed)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn bulk_insert(conn: &mut SqliteConnection, trainings: &[NewTraining]) -> Result<Vec<TrainingId>> {
    let mut ids = Vec::with_capacity(trainings.len());
    for training in trainings {
        ids.push(insert(&mut *conn, training).await?);
    }
    Ok(ids)
}

pub async fn get<'e, E: SqliteExecutor<'e>>(ex: E, id: TrainingId) -> Result<Option<Training>> {
    let sql = format!("SELECT {COLUMNS} FROM trainings WHERE id = ?1");
    let row: Option<TrainingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(ex).await?;
    row.map(Training::try_from).transpose()
}

/// Full history, newest first.
pub async fn all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Training>> {
    let sql = format!("SELECT {COLUMNS} FROM trainings {NEWEST_FIRST}");
    decode(sqlx::query_as(&sql).fetch_all(ex).await?)
}

pub async fn by_exercise_day<'e, E: SqliteExecutor<'e>>(ex: E, day_id: ExerciseDayId) -> Result<Vec<Training>> {
    let sql = format!("SELECT {COLUMNS} FROM trainings WHERE exercise_day_id = ?1 {NEWEST_FIRST}");
    decode(sqlx::query_as(&sql).bind(day_id).fetch_all(ex).await?)
}

/// Sessions with `start <= date <= end`, oldest first.
pub async fn in_range<'e, E: SqliteExecutor<'e>>(ex: E, start: Timestamp, end: Timestamp) -> Result<Vec<Training>> {
    let sql = format!("SELECT {COLUMNS} FROM trainings WHERE date BETWEEN ?1 AND ?2 ORDER BY date, id");
    decode(sqlx::query_as(&sql).bind(start).bind(end).fetch_all(ex).await?)
}

pub async fn last<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Option<Training>> {
    let sql = format!("SELECT {COLUMNS} FROM trainings {NEWEST_FIRST} LIMIT 1");
    let row: Option<TrainingRow> = sqlx::query_as(&sql).fetch_optional(ex).await?;
    row.map(Training::try_from).transpose()
}

pub async fn last_for_day<'e, E: SqliteExecutor<'e>>(ex: E, day_id: ExerciseDayId) -> Result<Option<Training>> {
    Ok(recent_for_day(ex, day_id, 1).await?.into_iter().next())
}

pub async fn recent_for_day<'e, E: SqliteExecutor<'e>>(
    ex: E,
    day_id: ExerciseDayId,
    limit: u32,
) -> Result<Vec<Training>> {
    let sql = format!("SELECT {COLUMNS} FROM trainings WHERE exercise_day_id = ?1 {NEWEST_FIRST} LIMIT ?2");
    decode(sqlx::query_as(&sql).bind(day_id).bind(limit).fetch_all(ex).await?)
}

/// Sessions that recorded at least one set of the exercise, newest first.
pub async fn with_exercise<'e, E: SqliteExecutor<'e>>(ex: E, exercise_id: ExerciseId) -> Result<Vec<Training>> {
    Ok(all(ex)
        .await?
        .into_iter()
        .filter(|t| t.contains_exercise(exercise_id))
        .collect())
}

/// Every set of the exercise ever recorded, tagged with its session date.
pub async fn sets_for_exercise<'e, E: SqliteExecutor<'e>>(
    ex: E,
    exercise_id: ExerciseId,
) -> Result<Vec<(Timestamp, SetData)>> {
    Ok(with_exercise(ex, exercise_id)
        .await?
        .into_iter()
        .flat_map(|t| {
            let date = t.date;
            t.sets
                .into_iter()
                .filter(move |s| s.exercise_id == exercise_id)
                .map(move |s| (date, s))
        })
        .collect())
}

pub async fn count<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM trainings").fetch_one(ex).await?)
}

/// Correct a stored session. Replacing the sets recomputes its volume.
pub async fn update(conn: &mut SqliteConnection, id: TrainingId, patch: TrainingPatch) -> Result<Training> {
    let mut training = get(&mut *conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("training {id}")))?;

    if let Some(day_id) = patch.exercise_day_id {
        training.exercise_day_id = day_id;
    }
    if let Some(date) = patch.date {
        training.date = date;
    }
    if let Some(sets) = patch.sets {
        for weight in sets.iter().filter_map(|s| s.weight) {
            volume::check_weight(weight)?;
        }
        training.total_volume = volume::total_volume(&sets);
        training.sets = sets;
    }
    if let Some(completed) = patch.completed {
        training.completed = completed;
    }

    sqlx::query(
        "UPDATE trainings
         SET exercise_day_id = ?1, date = ?2, sets = ?3, total_volume = ?4, completed = ?5
         WHERE id = ?6",
    )
    .bind(training.exercise_day_id)
    .bind(training.date)
    .bind(serde_json::to_string(&training.sets)?)
    .bind(training.total_volume)
    .bind(training.completed)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(training)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: TrainingId) -> Result<bool> {
    let res = sqlx::query("DELETE FROM trainings WHERE id = ?1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn clear<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    Ok(sqlx::query("DELETE FROM trainings").execute(ex).await?.rows_affected())
}
