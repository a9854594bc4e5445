use std::collections::HashSet;

use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::debug;

use super::{clean_name, name_key};
use crate::{
    Error, Result,
    models::{ExerciseConfig, ExerciseDay, ExerciseDayId, ExerciseDayPatch, ExerciseId, NewExerciseDay, Timestamp},
    types::DayCategory,
};

const COLUMNS: &str = "id, name, category, exercises, rotation_order, created_at, updated_at";

/// Configs are kept as a JSON array in one TEXT column.
#[derive(sqlx::FromRow)]
struct DayRow {
    id: ExerciseDayId,
    name: String,
    category: DayCategory,
    exercises: String,
    rotation_order: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<DayRow> for ExerciseDay {
    type Error = Error;

    fn try_from(row: DayRow) -> Result<Self> {
        Ok(ExerciseDay {
            id: row.id,
            name: row.name,
            category: row.category,
            exercises: serde_json::from_str(&row.exercises)?,
            rotation_order: row.rotation_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode(rows: Vec<DayRow>) -> Result<Vec<ExerciseDay>> {
    rows.into_iter().map(ExerciseDay::try_from).collect()
}

/// Positions rewritten to 0..n in their current order.
fn reindexed(mut configs: Vec<ExerciseConfig>) -> Vec<ExerciseConfig> {
    configs.sort_by_key(|c| c.position);
    for (position, config) in configs.iter_mut().enumerate() {
        config.position = position as u32;
    }
    configs
}

fn check_sets(number_of_sets: u32) -> Result<()> {
    if number_of_sets == 0 {
        return Err(Error::Validation("an exercise needs at least one set".into()));
    }
    Ok(())
}

/// Set counts are positive and no exercise appears twice.
fn check_configs(configs: &[ExerciseConfig]) -> Result<()> {
    let mut seen = HashSet::with_capacity(configs.len());
    for config in configs {
        check_sets(config.number_of_sets)?;
        if !seen.insert(config.exercise_id) {
            return Err(duplicate_exercise(config.exercise_id));
        }
    }
    Ok(())
}

fn duplicate_exercise(exercise_id: ExerciseId) -> Error {
    Error::Validation(format!("exercise {exercise_id} is already part of this day"))
}

/* ─────────────────────────────── raw rows ─────────────────────────────── */

pub async fn insert<'e, E: SqliteExecutor<'e>>(ex: E, day: &NewExerciseDay) -> Result<ExerciseDayId> {
    let res = sqlx::query(
        "INSERT INTO exercise_days (name, category, exercises, rotation_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&day.name)
    .bind(day.category)
    .bind(serde_json::to_string(&day.exercises)?)
    .bind(day.rotation_order)
    .bind(day.created_at)
    .bind(day.updated_at)
    .execute(ex)
    .await?;

    let id = ExerciseDayId(res.last_insert_rowid());
    debug!(%id, name = %day.name, "exercise day inserted");
    Ok(id)
}

pub async fn insert_with_id<'e, E: SqliteExecutor<'e>>(ex: E, day: &ExerciseDay) -> Result<()> {
    sqlx::query(
        "INSERT INTO exercise_days (id, name, category, exercises, rotation_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(day.id)
    .bind(&day.name)
    .bind(day.category)
    .bind(serde_json::to_string(&day.exercises)?)
    .bind(day.rotation_order)
    .bind(day.created_at)
    .bind(day.updated_at)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn bulk_insert(conn: &mut SqliteConnection, days: &[NewExerciseDay]) -> Result<Vec<ExerciseDayId>> {
    let mut ids = Vec::with_capacity(days.len());
    for day in days {
        ids.push(insert(&mut *conn, day).await?);
    }
    Ok(ids)
}

pub async fn get<'e, E: SqliteExecutor<'e>>(ex: E, id: ExerciseDayId) -> Result<Option<ExerciseDay>> {
    let sql = format!("SELECT {COLUMNS} FROM exercise_days WHERE id = ?1");
    let row: Option<DayRow> = sqlx::query_as(&sql).bind(id).fetch_optional(ex).await?;
    row.map(ExerciseDay::try_from).transpose()
}

/// All templates in rotation order; ties fall back to creation order.
pub async fn all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<ExerciseDay>> {
    let sql = format!("SELECT {COLUMNS} FROM exercise_days ORDER BY rotation_order, id");
    decode(sqlx::query_as(&sql).fetch_all(ex).await?)
}

pub async fn by_category<'e, E: SqliteExecutor<'e>>(ex: E, category: DayCategory) -> Result<Vec<ExerciseDay>> {
    let sql = format!("SELECT {COLUMNS} FROM exercise_days WHERE category = ?1 ORDER BY rotation_order, id");
    decode(sqlx::query_as(&sql).bind(category).fetch_all(ex).await?)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: ExerciseDayId) -> Result<bool> {
    let res = sqlx::query("DELETE FROM exercise_days WHERE id = ?1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn clear<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    Ok(sqlx::query("DELETE FROM exercise_days").execute(ex).await?.rows_affected())
}

pub async fn find_by_name<'e, E: SqliteExecutor<'e>>(ex: E, name: &str) -> Result<Option<ExerciseDay>> {
    let key = name_key(name);
    Ok(all(ex).await?.into_iter().find(|d| name_key(&d.name) == key))
}

async fn max_rotation_order<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Option<i64>> {
    Ok(sqlx::query_scalar("SELECT MAX(rotation_order) FROM exercise_days")
        .fetch_one(ex)
        .await?)
}

/// Overwrite every mutable column of a stored template.
async fn write<'e, E: SqliteExecutor<'e>>(ex: E, day: &ExerciseDay) -> Result<()> {
    sqlx::query(
        "UPDATE exercise_days
         SET name = ?1, category = ?2, exercises = ?3, rotation_order = ?4, updated_at = ?5
         WHERE id = ?6",
    )
    .bind(&day.name)
    .bind(day.category)
    .bind(serde_json::to_string(&day.exercises)?)
    .bind(day.rotation_order)
    .bind(day.updated_at)
    .bind(day.id)
    .execute(ex)
    .await?;
    Ok(())
}

async fn require(conn: &mut SqliteConnection, id: ExerciseDayId) -> Result<ExerciseDay> {
    get(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("exercise day {id}")))
}

async fn ensure_name_free(conn: &mut SqliteConnection, name: &str, own_id: Option<ExerciseDayId>) -> Result<()> {
    match find_by_name(conn, name).await? {
        Some(other) if Some(other.id) != own_id => Err(Error::NameConflict {
            kind: "exercise day",
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

/* ──────────────────────────── service rules ───────────────────────────── */

/// Store a new template. Without an explicit `rotation_order` it goes to the
/// end of the rotation.
pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    category: DayCategory,
    exercises: Vec<ExerciseConfig>,
    rotation_order: Option<i64>,
    now: Timestamp,
) -> Result<ExerciseDay> {
    let name = clean_name("exercise day", name)?;
    ensure_name_free(&mut *conn, &name, None).await?;
    check_configs(&exercises)?;

    let rotation_order = match rotation_order {
        Some(order) => order,
        None => max_rotation_order(&mut *conn).await?.map_or(0, |max| max + 1),
    };
    let draft = NewExerciseDay {
        name,
        category,
        exercises: reindexed(exercises),
        rotation_order,
        created_at: now,
        updated_at: now,
    };
    let id = insert(&mut *conn, &draft).await?;
    Ok(draft.with_id(id))
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: ExerciseDayId,
    patch: ExerciseDayPatch,
    now: Timestamp,
) -> Result<ExerciseDay> {
    let mut day = require(&mut *conn, id).await?;

    if let Some(name) = patch.name {
        let name = clean_name("exercise day", &name)?;
        ensure_name_free(&mut *conn, &name, Some(id)).await?;
        day.name = name;
    }
    if let Some(category) = patch.category {
        day.category = category;
    }
    if let Some(exercises) = patch.exercises {
        check_configs(&exercises)?;
        day.exercises = reindexed(exercises);
    }
    if let Some(order) = patch.rotation_order {
        day.rotation_order = order;
    }
    day.updated_at = now;

    write(&mut *conn, &day).await?;
    debug!(%id, "exercise day updated");
    Ok(day)
}

/// Append an exercise after the last position.
pub async fn add_exercise(
    conn: &mut SqliteConnection,
    id: ExerciseDayId,
    exercise_id: ExerciseId,
    number_of_sets: u32,
    now: Timestamp,
) -> Result<ExerciseDay> {
    check_sets(number_of_sets)?;
    let mut day = require(&mut *conn, id).await?;
    if day.exercises.iter().any(|c| c.exercise_id == exercise_id) {
        return Err(duplicate_exercise(exercise_id));
    }
    let position = day.exercises.iter().map(|c| c.position + 1).max().unwrap_or(0);
    day.exercises.push(ExerciseConfig {
        exercise_id,
        number_of_sets,
        position,
    });
    day.exercises = reindexed(day.exercises);
    day.updated_at = now;
    write(&mut *conn, &day).await?;
    Ok(day)
}

pub async fn remove_exercise(
    conn: &mut SqliteConnection,
    id: ExerciseDayId,
    exercise_id: ExerciseId,
    now: Timestamp,
) -> Result<ExerciseDay> {
    let mut day = require(&mut *conn, id).await?;
    day.exercises.retain(|c| c.exercise_id != exercise_id);
    day.exercises = reindexed(day.exercises);
    day.updated_at = now;
    write(&mut *conn, &day).await?;
    Ok(day)
}

pub async fn set_number_of_sets(
    conn: &mut SqliteConnection,
    id: ExerciseDayId,
    exercise_id: ExerciseId,
    number_of_sets: u32,
    now: Timestamp,
) -> Result<ExerciseDay> {
    check_sets(number_of_sets)?;
    let mut day = require(&mut *conn, id).await?;
    for config in day.exercises.iter_mut().filter(|c| c.exercise_id == exercise_id) {
        config.number_of_sets = number_of_sets;
    }
    day.updated_at = now;
    write(&mut *conn, &day).await?;
    Ok(day)
}

/// Put the listed exercises first, in the given order. Ids not in the
/// template are ignored; exercises left out keep their relative order
/// after the listed ones.
pub async fn reorder_exercises(
    conn: &mut SqliteConnection,
    id: ExerciseDayId,
    ordered: &[ExerciseId],
    now: Timestamp,
) -> Result<ExerciseDay> {
    let mut day = require(&mut *conn, id).await?;
    let rank = |config: &ExerciseConfig| {
        ordered
            .iter()
            .position(|e| *e == config.exercise_id)
            .unwrap_or(ordered.len())
    };

    let mut configs = reindexed(std::mem::take(&mut day.exercises));
    configs.sort_by_key(|c| rank(c));
    for (position, config) in configs.iter_mut().enumerate() {
        config.position = position as u32;
    }
    day.exercises = configs;
    day.updated_at = now;
    write(&mut *conn, &day).await?;
    Ok(day)
}

/// Give the listed templates `rotation_order` 0, 1, 2, … in one transaction.
pub async fn reorder_rotation(pool: &crate::db::DB, ordered: &[ExerciseDayId], now: Timestamp) -> Result<()> {
    let mut tx = pool.begin().await?;
    for (order, id) in ordered.iter().enumerate() {
        sqlx::query("UPDATE exercise_days SET rotation_order = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(order as i64)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    debug!(count = ordered.len(), "rotation reordered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db;

    fn config(exercise: i64, sets: u32, position: u32) -> ExerciseConfig {
        ExerciseConfig {
            exercise_id: ExerciseId(exercise),
            number_of_sets: sets,
            position,
        }
    }

    fn layout(day: &ExerciseDay) -> Vec<(i64, u32, u32)> {
        day.ordered_exercises()
            .iter()
            .map(|c| (c.exercise_id.0, c.number_of_sets, c.position))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_rotation_order_and_contiguous_positions() {
        let pool = db::open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let push = create(&mut conn, "Push", DayCategory::Push, vec![config(1, 3, 7), config(2, 4, 2)], None, 1)
            .await
            .unwrap();
        assert_eq!(push.rotation_order, 0);
        assert_eq!(layout(&push), vec![(2, 4, 0), (1, 3, 1)]);

        let pull = create(&mut conn, "Pull", DayCategory::Pull, vec![], None, 1).await.unwrap();
        assert_eq!(pull.rotation_order, 1);
        let legs = create(&mut conn, "Legs", DayCategory::Legs, vec![], Some(10), 1).await.unwrap();
        let after = create(&mut conn, "Arms", DayCategory::FullBody, vec![], None, 1).await.unwrap();
        assert_eq!((legs.rotation_order, after.rotation_order), (10, 11));

        let dup = create(&mut conn, "PUSH", DayCategory::Push, vec![], None, 1).await;
        assert!(matches!(dup, Err(Error::NameConflict { kind: "exercise day", .. })));

        let stored = get(&mut *conn, push.id).await.unwrap().unwrap();
        assert_eq!(stored, push);
    }

    #[tokio::test]
    async fn exercise_mutations_keep_positions_contiguous() {
        let pool = db::open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let day = create(&mut conn, "Push", DayCategory::Push, vec![config(1, 3, 0), config(2, 3, 1)], None, 1)
            .await
            .unwrap();

        let day = add_exercise(&mut conn, day.id, ExerciseId(3), 2, 2).await.unwrap();
        assert_eq!(layout(&day), vec![(1, 3, 0), (2, 3, 1), (3, 2, 2)]);

        let day = remove_exercise(&mut conn, day.id, ExerciseId(1), 3).await.unwrap();
        assert_eq!(layout(&day), vec![(2, 3, 0), (3, 2, 1)]);

        let day = set_number_of_sets(&mut conn, day.id, ExerciseId(3), 5, 4).await.unwrap();
        assert_eq!(layout(&day), vec![(2, 3, 0), (3, 5, 1)]);

        let day = add_exercise(&mut conn, day.id, ExerciseId(4), 1, 5).await.unwrap();
        let day = reorder_exercises(&mut conn, day.id, &[ExerciseId(4), ExerciseId(9), ExerciseId(2)], 6)
            .await
            .unwrap();
        assert_eq!(layout(&day), vec![(4, 1, 0), (2, 3, 1), (3, 5, 2)]);
        assert_eq!(day.updated_at, 6);

        assert_eq!(get(&mut *conn, day.id).await.unwrap().unwrap(), day);
        assert!(matches!(
            add_exercise(&mut conn, day.id, ExerciseId(5), 0, 7).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            remove_exercise(&mut conn, ExerciseDayId(42), ExerciseId(2), 7).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn an_exercise_appears_at_most_once_per_day() {
        let pool = db::open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let day = create(&mut conn, "Push", DayCategory::Push, vec![config(1, 3, 0)], None, 1)
            .await
            .unwrap();

        let again = add_exercise(&mut conn, day.id, ExerciseId(1), 4, 2).await;
        assert!(matches!(again, Err(Error::Validation(_))), "{again:?}");
        assert_eq!(get(&mut *conn, day.id).await.unwrap().unwrap(), day);

        let twice = create(&mut conn, "Pull", DayCategory::Pull, vec![config(2, 3, 0), config(2, 2, 1)], None, 1).await;
        assert!(matches!(twice, Err(Error::Validation(_))));
        assert_eq!(find_by_name(&mut *conn, "pull").await.unwrap(), None);

        let patch = ExerciseDayPatch {
            exercises: Some(vec![config(1, 3, 0), config(1, 3, 1)]),
            ..Default::default()
        };
        assert!(matches!(update(&mut conn, day.id, patch, 3).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn rotation_reorder_and_category_listing() {
        let pool = db::open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let a = create(&mut conn, "A", DayCategory::Push, vec![], None, 1).await.unwrap();
        let b = create(&mut conn, "B", DayCategory::Pull, vec![], None, 1).await.unwrap();
        let c = create(&mut conn, "C", DayCategory::Push, vec![], None, 1).await.unwrap();
        drop(conn);

        reorder_rotation(&pool, &[c.id, a.id, b.id], 9).await.unwrap();

        let names: Vec<String> = all(&pool).await.unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);

        let push: Vec<String> = by_category(&pool, DayCategory::Push)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(push, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn rename_checks_other_days_only() {
        let pool = db::open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let a = create(&mut conn, "Upper", DayCategory::Push, vec![], None, 1).await.unwrap();
        create(&mut conn, "Lower", DayCategory::Legs, vec![], None, 1).await.unwrap();

        let renamed = update(
            &mut conn,
            a.id,
            ExerciseDayPatch {
                name: Some("UPPER".into()),
                ..Default::default()
            },
            2,
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "UPPER");

        let clash = ExerciseDayPatch {
            name: Some("lower".into()),
            ..Default::default()
        };
        assert!(matches!(update(&mut conn, a.id, clash, 3).await, Err(Error::NameConflict { .. })));
        assert!(delete(&mut *conn, a.id).await.unwrap());
        assert_eq!(get(&mut *conn, a.id).await.unwrap(), None);
    }
}
