//! Whole-dataset export and import.
//!
//! A backup is one JSON document holding every collection. Importing either
//! replaces everything (ids preserved) or merges by name, remapping ids so
//! imported templates and sessions keep pointing at the right exercises.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::{
    Error, Result,
    db::DB,
    models::{
        AppSettings, ExerciseDayId, ExerciseId, NewExercise, NewExerciseDay, NewTraining, Timestamp, TrainingId,
    },
    store::{self, name_key},
    volume,
};

pub const BACKUP_VERSION: u32 = 1;

/// A record as it appears in a backup: the draft fields plus the id it had
/// in the exporting database, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "Id: Deserialize<'de>, T: Deserialize<'de>"))]
pub struct BackupEntry<Id, T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(flatten)]
    pub record: T,
}

impl<Id, T> BackupEntry<Id, T> {
    pub fn new(id: Option<Id>, record: T) -> Self {
        Self { id, record }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u32,
    pub export_date: Timestamp,
    pub exercises: Vec<BackupEntry<ExerciseId, NewExercise>>,
    pub exercise_days: Vec<BackupEntry<ExerciseDayId, NewExerciseDay>>,
    pub trainings: Vec<BackupEntry<TrainingId, NewTraining>>,
    #[serde(default)]
    pub settings: Option<AppSettings>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub exercises_added: usize,
    pub exercise_days_added: usize,
    pub trainings_added: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportMode {
    #[default]
    Merge,
    Replace,
}

/* ──────────────────────────────── export ──────────────────────────────── */

pub async fn export(pool: &DB, now: Timestamp) -> Result<BackupDocument> {
    let mut conn = pool.acquire().await?;
    let exercises = store::exercises::all(&mut *conn).await?;
    let exercise_days = store::exercise_days::all(&mut *conn).await?;
    let trainings = store::trainings::all(&mut *conn).await?;
    let settings = store::settings::get(&mut *conn).await?;

    Ok(BackupDocument {
        version: BACKUP_VERSION,
        export_date: now,
        exercises: exercises
            .iter()
            .map(|e| BackupEntry::new(Some(e.id), e.to_draft()))
            .collect(),
        exercise_days: exercise_days
            .iter()
            .map(|d| BackupEntry::new(Some(d.id), d.to_draft()))
            .collect(),
        trainings: trainings
            .iter()
            .map(|t| BackupEntry::new(Some(t.id), t.to_draft()))
            .collect(),
        settings,
    })
}

pub fn to_json(document: &BackupDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/* ────────────────────────────── validation ────────────────────────────── */

fn invalid(message: impl Into<String>) -> Error {
    Error::Validation(message.into())
}

fn require_array<'a>(object: &'a Value, field: &str, context: &str) -> Result<&'a Vec<Value>> {
    object
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(format!("{context}: `{field}` must be an array")))
}

fn require_kind(object: &Value, field: &str, context: &str, check: fn(&Value) -> bool, kind: &str) -> Result<()> {
    match object.get(field) {
        Some(v) if check(v) => Ok(()),
        _ => Err(invalid(format!("{context}: `{field}` must be a {kind}"))),
    }
}

/// Structural checks on an untyped document.
pub fn validate(document: &Value) -> Result<()> {
    if !document.is_object() {
        return Err(invalid("backup must be a JSON object"));
    }
    require_kind(document, "version", "backup", Value::is_number, "number")?;
    require_kind(document, "exportDate", "backup", Value::is_number, "number")?;

    for (i, exercise) in require_array(document, "exercises", "backup")?.iter().enumerate() {
        let context = format!("exercises[{i}]");
        if !exercise.is_object() {
            return Err(invalid(format!("{context}: must be an object")));
        }
        require_kind(exercise, "name", &context, Value::is_string, "string")?;
        require_kind(exercise, "category", &context, Value::is_string, "string")?;
    }

    for (i, day) in require_array(document, "exerciseDays", "backup")?.iter().enumerate() {
        let context = format!("exerciseDays[{i}]");
        if !day.is_object() {
            return Err(invalid(format!("{context}: must be an object")));
        }
        require_kind(day, "name", &context, Value::is_string, "string")?;
        require_kind(day, "category", &context, Value::is_string, "string")?;
        require_array(day, "exercises", &context)?;
    }

    for (i, training) in require_array(document, "trainings", "backup")?.iter().enumerate() {
        let context = format!("trainings[{i}]");
        if !training.is_object() {
            return Err(invalid(format!("{context}: must be an object")));
        }
        require_kind(training, "exerciseDayId", &context, Value::is_number, "number")?;
        require_kind(training, "date", &context, Value::is_number, "number")?;
        require_array(training, "sets", &context)?;
    }

    Ok(())
}

/// Checks serde cannot express on its own.
fn check_values(document: &BackupDocument) -> Result<()> {
    for (i, training) in document.trainings.iter().enumerate() {
        for set in &training.record.sets {
            if let Some(weight) = set.weight {
                volume::check_weight(weight).map_err(|e| {
                    invalid(format!("trainings[{i}]: set {} of exercise {}: {e}", set.set_number, set.exercise_id))
                })?;
            }
        }
    }
    Ok(())
}

/// Parse and validate backup text. Nothing is written.
pub fn parse(text: &str) -> Result<BackupDocument> {
    let value: Value = serde_json::from_str(text).map_err(|e| invalid(format!("not valid JSON: {e}")))?;
    validate(&value)?;
    let document: BackupDocument = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    check_values(&document)?;
    debug!(
        version = document.version,
        exercises = document.exercises.len(),
        days = document.exercise_days.len(),
        trainings = document.trainings.len(),
        "backup parsed"
    );
    Ok(document)
}

/* ──────────────────────────────── import ──────────────────────────────── */

/// Apply a document in the given mode. Any failure rolls everything back and
/// surfaces as [`Error::Transaction`].
pub async fn import(pool: &DB, document: &BackupDocument, mode: ImportMode) -> Result<MergeSummary> {
    match mode {
        ImportMode::Replace => {
            import_replace(pool, document).await?;
            Ok(MergeSummary {
                exercises_added: document.exercises.len(),
                exercise_days_added: document.exercise_days.len(),
                trainings_added: document.trainings.len(),
            })
        }
        ImportMode::Merge => import_merge(pool, document).await,
    }
}

/// Wipe every collection and load the document as-is.
pub async fn import_replace(pool: &DB, document: &BackupDocument) -> Result<()> {
    let mut tx = pool.begin().await.map_err(|e| Error::from(e).rolled_back())?;
    replace_all(&mut tx, document).await.map_err(Error::rolled_back)?;
    tx.commit().await.map_err(|e| Error::from(e).rolled_back())?;
    info!(
        exercises = document.exercises.len(),
        days = document.exercise_days.len(),
        trainings = document.trainings.len(),
        "backup restored"
    );
    Ok(())
}

async fn replace_all(conn: &mut SqliteConnection, document: &BackupDocument) -> Result<()> {
    store::trainings::clear(&mut *conn).await?;
    store::exercise_days::clear(&mut *conn).await?;
    store::exercises::clear(&mut *conn).await?;
    store::settings::clear(&mut *conn).await?;

    // Records carrying an id go in first so fresh ids cannot take theirs.
    for entry in document.exercises.iter().filter(|e| e.id.is_some()) {
        if let Some(id) = entry.id {
            store::exercises::insert_with_id(&mut *conn, &entry.record.clone().with_id(id)).await?;
        }
    }
    for entry in document.exercises.iter().filter(|e| e.id.is_none()) {
        store::exercises::insert(&mut *conn, &entry.record).await?;
    }

    for entry in document.exercise_days.iter().filter(|e| e.id.is_some()) {
        if let Some(id) = entry.id {
            store::exercise_days::insert_with_id(&mut *conn, &entry.record.clone().with_id(id)).await?;
        }
    }
    for entry in document.exercise_days.iter().filter(|e| e.id.is_none()) {
        store::exercise_days::insert(&mut *conn, &entry.record).await?;
    }

    for entry in document.trainings.iter().filter(|e| e.id.is_some()) {
        if let Some(id) = entry.id {
            store::trainings::insert_with_id(&mut *conn, &entry.record.clone().with_id(id)).await?;
        }
    }
    for entry in document.trainings.iter().filter(|e| e.id.is_none()) {
        store::trainings::insert(&mut *conn, &entry.record).await?;
    }

    if let Some(settings) = &document.settings {
        store::settings::put(&mut *conn, settings).await?;
    }
    Ok(())
}

/// Add what the database does not have yet, matching exercises and days by
/// name (ignoring case) and sessions by (template, date).
pub async fn import_merge(pool: &DB, document: &BackupDocument) -> Result<MergeSummary> {
    let mut tx = pool.begin().await.map_err(|e| Error::from(e).rolled_back())?;
    let summary = merge_into(&mut tx, document).await.map_err(Error::rolled_back)?;
    tx.commit().await.map_err(|e| Error::from(e).rolled_back())?;
    info!(
        exercises = summary.exercises_added,
        days = summary.exercise_days_added,
        trainings = summary.trainings_added,
        "backup merged"
    );
    Ok(summary)
}

async fn merge_into(conn: &mut SqliteConnection, document: &BackupDocument) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();

    let mut exercise_by_name: HashMap<String, ExerciseId> = store::exercises::all(&mut *conn)
        .await?
        .into_iter()
        .map(|e| (name_key(&e.name), e.id))
        .collect();
    let mut day_by_name: HashMap<String, ExerciseDayId> = store::exercise_days::all(&mut *conn)
        .await?
        .into_iter()
        .map(|d| (name_key(&d.name), d.id))
        .collect();
    let mut training_keys: HashSet<(ExerciseDayId, Timestamp)> = store::trainings::all(&mut *conn)
        .await?
        .into_iter()
        .map(|t| (t.exercise_day_id, t.date))
        .collect();

    let mut exercise_map: HashMap<ExerciseId, ExerciseId> = HashMap::new();
    for entry in &document.exercises {
        let key = name_key(&entry.record.name);
        let target = match exercise_by_name.get(&key) {
            Some(existing) => *existing,
            None => {
                let id = store::exercises::insert(&mut *conn, &entry.record).await?;
                exercise_by_name.insert(key, id);
                summary.exercises_added += 1;
                id
            }
        };
        if let Some(old) = entry.id {
            exercise_map.insert(old, target);
        }
    }
    let remap_exercise = |id: ExerciseId| exercise_map.get(&id).copied().unwrap_or(id);

    let mut day_map: HashMap<ExerciseDayId, ExerciseDayId> = HashMap::new();
    for entry in &document.exercise_days {
        let key = name_key(&entry.record.name);
        let target = match day_by_name.get(&key) {
            Some(existing) => *existing,
            None => {
                let mut day = entry.record.clone();
                for config in &mut day.exercises {
                    config.exercise_id = remap_exercise(config.exercise_id);
                }
                let id = store::exercise_days::insert(&mut *conn, &day).await?;
                day_by_name.insert(key, id);
                summary.exercise_days_added += 1;
                id
            }
        };
        if let Some(old) = entry.id {
            day_map.insert(old, target);
        }
    }

    let known_days: HashSet<ExerciseDayId> = day_by_name.values().copied().collect();
    for entry in &document.trainings {
        let mut training = entry.record.clone();
        training.exercise_day_id = day_map
            .get(&training.exercise_day_id)
            .copied()
            .unwrap_or(training.exercise_day_id);

        if !training_keys.insert((training.exercise_day_id, training.date)) {
            continue;
        }
        if !known_days.contains(&training.exercise_day_id) {
            warn!(day = %training.exercise_day_id, date = training.date, "imported training references an unknown exercise day");
        }
        for set in &mut training.sets {
            set.exercise_id = remap_exercise(set.exercise_id);
        }
        store::trainings::insert(&mut *conn, &training).await?;
        summary.trainings_added += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn minimal() -> Value {
        json!({
            "version": 1,
            "exportDate": 1_700_000_000_000_i64,
            "exercises": [{ "id": 1, "name": "Bench", "category": "chest" }],
            "exerciseDays": [{
                "id": 1,
                "name": "Push",
                "category": "push",
                "exercises": [{ "exerciseId": 1, "numberOfSets": 3, "position": 0 }]
            }],
            "trainings": [{
                "id": 1,
                "exerciseDayId": 1,
                "date": 1_700_000_000_000_i64,
                "sets": [{ "exerciseId": 1, "setNumber": 1, "weight": 80, "repetitions": 10, "skipped": false }],
                "totalVolume": 800,
                "completed": true
            }],
            "settings": null
        })
    }

    #[test]
    fn minimal_document_parses() {
        let doc = parse(&minimal().to_string()).unwrap();
        assert_eq!(doc.exercises[0].id, Some(ExerciseId(1)));
        assert_eq!(doc.exercise_days[0].record.exercises[0].number_of_sets, 3);
        assert_eq!(doc.trainings[0].record.sets[0].weight, Some(80.0));
        assert_eq!(doc.settings, None);
    }

    #[test]
    fn legacy_category_labels_are_accepted() {
        let mut value = minimal();
        value["exercises"][0]["category"] = json!("Brust");
        let doc = parse(&value.to_string()).unwrap();
        assert_eq!(doc.exercises[0].record.category, crate::types::MuscleCategory::Chest);
    }

    #[rstest]
    #[case::version_string("/version", json!("1"))]
    #[case::export_date_missing("/exportDate", Value::Null)]
    #[case::exercises_not_array("/exercises", json!({}))]
    #[case::exercise_name_number("/exercises/0/name", json!(5))]
    #[case::exercise_name_null("/exercises/0/name", Value::Null)]
    #[case::exercise_name_array("/exercises/0/name", json!(["Bench"]))]
    #[case::day_exercises_not_array("/exerciseDays/0/exercises", json!("none"))]
    #[case::training_day_not_number("/trainings/0/exerciseDayId", json!("1"))]
    #[case::training_sets_missing("/trainings/0/sets", Value::Null)]
    #[case::training_date_string("/trainings/0/date", json!("2024-01-01"))]
    #[case::training_date_null("/trainings/0/date", Value::Null)]
    fn structural_problems_are_rejected(#[case] pointer: &str, #[case] replacement: Value) {
        let mut value = minimal();
        *value.pointer_mut(pointer).unwrap() = replacement;
        assert!(matches!(validate(&value), Err(Error::Validation(_))));
        assert!(matches!(parse(&value.to_string()), Err(Error::Validation(_))));
    }

    #[rstest]
    #[case::exercise_name("/exercises/0", "name")]
    #[case::day_name("/exerciseDays/0", "name")]
    #[case::training_date("/trainings/0", "date")]
    #[case::training_day("/trainings/0", "exerciseDayId")]
    fn missing_required_fields_are_rejected(#[case] pointer: &str, #[case] field: &str) {
        let mut value = minimal();
        value.pointer_mut(pointer).and_then(Value::as_object_mut).unwrap().remove(field);
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains(field), "{err}");
        assert!(matches!(parse(&value.to_string()), Err(Error::Validation(_))));
    }

    #[rstest]
    #[case::unknown_category("/exercises/0/category", json!("wings"))]
    #[case::negative_weight("/trainings/0/sets/0/weight", json!(-5))]
    #[case::negative_reps("/trainings/0/sets/0/repetitions", json!(-1))]
    fn typed_problems_are_rejected(#[case] pointer: &str, #[case] replacement: Value) {
        let mut value = minimal();
        *value.pointer_mut(pointer).unwrap() = replacement;
        assert!(validate(&value).is_ok());
        assert!(matches!(parse(&value.to_string()), Err(Error::Validation(_))));
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(parse("{ not json"), Err(Error::Validation(_))));
        assert!(matches!(parse("[]"), Err(Error::Validation(_))));
    }

    #[test]
    fn entries_serialize_flat() {
        let doc = parse(&minimal().to_string()).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["exercises"][0]["id"], 1);
        assert_eq!(value["exercises"][0]["name"], "Bench");
        assert_eq!(value["exerciseDays"][0]["rotationOrder"], 0);
        assert_eq!(value["trainings"][0]["exerciseDayId"], 1);
    }
}
