use pretty_assertions::assert_eq;
use pushpull::{
    Error,
    backup::{self, BackupDocument, BackupEntry, ImportMode, MergeSummary},
    db::{self, DB},
    models::{ExerciseConfig, ExerciseId, NewExercise, NewTraining, SetData, Training},
    store,
    types::{DayCategory, MuscleCategory},
    volume,
};

const T0: i64 = 1_700_000_000_000;

fn performed(exercise: ExerciseId, n: u32, weight: f64, reps: u32) -> SetData {
    SetData {
        weight: Some(weight),
        repetitions: Some(reps),
        ..SetData::empty(exercise, n)
    }
}

/// Two exercises, one push day using both, two trainings of it.
async fn seeded() -> DB {
    let pool = db::open_in_memory().await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let bench = store::exercises::create(&mut conn, NewExercise::new("Bench Press", MuscleCategory::Chest, "", T0))
        .await
        .unwrap();
    let dips = store::exercises::create(&mut conn, NewExercise::new("Dips", MuscleCategory::Triceps, "", T0))
        .await
        .unwrap();
    let push = store::exercise_days::create(
        &mut conn,
        "Push",
        DayCategory::Push,
        vec![
            ExerciseConfig {
                exercise_id: bench.id,
                number_of_sets: 2,
                position: 0,
            },
            ExerciseConfig {
                exercise_id: dips.id,
                number_of_sets: 1,
                position: 1,
            },
        ],
        None,
        T0,
    )
    .await
    .unwrap();

    for (offset, weight) in [(0, 80.0), (1, 82.5)] {
        let sets = vec![
            performed(bench.id, 1, weight, 5),
            performed(bench.id, 2, weight, 5),
            performed(dips.id, 1, 0.0, 12),
        ];
        let training = NewTraining {
            exercise_day_id: push.id,
            date: T0 + offset * 86_400_000,
            total_volume: volume::total_volume(&sets),
            sets,
            completed: true,
        };
        store::trainings::insert(&mut *conn, &training).await.unwrap();
    }
    drop(conn);
    pool
}

async fn snapshot(pool: &DB) -> BackupDocument {
    let mut doc = backup::export(pool, T0).await.unwrap();
    doc.export_date = 0;
    doc
}

fn training_names(trainings: &[Training], pool_exercises: &[pushpull::models::Exercise]) -> Vec<Vec<String>> {
    trainings
        .iter()
        .map(|t| {
            t.sets
                .iter()
                .map(|s| {
                    pool_exercises
                        .iter()
                        .find(|e| e.id == s.exercise_id)
                        .map(|e| e.name.clone())
                        .unwrap_or_else(|| format!("dangling {}", s.exercise_id))
                })
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn export_then_replace_preserves_ids_and_records() {
    let source = seeded().await;
    let doc = backup::parse(&backup::to_json(&backup::export(&source, T0).await.unwrap()).unwrap()).unwrap();
    assert_eq!(doc.version, backup::BACKUP_VERSION);
    assert_eq!(doc.export_date, T0);

    let target = db::open_in_memory().await.unwrap();
    let mut conn = target.acquire().await.unwrap();
    store::exercises::create(&mut conn, NewExercise::new("Squat", MuscleCategory::Legs, "", 1))
        .await
        .unwrap();
    drop(conn);

    backup::import_replace(&target, &doc).await.unwrap();

    assert_eq!(snapshot(&target).await, snapshot(&source).await);
    assert!(
        store::exercises::find_by_name(&target, "squat").await.unwrap().is_none(),
        "replace wipes what was there"
    );
}

#[tokio::test]
async fn records_without_ids_get_fresh_ones_on_replace() {
    let source = seeded().await;
    let mut doc = snapshot(&source).await;
    doc.exercises.push(BackupEntry::new(
        None,
        NewExercise::new("Overhead Press", MuscleCategory::Shoulders, "", T0),
    ));

    let target = db::open_in_memory().await.unwrap();
    backup::import_replace(&target, &doc).await.unwrap();

    let press = store::exercises::find_by_name(&target, "overhead press")
        .await
        .unwrap()
        .unwrap();
    assert!(doc.exercises.iter().filter_map(|e| e.id).all(|id| id != press.id));
    assert_eq!(store::exercises::all(&target).await.unwrap().len(), 3);
}

#[tokio::test]
async fn failing_replace_leaves_data_unchanged() {
    let pool = seeded().await;
    let before = snapshot(&pool).await;

    let mut doc = before.clone();
    // Same id twice violates the primary key half-way through the import.
    let duplicate = doc.exercises[0].clone();
    doc.exercises.push(duplicate);

    let err = backup::import_replace(&pool, &doc).await.unwrap_err();
    assert!(matches!(err, Error::Transaction(_)), "{err}");
    assert_eq!(snapshot(&pool).await, before);
}

#[tokio::test]
async fn failing_merge_leaves_data_unchanged() {
    let target = seeded().await;
    let before = snapshot(&target).await;

    let mut doc = before.clone();
    doc.exercises.push(BackupEntry::new(
        Some(ExerciseId(50)),
        NewExercise::new("Pull Up", MuscleCategory::Back, "", T0),
    ));
    let late_date = T0 + 10 * 86_400_000;
    let mut late = doc.trainings[0].clone();
    late.id = None;
    late.record.date = late_date;
    late.record.sets.push(performed(ExerciseId(404), 1, 20.0, 5));
    doc.trainings.push(late);

    // The new exercise goes in first, then the late training hits a storage error.
    sqlx::query(&format!(
        "CREATE TRIGGER reject_late_training BEFORE INSERT ON trainings
         WHEN NEW.date = {late_date}
         BEGIN SELECT RAISE(ABORT, 'disk full'); END"
    ))
    .execute(&target)
    .await
    .unwrap();

    let err = backup::import(&target, &doc, ImportMode::Merge).await.unwrap_err();
    assert!(matches!(err, Error::Transaction(_)), "{err}");

    assert_eq!(snapshot(&target).await, before);
    assert!(store::exercises::find_by_name(&target, "pull up").await.unwrap().is_none());
    assert_eq!(store::trainings::count(&target).await.unwrap(), 2);
}

#[tokio::test]
async fn merge_into_empty_database_then_again_adds_nothing() {
    let source = seeded().await;
    let doc = snapshot(&source).await;
    let target = db::open_in_memory().await.unwrap();

    let first = backup::import(&target, &doc, ImportMode::Merge).await.unwrap();
    assert_eq!(first, MergeSummary {
        exercises_added: 2,
        exercise_days_added: 1,
        trainings_added: 2,
    });

    let second = backup::import_merge(&target, &doc).await.unwrap();
    assert_eq!(second, MergeSummary::default());
    assert_eq!(store::trainings::count(&target).await.unwrap(), 2);
}

#[tokio::test]
async fn merge_remaps_ids_onto_existing_records() {
    let source = seeded().await;
    let doc = snapshot(&source).await;

    // Target already knows "bench press" under another id and spelling.
    let target = db::open_in_memory().await.unwrap();
    let mut conn = target.acquire().await.unwrap();
    store::exercises::create(&mut conn, NewExercise::new("Deadlift", MuscleCategory::Back, "", 1))
        .await
        .unwrap();
    store::exercises::create(&mut conn, NewExercise::new("Deadlift Deficit", MuscleCategory::Back, "", 1))
        .await
        .unwrap();
    let bench = store::exercises::create(&mut conn, NewExercise::new("BENCH PRESS", MuscleCategory::Chest, "", 1))
        .await
        .unwrap();
    drop(conn);

    let summary = backup::import_merge(&target, &doc).await.unwrap();
    assert_eq!(summary.exercises_added, 1);
    assert_eq!(summary.exercise_days_added, 1);
    assert_eq!(summary.trainings_added, 2);

    let exercises = store::exercises::all(&target).await.unwrap();
    let push = store::exercise_days::find_by_name(&target, "push").await.unwrap().unwrap();
    let dips = exercises.iter().find(|e| e.name == "Dips").unwrap();
    assert_eq!(
        push.ordered_exercises().iter().map(|c| c.exercise_id).collect::<Vec<_>>(),
        vec![bench.id, dips.id]
    );

    let trainings = store::trainings::all(&target).await.unwrap();
    assert!(trainings.iter().all(|t| t.exercise_day_id == push.id));
    for names in training_names(&trainings, &exercises) {
        assert_eq!(names, vec!["BENCH PRESS", "BENCH PRESS", "Dips"]);
    }
}

#[tokio::test]
async fn duplicates_inside_one_document_are_imported_once() {
    let source = seeded().await;
    let mut doc = snapshot(&source).await;
    let mut twin = doc.exercises[0].clone();
    twin.id = Some(ExerciseId(99));
    twin.record.name = twin.record.name.to_uppercase();
    doc.exercises.push(twin);
    let repeat = doc.trainings[0].clone();
    doc.trainings.push(repeat);

    let target = db::open_in_memory().await.unwrap();
    let summary = backup::import_merge(&target, &doc).await.unwrap();
    assert_eq!(summary, MergeSummary {
        exercises_added: 2,
        exercise_days_added: 1,
        trainings_added: 2,
    });
}

#[tokio::test]
async fn invalid_documents_never_reach_the_database() {
    let pool = seeded().await;
    let before = snapshot(&pool).await;

    for text in [
        r#"{"version":1}"#,
        r#"{"version":1,"exportDate":0,"exercises":[{"name":"x"}],"exerciseDays":[],"trainings":[]}"#,
        "not json at all",
    ] {
        assert!(matches!(backup::parse(text), Err(Error::Validation(_))), "{text}");
    }
    assert_eq!(snapshot(&pool).await, before);
}
