//! The in-progress workout.
//!
//! A [`CurrentTraining`] is either idle or holds one [`ActiveTraining`]. All
//! mutations are synchronous and silently ignore unknown set keys; only
//! [`CurrentTraining::complete`] touches storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{
    Result,
    models::{ExerciseDay, ExerciseId, NewTraining, SetData, SetKey, Timestamp, TrainingId},
    store, volume,
};

/// Partial update applied to one set. `None` leaves a field untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetUpdate {
    pub weight: Option<Option<f64>>,
    pub repetitions: Option<Option<u32>>,
    pub skipped: Option<bool>,
}

impl SetUpdate {
    pub fn values(weight: f64, repetitions: u32) -> Self {
        Self {
            weight: Some(Some(weight)),
            repetitions: Some(Some(repetitions)),
            skipped: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Snapshot", try_from = "Snapshot")]
pub struct ActiveTraining {
    exercise_day: ExerciseDay,
    sets: BTreeMap<SetKey, SetData>,
    started_at: Timestamp,
}

/// Wire form of an [`ActiveTraining`]: the set map flattened to a list.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    exercise_day: ExerciseDay,
    started_at: Timestamp,
    sets: Vec<SetData>,
}

impl From<ActiveTraining> for Snapshot {
    fn from(active: ActiveTraining) -> Self {
        Self {
            exercise_day: active.exercise_day,
            started_at: active.started_at,
            sets: active.sets.into_values().collect(),
        }
    }
}

impl TryFrom<Snapshot> for ActiveTraining {
    type Error = String;

    fn try_from(snapshot: Snapshot) -> std::result::Result<Self, Self::Error> {
        let mut sets = BTreeMap::new();
        for set in snapshot.sets {
            let key = set.key();
            if sets.insert(key, set).is_some() {
                return Err(format!(
                    "duplicate set {} of exercise {}",
                    key.set_number, key.exercise_id
                ));
            }
        }
        Ok(Self {
            exercise_day: snapshot.exercise_day,
            sets,
            started_at: snapshot.started_at,
        })
    }
}

impl ActiveTraining {
    fn new(exercise_day: &ExerciseDay, now: Timestamp) -> Self {
        let mut sets = BTreeMap::new();
        for config in &exercise_day.exercises {
            for set_number in 1..=config.number_of_sets {
                let set = SetData::empty(config.exercise_id, set_number);
                sets.insert(set.key(), set);
            }
        }
        Self {
            exercise_day: exercise_day.clone(),
            sets,
            started_at: now,
        }
    }

    pub fn exercise_day(&self) -> &ExerciseDay {
        &self.exercise_day
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn sets(&self) -> impl Iterator<Item = &SetData> {
        self.sets.values()
    }

    pub fn set(&self, key: SetKey) -> Option<&SetData> {
        self.sets.get(&key)
    }

    fn sets_of_mut(&mut self, exercise_id: ExerciseId) -> impl Iterator<Item = &mut SetData> {
        self.sets.values_mut().filter(move |s| s.exercise_id == exercise_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentTraining {
    active: Option<ActiveTraining>,
}

impl CurrentTraining {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveTraining> {
        self.active.as_ref()
    }

    pub fn exercise_day(&self) -> Option<&ExerciseDay> {
        self.active.as_ref().map(ActiveTraining::exercise_day)
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.active.as_ref().map(ActiveTraining::started_at)
    }

    /// Begin a session for `exercise_day`, discarding any session in progress.
    pub fn start(&mut self, exercise_day: &ExerciseDay, now: Timestamp) {
        if let Some(previous) = &self.active {
            debug!(day = %previous.exercise_day.name, "discarding unfinished session");
        }
        let active = ActiveTraining::new(exercise_day, now);
        debug!(day = %exercise_day.name, sets = active.sets.len(), "session started");
        self.active = Some(active);
    }

    fn set_mut(&mut self, exercise_id: ExerciseId, set_number: u32) -> Option<&mut SetData> {
        self.active
            .as_mut()?
            .sets
            .get_mut(&SetKey::new(exercise_id, set_number))
    }

    /// Apply `update` to one set. Rejects a negative or non-finite weight
    /// before touching anything; an unknown key is a no-op.
    pub fn update_set(&mut self, exercise_id: ExerciseId, set_number: u32, update: SetUpdate) -> Result<()> {
        if let Some(Some(weight)) = update.weight {
            volume::check_weight(weight)?;
        }
        let Some(set) = self.set_mut(exercise_id, set_number) else {
            return Ok(());
        };
        if let Some(weight) = update.weight {
            set.weight = weight;
        }
        if let Some(repetitions) = update.repetitions {
            set.repetitions = repetitions;
        }
        if let Some(skipped) = update.skipped {
            set.skipped = skipped;
        }
        if set.skipped {
            set.weight = None;
            set.repetitions = None;
        }
        Ok(())
    }

    pub fn skip_set(&mut self, exercise_id: ExerciseId, set_number: u32) {
        if let Some(set) = self.set_mut(exercise_id, set_number) {
            skip(set);
        }
    }

    /// Clears the skip flag. Numbers cleared by the skip stay cleared.
    pub fn unskip_set(&mut self, exercise_id: ExerciseId, set_number: u32) {
        if let Some(set) = self.set_mut(exercise_id, set_number) {
            set.skipped = false;
        }
    }

    pub fn skip_exercise(&mut self, exercise_id: ExerciseId) {
        if let Some(active) = &mut self.active {
            active.sets_of_mut(exercise_id).for_each(skip);
        }
    }

    /// Copy set 1's numbers to every later non-skipped set of the exercise.
    pub fn fill_first_values(&mut self, exercise_id: ExerciseId) {
        let Some(active) = &mut self.active else {
            return;
        };
        let Some((weight, repetitions)) = active
            .sets
            .get(&SetKey::new(exercise_id, 1))
            .and_then(|first| first.weight.zip(first.repetitions))
        else {
            return;
        };

        for set in active.sets_of_mut(exercise_id) {
            if set.set_number > 1 && !set.skipped {
                set.weight = Some(weight);
                set.repetitions = Some(repetitions);
            }
        }
    }

    /// Copy numbers from a previous session's sets onto the matching sets.
    pub fn fill_last_values(&mut self, exercise_id: ExerciseId, reference: &[SetData]) {
        let Some(active) = &mut self.active else {
            return;
        };
        for last in reference {
            if last.exercise_id != exercise_id || last.skipped {
                continue;
            }
            if let Some(current) = active.sets.get_mut(&last.key()) {
                if !current.skipped {
                    current.weight = last.weight;
                    current.repetitions = last.repetitions;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        if let Some(active) = &mut self.active {
            for set in active.sets.values_mut() {
                set.weight = None;
                set.repetitions = None;
                set.skipped = false;
            }
        }
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// The record this session would produce if completed at `now`.
    pub fn finish(&self, now: Timestamp) -> Option<NewTraining> {
        let active = self.active.as_ref()?;
        let sets: Vec<SetData> = active.sets.values().cloned().collect();
        Some(NewTraining {
            exercise_day_id: active.exercise_day.id,
            date: now,
            total_volume: volume::total_volume(&sets),
            sets,
            completed: true,
        })
    }

    /// Persist the session and return to idle.
    ///
    /// Returns `None` when idle. If the insert fails the session is left
    /// active and untouched.
    pub async fn complete(&mut self, pool: &SqlitePool, now: Timestamp) -> Result<Option<TrainingId>> {
        let Some(draft) = self.finish(now) else {
            return Ok(None);
        };
        let id = store::trainings::insert(pool, &draft).await?;
        info!(%id, volume = draft.total_volume, "session completed");
        self.active = None;
        Ok(Some(id))
    }

    pub fn current_volume(&self) -> f64 {
        self.active
            .as_ref()
            .map(|a| volume::total_volume(a.sets.values()))
            .unwrap_or(0.0)
    }

    /// Share of sets that are done or skipped, as a rounded percentage.
    pub fn completion_percentage(&self) -> u32 {
        let Some(active) = &self.active else {
            return 0;
        };
        let total = active.sets.len();
        if total == 0 {
            return 0;
        }
        let done = active
            .sets
            .values()
            .filter(|s| s.skipped || (s.weight.is_some() && s.repetitions.is_some()))
            .count();
        (done as f64 / total as f64 * 100.0).round() as u32
    }

    /// Sets of one exercise ordered by set number.
    pub fn sets_for_exercise(&self, exercise_id: ExerciseId) -> Vec<SetData> {
        // BTreeMap order is (exercise, set number) already.
        self.active
            .as_ref()
            .map(|a| a.sets.values().filter(|s| s.exercise_id == exercise_id).cloned().collect())
            .unwrap_or_default()
    }
}

fn skip(set: &mut SetData) {
    set.skipped = true;
    set.weight = None;
    set.repetitions = None;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        models::{ExerciseConfig, ExerciseDayId, NewExerciseDay},
        types::DayCategory,
    };

    const BENCH: ExerciseId = ExerciseId(1);
    const FLY: ExerciseId = ExerciseId(2);

    fn push_day() -> ExerciseDay {
        NewExerciseDay {
            name: "Push A".into(),
            category: DayCategory::Push,
            exercises: vec![
                ExerciseConfig {
                    exercise_id: BENCH,
                    number_of_sets: 3,
                    position: 0,
                },
                ExerciseConfig {
                    exercise_id: FLY,
                    number_of_sets: 2,
                    position: 1,
                },
            ],
            rotation_order: 0,
            created_at: 0,
            updated_at: 0,
        }
        .with_id(ExerciseDayId(4))
    }

    fn started() -> CurrentTraining {
        let mut training = CurrentTraining::new();
        training.start(&push_day(), 1_000);
        training
    }

    fn set_of(training: &CurrentTraining, exercise: ExerciseId, n: u32) -> SetData {
        training.active().unwrap().set(SetKey::new(exercise, n)).unwrap().clone()
    }

    #[test]
    fn start_creates_one_empty_set_per_key() {
        let training = started();
        let active = training.active().unwrap();

        let keys: Vec<_> = active.sets().map(|s| (s.exercise_id.0, s.set_number)).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
        assert!(active.sets().all(|s| s.weight.is_none() && s.repetitions.is_none() && !s.skipped));
        assert_eq!(training.started_at(), Some(1_000));
        assert_eq!(training.completion_percentage(), 0);
    }

    #[test]
    fn starting_again_discards_previous_session() {
        let mut training = started();
        training.update_set(BENCH, 1, SetUpdate::values(80.0, 10)).unwrap();
        training.start(&push_day(), 2_000);
        assert_eq!(set_of(&training, BENCH, 1).weight, None);
        assert_eq!(training.started_at(), Some(2_000));
    }

    #[test]
    fn skip_and_unskip() {
        let mut training = started();
        training.update_set(BENCH, 2, SetUpdate::values(80.0, 8)).unwrap();
        training.skip_set(BENCH, 2);

        let skipped = set_of(&training, BENCH, 2);
        assert!(skipped.skipped);
        assert_eq!((skipped.weight, skipped.repetitions), (None, None));

        training.unskip_set(BENCH, 2);
        let unskipped = set_of(&training, BENCH, 2);
        assert!(!unskipped.skipped);
        assert_eq!((unskipped.weight, unskipped.repetitions), (None, None));
    }

    #[test]
    fn update_that_skips_clears_numbers() {
        let mut training = started();
        training
            .update_set(
                FLY,
                1,
                SetUpdate {
                    weight: Some(Some(20.0)),
                    repetitions: None,
                    skipped: Some(true),
                },
            )
            .unwrap();
        let set = set_of(&training, FLY, 1);
        assert!(set.skipped);
        assert_eq!(set.weight, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut training = started();
        let before = training.clone();
        training.update_set(BENCH, 9, SetUpdate::values(1.0, 1)).unwrap();
        training.skip_set(ExerciseId(77), 1);
        assert_eq!(training, before);

        let mut idle = CurrentTraining::new();
        idle.skip_exercise(BENCH);
        idle.reset();
        assert!(!idle.is_active());
    }

    #[rstest]
    #[case::negative(-2.5)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn bad_weights_are_rejected_before_any_change(#[case] weight: f64) {
        let mut training = started();
        training.update_set(BENCH, 1, SetUpdate::values(80.0, 10)).unwrap();
        let before = training.clone();

        let err = training.update_set(BENCH, 1, SetUpdate::values(weight, 5)).unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)), "{err}");
        assert_eq!(training, before);

        // Zero is a valid bodyweight entry.
        training.update_set(BENCH, 2, SetUpdate::values(0.0, 12)).unwrap();
        assert_eq!(set_of(&training, BENCH, 2).performance(), Some((0.0, 12)));
    }

    #[test]
    fn fill_first_copies_to_non_skipped_sets() {
        let mut training = started();
        training.skip_set(BENCH, 3);
        training.update_set(BENCH, 1, SetUpdate::values(80.0, 10)).unwrap();
        training.fill_first_values(BENCH);

        assert_eq!(set_of(&training, BENCH, 2).performance(), Some((80.0, 10)));
        assert!(set_of(&training, BENCH, 3).skipped);
        assert_eq!(set_of(&training, BENCH, 3).weight, None);
    }

    #[test]
    fn fill_first_needs_complete_first_set() {
        let mut training = started();
        training
            .update_set(
                BENCH,
                1,
                SetUpdate {
                    weight: Some(Some(80.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        training.fill_first_values(BENCH);
        assert_eq!(set_of(&training, BENCH, 2).weight, None);
    }

    #[test]
    fn fill_last_matches_set_numbers() {
        let mut training = started();
        training.skip_set(BENCH, 2);
        let reference = vec![
            SetData {
                weight: Some(75.0),
                repetitions: Some(9),
                ..SetData::empty(BENCH, 1)
            },
            SetData {
                weight: Some(77.5),
                repetitions: Some(8),
                ..SetData::empty(BENCH, 2)
            },
            SetData {
                skipped: true,
                ..SetData::empty(BENCH, 3)
            },
            SetData {
                weight: Some(20.0),
                repetitions: Some(12),
                ..SetData::empty(FLY, 1)
            },
        ];
        training.fill_last_values(BENCH, &reference);

        assert_eq!(set_of(&training, BENCH, 1).performance(), Some((75.0, 9)));
        assert!(set_of(&training, BENCH, 2).skipped);
        assert_eq!(set_of(&training, BENCH, 3).weight, None);
        assert_eq!(set_of(&training, FLY, 1).weight, None);
    }

    #[test]
    fn reset_keeps_keys() {
        let mut training = started();
        training.update_set(BENCH, 1, SetUpdate::values(80.0, 10)).unwrap();
        training.skip_exercise(FLY);
        training.reset();

        let active = training.active().unwrap();
        assert_eq!(active.sets().count(), 5);
        assert!(active.sets().all(|s| !s.skipped && s.weight.is_none()));
    }

    #[test]
    fn volume_and_completion() {
        let mut training = started();
        training.update_set(BENCH, 1, SetUpdate::values(100.0, 5)).unwrap();
        training.update_set(BENCH, 2, SetUpdate::values(90.0, 6)).unwrap();
        training.skip_set(FLY, 2);

        assert_eq!(training.current_volume(), 1040.0);
        assert_eq!(training.completion_percentage(), 60);

        training.cancel();
        assert_eq!(training.current_volume(), 0.0);
        assert_eq!(training.completion_percentage(), 0);
    }

    #[test]
    fn finish_builds_training_draft() {
        let mut training = started();
        training.update_set(FLY, 1, SetUpdate::values(20.0, 12)).unwrap();

        let draft = training.finish(5_000).unwrap();
        assert_eq!(draft.exercise_day_id, ExerciseDayId(4));
        assert_eq!(draft.date, 5_000);
        assert_eq!(draft.sets.len(), 5);
        assert_eq!(draft.total_volume, 240.0);
        assert!(draft.completed);
        assert!(CurrentTraining::new().finish(5_000).is_none());
    }

    #[test]
    fn sets_for_exercise_are_ordered() {
        let training = started();
        let numbers: Vec<u32> = training.sets_for_exercise(BENCH).iter().map(|s| s.set_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(training.sets_for_exercise(ExerciseId(99)).is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let mut training = started();
        training.update_set(BENCH, 1, SetUpdate::values(80.0, 10)).unwrap();
        training.skip_set(FLY, 2);

        let json = serde_json::to_string(&training).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["active"]["sets"].is_array());

        let restored: CurrentTraining = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, training);

        let idle = serde_json::to_string(&CurrentTraining::new()).unwrap();
        assert_eq!(idle, r#"{"active":null}"#);
    }

    #[test]
    fn snapshot_with_duplicate_keys_is_rejected() {
        let json = serde_json::json!({
            "active": {
                "exerciseDay": push_day(),
                "startedAt": 1,
                "sets": [SetData::empty(BENCH, 1), SetData::empty(BENCH, 1)],
            }
        });
        assert!(serde_json::from_value::<CurrentTraining>(json).is_err());
    }
}
