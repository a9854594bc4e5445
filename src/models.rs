use serde::{Deserialize, Serialize};

use crate::types::{DayCategory, MuscleCategory, Theme};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Storage-assigned identity of an [`Exercise`].
    ExerciseId
);
entity_id!(
    /// Storage-assigned identity of an [`ExerciseDay`].
    ExerciseDayId
);
entity_id!(
    /// Storage-assigned identity of a [`Training`].
    TrainingId
);

/// An exercise that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExercise {
    pub name: String,
    pub category: MuscleCategory,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl NewExercise {
    pub fn new(name: impl Into<String>, category: MuscleCategory, focus: impl Into<String>, now: Timestamp) -> Self {
        Self {
            name: name.into(),
            category,
            focus: focus.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(self, id: ExerciseId) -> Exercise {
        Exercise {
            id,
            name: self.name,
            category: self.category,
            focus: self.focus,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub category: MuscleCategory,
    pub focus: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Exercise {
    pub fn to_draft(&self) -> NewExercise {
        NewExercise {
            name: self.name.clone(),
            category: self.category,
            focus: self.focus.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields of an exercise that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct ExercisePatch {
    pub name: Option<String>,
    pub category: Option<MuscleCategory>,
    pub focus: Option<String>,
}

/// One prescribed exercise inside a workout template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseConfig {
    pub exercise_id: ExerciseId,
    pub number_of_sets: u32,
    #[serde(default)]
    pub position: u32,
}

/// A workout template that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExerciseDay {
    pub name: String,
    pub category: DayCategory,
    pub exercises: Vec<ExerciseConfig>,
    #[serde(default)]
    pub rotation_order: i64,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl NewExerciseDay {
    pub fn with_id(self, id: ExerciseDayId) -> ExerciseDay {
        ExerciseDay {
            id,
            name: self.name,
            category: self.category,
            exercises: self.exercises,
            rotation_order: self.rotation_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A workout template ("exercise day").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDay {
    pub id: ExerciseDayId,
    pub name: String,
    pub category: DayCategory,
    pub exercises: Vec<ExerciseConfig>,
    pub rotation_order: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ExerciseDay {
    pub fn to_draft(&self) -> NewExerciseDay {
        NewExerciseDay {
            name: self.name.clone(),
            category: self.category,
            exercises: self.exercises.clone(),
            rotation_order: self.rotation_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Configs ordered by their display position.
    pub fn ordered_exercises(&self) -> Vec<ExerciseConfig> {
        let mut configs = self.exercises.clone();
        configs.sort_by_key(|c| c.position);
        configs
    }

    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|c| c.number_of_sets).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseDayPatch {
    pub name: Option<String>,
    pub category: Option<DayCategory>,
    pub exercises: Option<Vec<ExerciseConfig>>,
    pub rotation_order: Option<i64>,
}

/// Identifies one set of one exercise within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetKey {
    pub exercise_id: ExerciseId,
    pub set_number: u32,
}

impl SetKey {
    pub fn new(exercise_id: ExerciseId, set_number: u32) -> Self {
        Self {
            exercise_id,
            set_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetData {
    pub exercise_id: ExerciseId,
    pub set_number: u32,
    pub weight: Option<f64>,
    pub repetitions: Option<u32>,
    #[serde(default)]
    pub skipped: bool,
}

impl SetData {
    pub fn empty(exercise_id: ExerciseId, set_number: u32) -> Self {
        Self {
            exercise_id,
            set_number,
            weight: None,
            repetitions: None,
            skipped: false,
        }
    }

    pub fn key(&self) -> SetKey {
        SetKey::new(self.exercise_id, self.set_number)
    }

    /// Weight and repetitions, if the set was performed in full.
    pub fn performance(&self) -> Option<(f64, u32)> {
        if self.skipped {
            return None;
        }
        match (self.weight, self.repetitions) {
            (Some(w), Some(r)) => Some((w, r)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.performance().is_some()
    }

    /// Weight of a non-skipped set, whether or not reps were logged.
    pub fn lifted_weight(&self) -> Option<f64> {
        if self.skipped { None } else { self.weight }
    }
}

/// A finished session that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTraining {
    pub exercise_day_id: ExerciseDayId,
    pub date: Timestamp,
    pub sets: Vec<SetData>,
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

impl NewTraining {
    pub fn with_id(self, id: TrainingId) -> Training {
        Training {
            id,
            exercise_day_id: self.exercise_day_id,
            date: self.date,
            sets: self.sets,
            total_volume: self.total_volume,
            completed: self.completed,
        }
    }
}

/// One completed, timestamped performance of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Training {
    pub id: TrainingId,
    pub exercise_day_id: ExerciseDayId,
    pub date: Timestamp,
    pub sets: Vec<SetData>,
    pub total_volume: f64,
    pub completed: bool,
}

impl Training {
    pub fn to_draft(&self) -> NewTraining {
        NewTraining {
            exercise_day_id: self.exercise_day_id,
            date: self.date,
            sets: self.sets.clone(),
            total_volume: self.total_volume,
            completed: self.completed,
        }
    }

    pub fn set(&self, key: SetKey) -> Option<&SetData> {
        self.sets.iter().find(|s| s.key() == key)
    }

    pub fn contains_exercise(&self, exercise_id: ExerciseId) -> bool {
        self.sets.iter().any(|s| s.exercise_id == exercise_id)
    }

    pub fn sets_for(&self, exercise_id: ExerciseId) -> impl Iterator<Item = &SetData> {
        self.sets.iter().filter(move |s| s.exercise_id == exercise_id)
    }
}

/// Administrative corrections to a stored training.
#[derive(Debug, Clone, Default)]
pub struct TrainingPatch {
    pub exercise_day_id: Option<ExerciseDayId>,
    pub date: Option<Timestamp>,
    pub sets: Option<Vec<SetData>>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub last_exercise_day_id: Option<ExerciseDayId>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_rest_timer_duration")]
    pub rest_timer_duration: u32,
    #[serde(default = "default_rest_timer_volume")]
    pub rest_timer_volume: u32,
}

fn default_rest_timer_duration() -> u32 {
    120
}

fn default_rest_timer_volume() -> u32 {
    5
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_exercise_day_id: None,
            theme: Theme::Dark,
            rest_timer_duration: default_rest_timer_duration(),
            rest_timer_volume: default_rest_timer_volume(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub last_exercise_day_id: Option<Option<ExerciseDayId>>,
    pub theme: Option<Theme>,
    pub rest_timer_duration: Option<u32>,
    pub rest_timer_volume: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_set_has_no_performance() {
        let mut set = SetData::empty(ExerciseId(1), 1);
        set.weight = Some(80.0);
        set.repetitions = Some(10);
        assert_eq!(set.performance(), Some((80.0, 10)));

        set.skipped = true;
        assert!(!set.is_complete());
        assert_eq!(set.lifted_weight(), None);
    }

    #[test]
    fn training_serializes_with_camel_case_fields() {
        let training = NewTraining {
            exercise_day_id: ExerciseDayId(3),
            date: 1_700_000_000_000,
            sets: vec![SetData::empty(ExerciseId(7), 1)],
            total_volume: 0.0,
            completed: true,
        }
        .with_id(TrainingId(9));

        let json = serde_json::to_value(&training).unwrap();
        assert_eq!(json["exerciseDayId"], 3);
        assert_eq!(json["sets"][0]["setNumber"], 1);
        assert_eq!(json["totalVolume"], 0.0);
    }
}
