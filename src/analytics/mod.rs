//! Read-only statistics over training history.
//!
//! Every function takes history newest-first, the order
//! [`crate::store::trainings::all`] returns it in. Functions that need a
//! chronological scan sort their own copy.

mod averages;
mod stats;
mod trends;

use std::collections::HashMap;

pub use averages::{ExerciseAverage, MaxValues, SetAverage, exercise_average, last_training_sets, max_values, set_averages};
pub use stats::{
    DayVolumePoint, ExerciseStats, ExerciseVolumeShare, PersonalRecords, Record, SetProgressionPoint, TrainingStats,
    VolumePoint, count_prs_in_period, exercise_day_volume_history, exercise_set_numbers, exercise_stats,
    personal_records, set_progression, top_exercises_by_volume, training_stats, volume_by_category,
    volume_over_time,
};
pub use trends::{
    FocusExercise, FocusReason, ProgressTrend, Recommendation, Trend, exercises_needing_attention,
    next_session_recommendation, progress_trend, top_improvers,
};

use crate::models::{Exercise, ExerciseId, Training};

pub const DEFAULT_AVERAGE_WINDOW: usize = 5;
pub const DEFAULT_TREND_WINDOW: usize = 5;
pub const DEFAULT_ATTENTION_THRESHOLD: f64 = -3.0;
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Name shown for references to exercises that no longer exist.
pub const UNKNOWN_EXERCISE: &str = "unknown";

pub type ExerciseIndex<'a> = HashMap<ExerciseId, &'a Exercise>;

pub fn index_exercises(exercises: &[Exercise]) -> ExerciseIndex<'_> {
    exercises.iter().map(|e| (e.id, e)).collect()
}

/// A copy of `trainings` sorted oldest first.
fn chronological(trainings: &[Training]) -> Vec<&Training> {
    let mut sorted: Vec<&Training> = trainings.iter().collect();
    sorted.sort_by_key(|t| t.date);
    sorted
}

/// The last `limit` elements of an ascending list.
fn tail<T>(items: Vec<T>, limit: usize) -> Vec<T> {
    let skip = items.len().saturating_sub(limit);
    items.into_iter().skip(skip).collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Mean rounded to one decimal, 0 without samples.
    fn round1(self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            crate::utils::round1(self.sum / self.count as f64)
        }
    }
}
