use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use super::{ExerciseIndex, Mean, UNKNOWN_EXERCISE, chronological, tail};
use crate::{
    models::{ExerciseDayId, ExerciseId, SetKey, Timestamp, Training},
    types::MuscleCategory,
    utils::{self, DAY_MS},
    volume,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStats {
    pub total_sessions: usize,
    pub total_volume: f64,
    pub avg_volume_per_session: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub sessions_this_week: usize,
    pub sessions_this_month: usize,
}

pub fn training_stats(trainings: &[Training], now: Timestamp) -> TrainingStats {
    let total_sessions = trainings.len();
    let total_volume: f64 = trainings.iter().map(|t| t.total_volume).sum();
    let avg_volume_per_session = if total_sessions > 0 {
        (total_volume / total_sessions as f64).round()
    } else {
        0.0
    };

    let week_start = now - 7 * DAY_MS;
    let month_start = now - 30 * DAY_MS;
    let (current_streak, longest_streak) = streaks(trainings, now);

    TrainingStats {
        total_sessions,
        total_volume: total_volume.round(),
        avg_volume_per_session,
        current_streak,
        longest_streak,
        sessions_this_week: trainings.iter().filter(|t| t.date >= week_start).count(),
        sessions_this_month: trainings.iter().filter(|t| t.date >= month_start).count(),
    }
}

/// Current and longest run of consecutive local calendar days with at least
/// one session. The current run only counts if it reaches today or yesterday.
fn streaks(trainings: &[Training], now: Timestamp) -> (u32, u32) {
    let days: Vec<NaiveDate> = trainings
        .iter()
        .filter_map(|t| utils::local_date(t.date))
        .sorted()
        .rev()
        .dedup()
        .collect();

    let (Some(&most_recent), Some(today)) = (days.first(), utils::local_date(now)) else {
        return (0, 0);
    };

    let consecutive = |newer: NaiveDate, older: NaiveDate| (newer - older).num_days() == 1;

    let mut current = 0;
    if (today - most_recent).num_days() <= 1 {
        current = 1;
        for (newer, older) in days.iter().tuple_windows() {
            if !consecutive(*newer, *older) {
                break;
            }
            current += 1;
        }
    }

    let mut longest = 1;
    let mut run = 1;
    for (newer, older) in days.iter().tuple_windows() {
        if consecutive(*newer, *older) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }

    (current, longest)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStats {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub total_volume: f64,
    pub max_weight: f64,
    pub max_weight_date: Option<Timestamp>,
    pub avg_weight: f64,
    pub avg_reps: f64,
    pub session_count: usize,
}

pub fn exercise_stats(trainings: &[Training], exercise_id: ExerciseId, exercises: &ExerciseIndex<'_>) -> ExerciseStats {
    let relevant: Vec<&Training> = trainings.iter().filter(|t| t.contains_exercise(exercise_id)).collect();
    let maxima = super::max_values(trainings, exercise_id);

    let mut weight = Mean::default();
    let mut reps = Mean::default();
    for (w, r) in relevant
        .iter()
        .flat_map(|t| t.sets_for(exercise_id))
        .filter_map(|s| s.performance())
    {
        weight.add(w);
        reps.add(f64::from(r));
    }

    ExerciseStats {
        exercise_id,
        exercise_name: exercises
            .get(&exercise_id)
            .map_or_else(|| UNKNOWN_EXERCISE.to_string(), |e| e.name.clone()),
        total_volume: relevant
            .iter()
            .map(|t| volume::exercise_volume(&t.sets, exercise_id))
            .sum(),
        max_weight: maxima.max_weight,
        max_weight_date: maxima.max_weight_date,
        avg_weight: weight.round1(),
        avg_reps: reps.round1(),
        session_count: relevant.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumePoint {
    pub date: Timestamp,
    pub volume: f64,
    pub exercise_day_id: ExerciseDayId,
}

/// The last `limit` sessions, oldest first.
pub fn volume_over_time(trainings: &[Training], limit: usize) -> Vec<VolumePoint> {
    let points = chronological(trainings)
        .into_iter()
        .map(|t| VolumePoint {
            date: t.date,
            volume: t.total_volume,
            exercise_day_id: t.exercise_day_id,
        })
        .collect();
    tail(points, limit)
}

/// Volume of completed sets per muscle category. Sets of exercises that no
/// longer exist are left out.
pub fn volume_by_category(trainings: &[Training], exercises: &ExerciseIndex<'_>) -> BTreeMap<MuscleCategory, f64> {
    let mut by_category = BTreeMap::new();
    for set in trainings.iter().flat_map(|t| &t.sets) {
        let Some(exercise) = exercises.get(&set.exercise_id) else {
            continue;
        };
        if set.is_complete() {
            *by_category.entry(exercise.category).or_insert(0.0) += volume::set_volume(set);
        }
    }
    by_category
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Record {
    pub value: f64,
    pub date: Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PersonalRecords {
    pub weight: Option<Record>,
    pub volume: Option<Record>,
}

/// Heaviest single set and biggest single-session volume for an exercise.
pub fn personal_records(trainings: &[Training], exercise_id: ExerciseId) -> PersonalRecords {
    let mut records = PersonalRecords::default();

    for training in trainings {
        let mut session_volume = 0.0;
        for (weight, reps) in training.sets_for(exercise_id).filter_map(|s| s.performance()) {
            if records.weight.is_none_or(|r| weight > r.value) {
                records.weight = Some(Record {
                    value: weight,
                    date: training.date,
                });
            }
            session_volume += weight * f64::from(reps);
        }

        if session_volume > 0.0 && records.volume.is_none_or(|r| session_volume > r.value) {
            records.volume = Some(Record {
                value: session_volume,
                date: training.date,
            });
        }
    }

    records
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayVolumePoint {
    pub date: Timestamp,
    pub volume: f64,
    pub pr_count: u32,
}

/// Last `limit` sessions of one template, oldest first, each with the number
/// of sets that beat the best weight seen so far in that history.
pub fn exercise_day_volume_history(
    trainings: &[Training],
    exercise_day_id: ExerciseDayId,
    limit: usize,
) -> Vec<DayVolumePoint> {
    let day_trainings: Vec<&Training> = chronological(trainings)
        .into_iter()
        .filter(|t| t.exercise_day_id == exercise_day_id)
        .collect();

    let mut best: HashMap<ExerciseId, f64> = HashMap::new();
    tail(day_trainings, limit)
        .into_iter()
        .map(|training| {
            let mut pr_count = 0;
            for set in &training.sets {
                if let Some((weight, _)) = set.performance() {
                    if beats(&mut best, set.exercise_id, weight) {
                        pr_count += 1;
                    }
                }
            }
            DayVolumePoint {
                date: training.date,
                volume: training.total_volume,
                pr_count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseVolumeShare {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub category: MuscleCategory,
    pub total_volume: f64,
    pub percentage: f64,
}

/// Exercises of one template ranked by their accumulated volume.
pub fn top_exercises_by_volume(
    trainings: &[Training],
    exercise_day_id: ExerciseDayId,
    exercises: &ExerciseIndex<'_>,
    limit: usize,
) -> Vec<ExerciseVolumeShare> {
    let by_exercise = volume::volume_by_exercise(
        trainings
            .iter()
            .filter(|t| t.exercise_day_id == exercise_day_id)
            .flat_map(|t| &t.sets)
            .filter(|s| s.is_complete()),
    );
    let total: f64 = by_exercise.values().sum();

    by_exercise
        .into_iter()
        .filter_map(|(exercise_id, volume)| {
            let exercise = exercises.get(&exercise_id)?;
            Some(ExerciseVolumeShare {
                exercise_id,
                exercise_name: exercise.name.clone(),
                category: exercise.category,
                total_volume: volume,
                percentage: if total > 0.0 { volume / total * 100.0 } else { 0.0 },
            })
        })
        .sorted_by(|a, b| b.total_volume.total_cmp(&a.total_volume))
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetProgressionPoint {
    pub date: Timestamp,
    pub weight: f64,
    pub reps: u32,
    pub volume: f64,
}

/// How one particular set of an exercise developed over the last `limit`
/// sessions that had it. Sessions where it was not completed are dropped.
pub fn set_progression(
    trainings: &[Training],
    exercise_id: ExerciseId,
    set_number: u32,
    limit: usize,
) -> Vec<SetProgressionPoint> {
    let key = SetKey::new(exercise_id, set_number);
    let relevant: Vec<&Training> = chronological(trainings)
        .into_iter()
        .filter(|t| t.set(key).is_some())
        .collect();

    tail(relevant, limit)
        .into_iter()
        .filter_map(|t| {
            let (weight, reps) = t.set(key)?.performance()?;
            Some(SetProgressionPoint {
                date: t.date,
                weight,
                reps,
                volume: weight * f64::from(reps),
            })
        })
        .collect()
}

pub fn exercise_set_numbers(trainings: &[Training], exercise_id: ExerciseId) -> Vec<u32> {
    trainings
        .iter()
        .flat_map(|t| t.sets_for(exercise_id))
        .filter(|s| !s.skipped)
        .map(|s| s.set_number)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Number of weight records set on or after `start`.
///
/// Sessions before `start` only seed the running maxima, so a record counts
/// when it was beaten inside the window rather than merely standing there.
pub fn count_prs_in_period(trainings: &[Training], exercise_day_id: Option<ExerciseDayId>, start: Timestamp) -> u32 {
    let matches_day = |t: &Training| exercise_day_id.is_none_or(|id| t.exercise_day_id == id);
    let mut best: HashMap<ExerciseId, f64> = HashMap::new();

    for training in trainings.iter().filter(|&t| t.date < start && matches_day(t)) {
        for set in &training.sets {
            if let Some(weight) = set.lifted_weight() {
                beats(&mut best, set.exercise_id, weight);
            }
        }
    }

    let mut count = 0;
    for training in chronological(trainings)
        .into_iter()
        .filter(|&t| t.date >= start && matches_day(t))
    {
        for set in &training.sets {
            if let Some(weight) = set.lifted_weight() {
                if beats(&mut best, set.exercise_id, weight) {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Raise the running maximum for `exercise_id` if `weight` strictly exceeds
/// it. Maxima start at zero.
fn beats(best: &mut HashMap<ExerciseId, f64>, exercise_id: ExerciseId, weight: f64) -> bool {
    let current = best.entry(exercise_id).or_insert(0.0);
    if weight > *current {
        *current = weight;
        true
    } else {
        false
    }
}
