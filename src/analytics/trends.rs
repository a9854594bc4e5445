use std::fmt::Display;

use itertools::Itertools;
use serde::Serialize;

use super::{ExerciseIndex, chronological};
use crate::models::{Exercise, ExerciseDay, ExerciseId, Timestamp, Training};

/// Change in percent beyond which a trend stops being stable.
const STABLE_BAND: f64 = 3.0;
const MIN_SESSIONS_FOR_RANKING: usize = 3;
const MIN_SESSIONS_FOR_PLATEAU: usize = 5;
const MAX_FOCUS_EXERCISES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    fn classify(percentage_change: f64) -> Self {
        if percentage_change > STABLE_BAND {
            Self::Improving
        } else if percentage_change < -STABLE_BAND {
            Self::Declining
        } else {
            Self::Stable
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTrend {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub trend: Trend,
    pub percentage_change: f64,
    #[serde(rename = "lastPRDate")]
    pub last_pr_date: Option<Timestamp>,
    pub session_count: usize,
}

/// Compare the heaviest weight of the last `window` sessions containing the
/// exercise against the `window` sessions before them.
///
/// Without an older window the recent one is its own reference, which makes
/// the change zero.
pub fn progress_trend(trainings: &[Training], exercise_id: ExerciseId, exercise_name: &str, window: usize) -> ProgressTrend {
    let mut relevant: Vec<&Training> = trainings.iter().filter(|t| t.contains_exercise(exercise_id)).collect();
    relevant.sort_by(|a, b| b.date.cmp(&a.date));

    let mut trend = ProgressTrend {
        exercise_id,
        exercise_name: exercise_name.to_string(),
        trend: Trend::Stable,
        percentage_change: 0.0,
        last_pr_date: None,
        session_count: relevant.len(),
    };
    if relevant.len() < 2 {
        return trend;
    }

    let heaviest = |sessions: &[&Training]| {
        sessions
            .iter()
            .flat_map(|t| t.sets_for(exercise_id))
            .filter_map(|s| s.lifted_weight())
            .fold(0.0, f64::max)
    };

    let recent = &relevant[..window.min(relevant.len())];
    let older = relevant.get(window..(2 * window).min(relevant.len())).unwrap_or_default();

    let recent_max = heaviest(recent);
    let older_max = if older.is_empty() { recent_max } else { heaviest(older) };

    if older_max > 0.0 {
        trend.percentage_change = (recent_max - older_max) / older_max * 100.0;
    }
    trend.trend = Trend::classify(trend.percentage_change);

    let mut running_max = 0.0;
    for training in chronological(trainings).into_iter().filter(|t| t.contains_exercise(exercise_id)) {
        for weight in training.sets_for(exercise_id).filter_map(|s| s.lifted_weight()) {
            if weight > running_max {
                running_max = weight;
                trend.last_pr_date = Some(training.date);
            }
        }
    }

    trend
}

fn trends_for<'a>(
    trainings: &'a [Training],
    exercises: &'a [Exercise],
    window: usize,
) -> impl Iterator<Item = ProgressTrend> + 'a {
    exercises
        .iter()
        .map(move |e| progress_trend(trainings, e.id, &e.name, window))
        .filter(|t| t.session_count >= MIN_SESSIONS_FOR_RANKING)
}

/// Exercises that are declining or sit at or below `threshold`, worst first.
pub fn exercises_needing_attention(
    trainings: &[Training],
    exercises: &[Exercise],
    threshold: f64,
    window: usize,
) -> Vec<ProgressTrend> {
    trends_for(trainings, exercises, window)
        .filter(|t| t.trend == Trend::Declining || t.percentage_change <= threshold)
        .sorted_by(|a, b| a.percentage_change.total_cmp(&b.percentage_change))
        .collect()
}

pub fn top_improvers(trainings: &[Training], exercises: &[Exercise], limit: usize, window: usize) -> Vec<ProgressTrend> {
    trends_for(trainings, exercises, window)
        .filter(|t| t.trend == Trend::Improving)
        .sorted_by(|a, b| b.percentage_change.total_cmp(&a.percentage_change))
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FocusReason {
    #[serde(rename = "regressing performance")]
    Regressing,
    #[serde(rename = "plateau reached")]
    Plateau,
}

impl Display for FocusReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regressing => f.write_str("regressing performance"),
            Self::Plateau => f.write_str("plateau reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusExercise {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub reason: FocusReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub exercise_day: Option<ExerciseDay>,
    pub focus_exercises: Vec<FocusExercise>,
    pub reason: String,
}

/// Suggest the template after the one trained last, by position in
/// `exercise_days`, together with up to three of its exercises that are
/// regressing or have plateaued on that template.
pub fn next_session_recommendation(
    trainings: &[Training],
    exercise_days: &[ExerciseDay],
    exercises: &ExerciseIndex<'_>,
    window: usize,
) -> Recommendation {
    if exercise_days.is_empty() {
        return Recommendation {
            exercise_day: None,
            focus_exercises: Vec::new(),
            reason: "no exercise days configured".to_string(),
        };
    }

    let last_training = trainings.first();
    let last_index =
        last_training.and_then(|last| exercise_days.iter().position(|d| d.id == last.exercise_day_id));
    let next_day = match last_index {
        Some(idx) => &exercise_days[(idx + 1) % exercise_days.len()],
        None => &exercise_days[0],
    };

    let day_trainings: Vec<Training> = trainings
        .iter()
        .filter(|t| t.exercise_day_id == next_day.id)
        .cloned()
        .collect();

    let focus_exercises = next_day
        .ordered_exercises()
        .iter()
        .filter_map(|config| {
            let exercise = exercises.get(&config.exercise_id)?;
            let trend = progress_trend(&day_trainings, config.exercise_id, &exercise.name, window);
            let reason = match trend.trend {
                Trend::Declining => FocusReason::Regressing,
                Trend::Stable if trend.session_count >= MIN_SESSIONS_FOR_PLATEAU => FocusReason::Plateau,
                _ => return None,
            };
            Some(FocusExercise {
                exercise_id: config.exercise_id,
                exercise_name: exercise.name.clone(),
                reason,
            })
        })
        .take(MAX_FOCUS_EXERCISES)
        .collect();

    let reason = match (last_training, last_index) {
        (None, _) => "first day in rotation".to_string(),
        (Some(_), Some(idx)) => format!("next day in rotation after {}", exercise_days[idx].name),
        (Some(_), None) => "next day in rotation after last training".to_string(),
    };

    Recommendation {
        exercise_day: Some(next_day.clone()),
        focus_exercises,
        reason,
    }
}
