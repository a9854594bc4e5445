use std::collections::BTreeMap;

use serde::Serialize;

use super::Mean;
use crate::models::{ExerciseId, SetData, Timestamp, Training};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAverage {
    pub exercise_id: ExerciseId,
    pub set_number: u32,
    pub avg_weight: f64,
    pub avg_reps: f64,
    pub count: usize,
}

/// Per set number averages over the `window` most recent sessions, used to
/// suggest starting values. Only completed sets contribute.
pub fn set_averages(trainings: &[Training], exercise_id: ExerciseId, window: usize) -> BTreeMap<u32, SetAverage> {
    let mut samples: BTreeMap<u32, (Mean, Mean)> = BTreeMap::new();

    for set in trainings.iter().take(window).flat_map(|t| t.sets_for(exercise_id)) {
        if let Some((weight, reps)) = set.performance() {
            let (w, r) = samples.entry(set.set_number).or_default();
            w.add(weight);
            r.add(f64::from(reps));
        }
    }

    samples
        .into_iter()
        .map(|(set_number, (weight, reps))| {
            let average = SetAverage {
                exercise_id,
                set_number,
                avg_weight: weight.round1(),
                avg_reps: reps.round1(),
                count: weight.count,
            };
            (set_number, average)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseAverage {
    pub avg_volume: f64,
    pub avg_weight: f64,
    pub avg_reps: f64,
    pub session_count: usize,
}

pub fn exercise_average(trainings: &[Training], exercise_id: ExerciseId, window: usize) -> ExerciseAverage {
    let recent = &trainings[..window.min(trainings.len())];
    if recent.is_empty() {
        return ExerciseAverage::default();
    }

    let mut volume = 0.0;
    let mut weight = Mean::default();
    let mut reps = Mean::default();
    for (w, r) in recent
        .iter()
        .flat_map(|t| t.sets_for(exercise_id))
        .filter_map(SetData::performance)
    {
        volume += w * f64::from(r);
        weight.add(w);
        reps.add(f64::from(r));
    }

    ExerciseAverage {
        avg_volume: (volume / recent.len() as f64).round(),
        avg_weight: weight.round1(),
        avg_reps: reps.round1(),
        session_count: recent.len(),
    }
}

/// Sets of the most recent session that included the exercise, in set
/// order. Empty if it was never trained.
pub fn last_training_sets(trainings: &[Training], exercise_id: ExerciseId) -> Vec<SetData> {
    trainings
        .iter()
        .find(|t| t.contains_exercise(exercise_id))
        .map(|t| {
            let mut sets: Vec<SetData> = t.sets_for(exercise_id).cloned().collect();
            sets.sort_by_key(|s| s.set_number);
            sets
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxValues {
    pub max_weight: f64,
    pub max_reps: u32,
    pub max_volume: f64,
    pub max_weight_date: Option<Timestamp>,
}

/// Best completed-set weight and reps, and best single-session volume.
pub fn max_values(trainings: &[Training], exercise_id: ExerciseId) -> MaxValues {
    let mut max = MaxValues::default();

    for training in trainings {
        let mut session_volume = 0.0;
        for (weight, reps) in training.sets_for(exercise_id).filter_map(SetData::performance) {
            if weight > max.max_weight {
                max.max_weight = weight;
                max.max_weight_date = Some(training.date);
            }
            max.max_reps = max.max_reps.max(reps);
            session_volume += weight * f64::from(reps);
        }
        max.max_volume = max.max_volume.max(session_volume);
    }

    max
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        analytics::fixtures::{NOW, history, set, skipped, training},
        utils::DAY_MS,
    };

    fn bench_history() -> Vec<Training> {
        history(vec![
            training(1, 1, vec![set(1, 1, 80.0, 10), set(1, 2, 82.5, 8), skipped(1, 3)]),
            training(1, 2, vec![set(1, 1, 77.5, 10), set(1, 2, 80.0, 9), set(1, 3, 80.0, 7)]),
            training(2, 3, vec![set(2, 1, 30.0, 12)]),
            training(1, 4, vec![set(1, 1, 75.0, 11), set(1, 3, 77.5, 6)]),
        ])
    }

    #[test]
    fn averages_per_set_number() {
        let averages = set_averages(&bench_history(), ExerciseId(1), 5);

        assert_eq!(averages.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            averages[&1],
            SetAverage {
                exercise_id: ExerciseId(1),
                set_number: 1,
                avg_weight: 77.5,
                avg_reps: 10.3,
                count: 3,
            }
        );
        assert_eq!(averages[&3].count, 2);
        assert_eq!(averages[&3].avg_weight, 78.8);
    }

    #[test]
    fn averages_only_look_at_the_window() {
        let averages = set_averages(&bench_history(), ExerciseId(1), 1);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[&1].avg_weight, 80.0);
        assert!(set_averages(&[], ExerciseId(1), 5).is_empty());
    }

    #[test]
    fn exercise_average_over_recent_sessions() {
        let average = exercise_average(&bench_history(), ExerciseId(1), 2);
        // 800 + 660 and 775 + 720 + 560 over two sessions.
        assert_eq!(average.avg_volume, 1758.0);
        assert_eq!(average.avg_weight, 80.0);
        assert_eq!(average.session_count, 2);

        assert_eq!(exercise_average(&[], ExerciseId(1), 5), ExerciseAverage::default());
    }

    #[test]
    fn last_sets_come_from_latest_session_with_exercise() {
        let trainings = bench_history();
        let sets = last_training_sets(&trainings, ExerciseId(2));
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].weight, Some(30.0));

        let bench = last_training_sets(&trainings, ExerciseId(1));
        assert_eq!(bench.iter().map(|s| s.set_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(bench[2].skipped);

        assert!(last_training_sets(&trainings, ExerciseId(9)).is_empty());
    }

    #[test]
    fn max_values_track_best_set_and_session() {
        let max = max_values(&bench_history(), ExerciseId(1));
        assert_eq!(max.max_weight, 82.5);
        assert_eq!(max.max_weight_date, Some(NOW - DAY_MS));
        assert_eq!(max.max_reps, 11);
        assert_eq!(max.max_volume, 2055.0);

        assert_eq!(max_values(&[], ExerciseId(1)), MaxValues::default());
    }
}
