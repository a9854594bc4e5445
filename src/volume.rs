//! Training volume: weight × repetitions over completed sets.

use std::collections::BTreeMap;

use crate::{
    Error, Result,
    models::{ExerciseId, SetData, Training},
};

/// A weight a set can record: finite and not negative.
pub fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!("weight must be a non-negative number, got {weight}")))
    }
}

/// Volume of one set; zero unless the set is complete.
pub fn set_volume(set: &SetData) -> f64 {
    set.performance()
        .map(|(weight, reps)| weight * f64::from(reps))
        .unwrap_or(0.0)
}

pub fn total_volume<'a>(sets: impl IntoIterator<Item = &'a SetData>) -> f64 {
    sets.into_iter().map(set_volume).sum()
}

pub fn exercise_volume<'a>(sets: impl IntoIterator<Item = &'a SetData>, exercise_id: ExerciseId) -> f64 {
    sets.into_iter()
        .filter(|s| s.exercise_id == exercise_id)
        .map(set_volume)
        .sum()
}

pub fn volume_by_exercise<'a>(sets: impl IntoIterator<Item = &'a SetData>) -> BTreeMap<ExerciseId, f64> {
    let mut by_exercise = BTreeMap::new();
    for set in sets {
        *by_exercise.entry(set.exercise_id).or_insert(0.0) += set_volume(set);
    }
    by_exercise
}

/// Mean stored volume per training, rounded.
pub fn average_volume(trainings: &[Training]) -> f64 {
    if trainings.is_empty() {
        return 0.0;
    }
    let total: f64 = trainings.iter().map(|t| t.total_volume).sum();
    (total / trainings.len() as f64).round()
}

/// Rounded percentage difference of `current` against `reference`.
pub fn volume_comparison(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    ((current - reference) / reference * 100.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseDayId, NewTraining, TrainingId};

    fn set(exercise: i64, n: u32, weight: Option<f64>, reps: Option<u32>, skipped: bool) -> SetData {
        SetData {
            exercise_id: ExerciseId(exercise),
            set_number: n,
            weight,
            repetitions: reps,
            skipped,
        }
    }

    #[test]
    fn only_complete_sets_count() {
        assert_eq!(set_volume(&set(1, 1, Some(80.0), Some(10), false)), 800.0);
        assert_eq!(set_volume(&set(1, 2, Some(80.0), None, false)), 0.0);
        assert_eq!(set_volume(&set(1, 3, None, Some(10), false)), 0.0);
        assert_eq!(set_volume(&set(1, 4, Some(80.0), Some(10), true)), 0.0);
    }

    #[test]
    fn totals_are_order_independent() {
        let sets = vec![
            set(1, 1, Some(100.0), Some(5), false),
            set(2, 1, Some(20.0), Some(12), false),
            set(1, 2, Some(90.0), Some(6), false),
            set(2, 2, None, None, true),
        ];
        let mut reversed = sets.clone();
        reversed.reverse();

        assert_eq!(total_volume(&sets), 500.0 + 240.0 + 540.0);
        assert_eq!(total_volume(&sets), total_volume(&reversed));
        assert_eq!(exercise_volume(&sets, ExerciseId(1)), 1040.0);
        assert_eq!(exercise_volume(&sets, ExerciseId(3)), 0.0);

        let by_exercise = volume_by_exercise(&sets);
        assert_eq!(by_exercise[&ExerciseId(2)], 240.0);
    }

    #[test]
    fn average_and_comparison() {
        let trainings: Vec<Training> = [1000.0, 1501.0]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                NewTraining {
                    exercise_day_id: ExerciseDayId(1),
                    date: i as i64,
                    sets: vec![],
                    total_volume: *v,
                    completed: true,
                }
                .with_id(TrainingId(i as i64))
            })
            .collect();

        assert_eq!(average_volume(&trainings), 1251.0);
        assert_eq!(average_volume(&[]), 0.0);
        assert_eq!(volume_comparison(1100.0, 1000.0), 10.0);
        assert_eq!(volume_comparison(5.0, 0.0), 0.0);
    }
}
