//! Which workout template comes next.
//!
//! Rotation never fails: a missing or deleted template falls back to the
//! start of the sequence so a workout can always be started.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    models::{ExerciseDay, ExerciseDayId, Timestamp, Training},
    types::DayCategory,
    utils,
};

const CATEGORY_CYCLE: [DayCategory; 3] = [DayCategory::Push, DayCategory::Pull, DayCategory::Legs];

/// Successor in the push → pull → legs cycle. Anything outside the cycle
/// restarts it at push.
pub fn next_category(last: Option<DayCategory>) -> DayCategory {
    let Some(last) = last else {
        return DayCategory::Push;
    };
    match CATEGORY_CYCLE.iter().position(|c| *c == last) {
        Some(idx) => CATEGORY_CYCLE[(idx + 1) % CATEGORY_CYCLE.len()],
        None => DayCategory::Push,
    }
}

/// Templates in rotation order; ties keep their input order.
pub fn sorted_by_rotation(templates: &[ExerciseDay]) -> Vec<&ExerciseDay> {
    let mut sorted: Vec<&ExerciseDay> = templates.iter().collect();
    sorted.sort_by_key(|d| d.rotation_order);
    sorted
}

pub fn next_exercise_day<'a>(templates: &'a [ExerciseDay], last_training: Option<&Training>) -> Option<&'a ExerciseDay> {
    let sorted = sorted_by_rotation(templates);
    let first = *sorted.first()?;

    let Some(last) = last_training else {
        return Some(first);
    };

    match sorted.iter().position(|d| d.id == last.exercise_day_id) {
        Some(idx) => Some(sorted[(idx + 1) % sorted.len()]),
        None => Some(first),
    }
}

pub fn exercise_day_for_category(templates: &[ExerciseDay], category: DayCategory) -> Option<&ExerciseDay> {
    templates
        .iter()
        .filter(|d| d.category == category)
        .min_by_key(|d| d.rotation_order)
}

pub fn is_next_in_rotation(day: &ExerciseDay, templates: &[ExerciseDay], last_training: Option<&Training>) -> bool {
    next_exercise_day(templates, last_training).is_some_and(|next| next.id == day.id)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastTrainedDay<'a> {
    pub exercise_day: &'a ExerciseDay,
    pub days_ago: i64,
}

/// The most recent `count` distinct templates found in `trainings`
/// (newest first). Trainings of deleted templates are passed over.
pub fn last_trained_days<'a>(
    trainings: &[Training],
    templates: &'a [ExerciseDay],
    count: usize,
    now: Timestamp,
) -> Vec<LastTrainedDay<'a>> {
    let mut seen: HashSet<ExerciseDayId> = HashSet::new();
    let mut result = Vec::new();

    for training in trainings {
        if result.len() >= count {
            break;
        }
        if seen.contains(&training.exercise_day_id) {
            continue;
        }
        if let Some(day) = templates.iter().find(|d| d.id == training.exercise_day_id) {
            seen.insert(day.id);
            result.push(LastTrainedDay {
                exercise_day: day,
                days_ago: utils::days_ago(training.date, now),
            });
        }
    }

    result
}

pub fn days_since_last_training(day_id: ExerciseDayId, trainings: &[Training], now: Timestamp) -> Option<i64> {
    trainings
        .iter()
        .find(|t| t.exercise_day_id == day_id)
        .map(|t| utils::days_ago(t.date, now))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        models::{NewExerciseDay, NewTraining, TrainingId},
        utils::DAY_MS,
    };

    fn day(id: i64, order: i64, category: DayCategory) -> ExerciseDay {
        NewExerciseDay {
            name: format!("day {id}"),
            category,
            exercises: vec![],
            rotation_order: order,
            created_at: 0,
            updated_at: 0,
        }
        .with_id(ExerciseDayId(id))
    }

    fn training(day_id: i64, date: Timestamp) -> Training {
        NewTraining {
            exercise_day_id: ExerciseDayId(day_id),
            date,
            sets: vec![],
            total_volume: 0.0,
            completed: true,
        }
        .with_id(TrainingId(date))
    }

    fn templates() -> Vec<ExerciseDay> {
        // Deliberately out of rotation order.
        vec![
            day(30, 2, DayCategory::Legs),
            day(10, 0, DayCategory::Push),
            day(20, 1, DayCategory::Pull),
        ]
    }

    #[rstest]
    #[case(None, DayCategory::Push)]
    #[case(Some(DayCategory::Push), DayCategory::Pull)]
    #[case(Some(DayCategory::Pull), DayCategory::Legs)]
    #[case(Some(DayCategory::Legs), DayCategory::Push)]
    #[case(Some(DayCategory::FullBody), DayCategory::Push)]
    fn category_cycle(#[case] last: Option<DayCategory>, #[case] expected: DayCategory) {
        assert_eq!(next_category(last), expected);
    }

    #[rstest]
    #[case(DayCategory::Push)]
    #[case(DayCategory::Pull)]
    #[case(DayCategory::Legs)]
    fn category_cycle_has_period_three(#[case] start: DayCategory) {
        let three = next_category(Some(next_category(Some(next_category(Some(start))))));
        assert_eq!(three, start);
    }

    #[rstest]
    #[case(None, 10)]
    #[case(Some(20), 30)]
    #[case(Some(30), 10)]
    #[case(Some(10), 20)]
    #[case(Some(99), 10)]
    fn next_day_follows_rotation_order(#[case] last_day: Option<i64>, #[case] expected: i64) {
        let templates = templates();
        let last = last_day.map(|id| training(id, 1));
        let next = next_exercise_day(&templates, last.as_ref()).unwrap();
        assert_eq!(next.id, ExerciseDayId(expected));
    }

    #[test]
    fn next_day_with_no_templates() {
        assert!(next_exercise_day(&[], Some(&training(1, 1))).is_none());
    }

    #[test]
    fn ties_keep_input_order() {
        let templates = vec![
            day(1, 0, DayCategory::Push),
            day(2, 0, DayCategory::Pull),
            day(3, 0, DayCategory::Legs),
        ];
        let next = next_exercise_day(&templates, Some(&training(1, 1))).unwrap();
        assert_eq!(next.id, ExerciseDayId(2));
        let wrapped = next_exercise_day(&templates, Some(&training(3, 1))).unwrap();
        assert_eq!(wrapped.id, ExerciseDayId(1));
    }

    #[test]
    fn day_for_category_picks_lowest_order() {
        let mut templates = templates();
        templates.push(day(40, -1, DayCategory::Push));
        templates.push(day(50, -1, DayCategory::Push));

        let push = exercise_day_for_category(&templates, DayCategory::Push).unwrap();
        assert_eq!(push.id, ExerciseDayId(40));
        assert!(exercise_day_for_category(&templates, DayCategory::FullBody).is_none());
    }

    #[test]
    fn next_in_rotation_flag() {
        let templates = templates();
        let last = training(10, 1);
        assert!(is_next_in_rotation(&templates[2], &templates, Some(&last)));
        assert!(!is_next_in_rotation(&templates[0], &templates, Some(&last)));
    }

    #[test]
    fn last_trained_days_are_distinct_and_skip_deleted() {
        let templates = templates();
        let now = 10 * DAY_MS;
        let history = vec![
            training(20, now - DAY_MS),
            training(99, now - 2 * DAY_MS),
            training(20, now - 3 * DAY_MS),
            training(10, now - 4 * DAY_MS),
            training(30, now - 5 * DAY_MS),
        ];

        let last = last_trained_days(&history, &templates, 2, now);
        let ids: Vec<_> = last.iter().map(|l| (l.exercise_day.id.0, l.days_ago)).collect();
        assert_eq!(ids, vec![(20, 1), (10, 4)]);

        assert_eq!(days_since_last_training(ExerciseDayId(30), &history, now), Some(5));
        assert_eq!(days_since_last_training(ExerciseDayId(77), &history, now), None);
    }
}
