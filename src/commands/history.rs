use anyhow::{Result, anyhow, bail};
use colored::Colorize;
use pushpull::{
    analytics::{ExerciseIndex, index_exercises},
    models::{ExerciseDay, SetKey, Training, TrainingId, TrainingPatch},
    store,
    types::emit,
    utils::{self, format_date, format_volume},
};
use serde::Serialize;

use super::{Ctx, resolve_day, resolve_exercise};
use crate::cli::HistoryCmd;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRow<'a> {
    #[serde(flatten)]
    training: &'a Training,
    exercise_day: Option<&'a str>,
    completed_sets: usize,
}

fn day_name(days: &[ExerciseDay], training: &Training) -> Option<String> {
    days.iter()
        .find(|d| d.id == training.exercise_day_id)
        .map(|d| d.name.clone())
}

fn completed_sets(training: &Training) -> usize {
    training.sets.iter().filter(|s| s.is_complete()).count()
}

async fn require_training(ctx: &Ctx, id: i64) -> Result<Training> {
    store::trainings::get(&ctx.pool, TrainingId(id))
        .await?
        .ok_or_else(|| anyhow!("no training with id {id} (use `history list` to view all trainings)"))
}

fn print_training(training: &Training, day: Option<&str>, names: &ExerciseIndex<'_>) {
    println!(
        "{} {} {} {}",
        format!("#{}", training.id).yellow(),
        format_date(training.date).bold(),
        day.unwrap_or("(deleted day)").cyan(),
        format_volume(training.total_volume).dimmed()
    );

    let mut current = None;
    for set in &training.sets {
        if current != Some(set.exercise_id) {
            current = Some(set.exercise_id);
            let name = names
                .get(&set.exercise_id)
                .map_or_else(|| format!("exercise {}", set.exercise_id), |e| e.name.clone());
            println!("  {}", name.bold());
        }
        let value = match (set.skipped, set.performance()) {
            (true, _) => "skipped".yellow().to_string(),
            (false, Some((w, r))) => format!("{w}kg × {r}"),
            (false, None) => "-".dimmed().to_string(),
        };
        println!("    Set {}: {}", set.set_number, value);
    }
}

pub async fn handle(cmd: HistoryCmd, ctx: &Ctx) -> Result<()> {
    let pool = &ctx.pool;

    match cmd {
        HistoryCmd::List { day, limit } => {
            let limit = match limit {
                Some(n) => n,
                None => ctx.cfg.history_limit()?,
            };
            let trainings = match day {
                Some(input) => {
                    let day = resolve_day(pool, &input).await?;
                    store::trainings::recent_for_day(pool, day.id, u32::try_from(limit).unwrap_or(u32::MAX)).await?
                }
                None => store::trainings::all(pool).await?.into_iter().take(limit).collect(),
            };
            let days = store::exercise_days::all(pool).await?;
            let names: Vec<Option<String>> = trainings.iter().map(|t| day_name(&days, t)).collect();

            let rows: Vec<HistoryRow> = trainings
                .iter()
                .zip(&names)
                .map(|(training, name)| HistoryRow {
                    training,
                    exercise_day: name.as_deref(),
                    completed_sets: completed_sets(training),
                })
                .collect();

            emit(ctx.fmt, &rows, || {
                println!("{}", "History:".cyan().bold());
                if rows.is_empty() {
                    println!("{}", "  (no trainings yet)".dimmed());
                }
                for row in &rows {
                    println!(
                        "  {} {}  {:<16} {:>12}  {}",
                        format!("{:>4}", row.training.id).yellow(),
                        format_date(row.training.date),
                        row.exercise_day.unwrap_or("(deleted day)"),
                        format_volume(row.training.total_volume),
                        format!("{}/{} sets", row.completed_sets, row.training.sets.len()).dimmed()
                    );
                }
            });
        }

        HistoryCmd::Show { training } => {
            let training = require_training(ctx, training).await?;
            let days = store::exercise_days::all(pool).await?;
            let exercises = store::exercises::all(pool).await?;
            let name = day_name(&days, &training);
            let row = HistoryRow {
                training: &training,
                exercise_day: name.as_deref(),
                completed_sets: completed_sets(&training),
            };
            emit(ctx.fmt, &row, || {
                print_training(&training, name.as_deref(), &index_exercises(&exercises))
            });
        }

        HistoryCmd::Set {
            training,
            exercise,
            set,
            weight,
            reps,
        } => {
            let training = require_training(ctx, training).await?;
            let exercise = resolve_exercise(pool, &exercise).await?;
            let key = SetKey::new(exercise.id, set);

            let mut sets = training.sets.clone();
            let Some(target) = sets.iter_mut().find(|s| s.key() == key) else {
                bail!("training #{} has no set {} of `{}`", training.id, set, exercise.name);
            };
            target.weight = Some(weight);
            target.repetitions = Some(reps);
            target.skipped = false;

            let mut conn = pool.acquire().await?;
            let patch = TrainingPatch {
                sets: Some(sets),
                ..Default::default()
            };
            let updated = store::trainings::update(&mut conn, training.id, patch).await?;
            emit(ctx.fmt, &updated, || {
                println!(
                    "{} training #{} set {} of `{}` is now {}kg × {} (volume {} → {})",
                    "ok:".green().bold(),
                    updated.id,
                    set,
                    exercise.name,
                    weight,
                    reps,
                    format_volume(training.total_volume),
                    format_volume(updated.total_volume)
                )
            });
        }

        HistoryCmd::Edit { training, date, day } => {
            if date.is_none() && day.is_none() {
                bail!("nothing to change -- pass `--date` and/or `--day`");
            }
            let training = require_training(ctx, training).await?;
            let exercise_day_id = match day {
                Some(input) => Some(resolve_day(pool, &input).await?.id),
                None => None,
            };
            let date = match date {
                Some(date) => Some(
                    utils::with_local_date(training.date, date).ok_or_else(|| anyhow!("{date} has no valid local time"))?,
                ),
                None => None,
            };

            let mut conn = pool.acquire().await?;
            let patch = TrainingPatch {
                exercise_day_id,
                date,
                ..Default::default()
            };
            let updated = store::trainings::update(&mut conn, training.id, patch).await?;
            emit(ctx.fmt, &updated, || {
                println!(
                    "{} training #{} now on {}",
                    "ok:".green().bold(),
                    updated.id,
                    format_date(updated.date)
                )
            });
        }

        HistoryCmd::Delete { training } => {
            let training = require_training(ctx, training).await?;
            if !store::trainings::delete(pool, training.id).await? {
                bail!("training #{} was already deleted", training.id);
            }
            println!(
                "{} deleted training #{} from {} ({})",
                "ok:".green().bold(),
                training.id,
                format_date(training.date),
                format_volume(training.total_volume)
            );
        }
    }

    Ok(())
}
