use anyhow::Result;
use colored::Colorize;
use pushpull::{
    Error,
    analytics::{self, index_exercises},
    models::{ExercisePatch, NewExercise},
    store,
    types::emit,
    utils::{self, format_date},
};
use serde::Serialize;

use super::{Ctx, parse_muscle, print_columns, resolve_exercise};
use crate::cli::ExerciseCmd;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseDetail<'a> {
    exercise: &'a pushpull::models::Exercise,
    used_in: Vec<String>,
    stats: analytics::ExerciseStats,
    last_sets: Vec<pushpull::models::SetData>,
}

pub async fn handle(cmd: ExerciseCmd, ctx: &Ctx) -> Result<()> {
    let pool = &ctx.pool;
    match cmd {
        ExerciseCmd::Add { name, category, focus } => {
            let category = parse_muscle(&category)?;
            let draft = NewExercise::new(name, category, focus.unwrap_or_default(), utils::now_millis());
            let mut conn = pool.acquire().await?;

            match store::exercises::create(&mut conn, draft).await {
                Ok(exercise) => emit(ctx.fmt, &exercise, || {
                    println!(
                        "{} exercise `{}` ({}) added with id {}",
                        "ok:".green().bold(),
                        exercise.name,
                        exercise.category.to_string().yellow(),
                        exercise.id
                    )
                }),
                Err(Error::NameConflict { name, .. }) => println!(
                    "{} exercise `{}` already exists -- use `ex list` to view all exercises",
                    "warning:".yellow().bold(),
                    name
                ),
                Err(e) => return Err(e.into()),
            }
        }

        ExerciseCmd::List { category } => {
            let exercises = match category {
                Some(c) => store::exercises::by_category(pool, parse_muscle(&c)?).await?,
                None => store::exercises::all(pool).await?,
            };

            emit(ctx.fmt, &exercises, || {
                println!("{}", "Exercises:".cyan().bold());
                if exercises.is_empty() {
                    println!("{}", "  (no exercises found)".dimmed());
                    return;
                }

                let id_w = exercises.iter().map(|e| e.id.to_string().len()).max().unwrap_or(1);
                let rows = exercises
                    .iter()
                    .map(|ex| {
                        let focus = if ex.focus.is_empty() {
                            String::new()
                        } else {
                            format!("– {}", ex.focus).dimmed().to_string()
                        };
                        let left = format!(
                            " {} • {} ({}) {}",
                            format!("{:>id_w$}", ex.id).yellow(),
                            ex.name.bold(),
                            ex.category.to_string().yellow(),
                            focus
                        );
                        let right = format!("added {}", format_date(ex.created_at)).dimmed().to_string();
                        (left, right)
                    })
                    .collect();
                print_columns(rows);
            });
        }

        ExerciseCmd::Show { exercise } => {
            let exercise = resolve_exercise(pool, &exercise.join(" ")).await?;
            let exercises = store::exercises::all(pool).await?;
            let days = store::exercise_days::all(pool).await?;
            let history = store::trainings::with_exercise(pool, exercise.id).await?;

            let detail = ExerciseDetail {
                exercise: &exercise,
                used_in: days
                    .iter()
                    .filter(|d| d.exercises.iter().any(|c| c.exercise_id == exercise.id))
                    .map(|d| d.name.clone())
                    .collect(),
                stats: analytics::exercise_stats(&history, exercise.id, &index_exercises(&exercises)),
                last_sets: analytics::last_training_sets(&history, exercise.id),
            };

            emit(ctx.fmt, &detail, || {
                println!(
                    "{}: {} ({})",
                    "Exercise".cyan().bold(),
                    exercise.name.bold(),
                    exercise.category.to_string().yellow()
                );
                if !exercise.focus.is_empty() {
                    println!("{}: {}", "Focus".dimmed(), exercise.focus);
                }
                println!(
                    "{}: {} | {}: {}",
                    "Added".dimmed(),
                    format_date(exercise.created_at),
                    "Sessions".dimmed(),
                    detail.stats.session_count
                );
                if detail.used_in.is_empty() {
                    println!("{}: {}", "Used in".dimmed(), "no exercise day".dimmed());
                } else {
                    println!("{}: {}", "Used in".dimmed(), detail.used_in.join(", "));
                }
                println!();

                if let Some(date) = detail.stats.max_weight_date {
                    println!(
                        "{}: {}kg on {}",
                        "Heaviest".cyan().bold(),
                        detail.stats.max_weight,
                        format_date(date)
                    );
                }
                println!(
                    "{}: {}   {}: {}kg × {}",
                    "Total volume".cyan().bold(),
                    utils::format_volume(detail.stats.total_volume),
                    "Average set".cyan().bold(),
                    detail.stats.avg_weight,
                    detail.stats.avg_reps
                );

                if !detail.last_sets.is_empty() {
                    println!("\n{}", "Last session".cyan().bold());
                    for set in &detail.last_sets {
                        match set.performance() {
                            Some((w, r)) => println!("  Set {}: {}kg × {}", set.set_number, w, r),
                            None if set.skipped => println!("  Set {}: {}", set.set_number, "skipped".dimmed()),
                            None => println!("  Set {}: {}", set.set_number, "-".dimmed()),
                        }
                    }
                }
            });
        }

        ExerciseCmd::Edit {
            exercise,
            name,
            category,
            focus,
        } => {
            let exercise = resolve_exercise(pool, &exercise).await?;
            let patch = ExercisePatch {
                name,
                category: category.as_deref().map(parse_muscle).transpose()?,
                focus,
            };
            let mut conn = pool.acquire().await?;
            let updated = store::exercises::update(&mut conn, exercise.id, patch, utils::now_millis()).await?;
            emit(ctx.fmt, &updated, || {
                println!("{} updated exercise `{}`", "ok:".green().bold(), updated.name)
            });
        }

        ExerciseCmd::Delete { exercise } => {
            let exercise = resolve_exercise(pool, &exercise).await?;
            let users: Vec<String> = store::exercise_days::all(pool)
                .await?
                .into_iter()
                .filter(|d| d.exercises.iter().any(|c| c.exercise_id == exercise.id))
                .map(|d| d.name)
                .collect();

            store::exercises::delete(pool, exercise.id).await?;
            println!("{} deleted exercise `{}`", "ok:".green().bold(), exercise.name);
            if !users.is_empty() {
                println!(
                    "{} still listed in: {} (use `day rm-ex` to drop it)",
                    "warning:".yellow().bold(),
                    users.join(", ")
                );
            }
        }
    }

    Ok(())
}
