use anyhow::{Context, Result};
use colored::Colorize;
use pushpull::{
    Error,
    analytics::{ExerciseIndex, index_exercises},
    models::{ExerciseConfig, ExerciseDay, NewExercise},
    rotation, store,
    types::{DayCategory, emit},
    utils,
};
use serde::{Deserialize, Serialize};

use super::{Ctx, parse_muscle, resolve_day, resolve_exercise};
use crate::cli::DayCmd;

/// `[[day]]` tables of a template file.
#[derive(Debug, Deserialize)]
struct DayImport {
    #[serde(default)]
    day: Vec<DayDef>,
}

#[derive(Debug, Deserialize)]
struct DayDef {
    name: String,
    category: DayCategory,
    rotation_order: Option<i64>,
    #[serde(default)]
    exercise: Vec<ExerciseRef>,
}

/// An exercise named in a template file. Unknown names are created when a
/// category is given.
#[derive(Debug, Deserialize)]
struct ExerciseRef {
    name: String,
    sets: u32,
    category: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DayRow<'a> {
    #[serde(flatten)]
    day: &'a ExerciseDay,
    is_next: bool,
    days_since_last_training: Option<i64>,
}

fn print_day(day: &ExerciseDay, names: &ExerciseIndex<'_>) {
    println!(
        "{} {} ({}) {}",
        format!("#{}", day.rotation_order).yellow(),
        day.name.bold(),
        day.category.to_string().cyan(),
        format!("id {}", day.id).dimmed()
    );
    if day.exercises.is_empty() {
        println!("{}", "  (no exercises)".dimmed());
    }
    for (i, config) in day.ordered_exercises().iter().enumerate() {
        let name = names
            .get(&config.exercise_id)
            .map_or_else(|| format!("exercise {}", config.exercise_id), |e| e.name.clone());
        println!("  {}. {} × {} sets", i + 1, name, config.number_of_sets);
    }
}

pub async fn handle(cmd: DayCmd, ctx: &Ctx) -> Result<()> {
    let pool = &ctx.pool;
    let now = utils::now_millis();

    match cmd {
        DayCmd::Add { name, category, order } => {
            let mut conn = pool.acquire().await?;
            match store::exercise_days::create(&mut conn, &name, category, Vec::new(), order, now).await {
                Ok(day) => emit(ctx.fmt, &day, || {
                    println!(
                        "{} exercise day `{}` added at rotation position {} -- add exercises with `day add-ex`",
                        "ok:".green().bold(),
                        day.name,
                        day.rotation_order
                    )
                }),
                Err(Error::NameConflict { name, .. }) => println!(
                    "{} exercise day `{}` already exists -- use `day list` to view all days",
                    "warning:".yellow().bold(),
                    name
                ),
                Err(e) => return Err(e.into()),
            }
        }

        DayCmd::List => {
            let days = store::exercise_days::all(pool).await?;
            let trainings = store::trainings::all(pool).await?;
            let rows: Vec<DayRow> = rotation::sorted_by_rotation(&days)
                .into_iter()
                .map(|day| DayRow {
                    day,
                    is_next: rotation::is_next_in_rotation(day, &days, trainings.first()),
                    days_since_last_training: rotation::days_since_last_training(day.id, &trainings, now),
                })
                .collect();

            emit(ctx.fmt, &rows, || {
                println!("{}", "Rotation:".cyan().bold());
                if rows.is_empty() {
                    println!("{}", "  (no exercise days -- create one with `day add`)".dimmed());
                }
                for row in &rows {
                    let marker = if row.is_next { "→".green().bold().to_string() } else { " ".into() };
                    let last = match row.days_since_last_training {
                        Some(0) => "trained today".to_string(),
                        Some(1) => "1 day ago".to_string(),
                        Some(n) => format!("{n} days ago"),
                        None => "never trained".to_string(),
                    };
                    println!(
                        " {} {} {} ({}, {} exercises) {}",
                        marker,
                        format!("{:>2}", row.day.id).yellow(),
                        row.day.name.bold(),
                        row.day.category.to_string().cyan(),
                        row.day.exercises.len(),
                        format!("– {last}").dimmed()
                    );
                }
            });
        }

        DayCmd::Show { day } => {
            let day = resolve_day(pool, &day).await?;
            let exercises = store::exercises::all(pool).await?;
            emit(ctx.fmt, &day, || print_day(&day, &index_exercises(&exercises)));
        }

        DayCmd::Import { file } => {
            let toml_str = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Could not read file: `{}`", file.display()))?;
            let import: DayImport =
                toml::from_str(&toml_str).context("Failed to parse TOML: Expected `[[day]]` entries")?;

            if import.day.is_empty() {
                println!("{}", "warning: no [[day]] entries found".yellow().bold());
                return Ok(());
            }

            let mut conn = pool.acquire().await?;
            let mut inserted = 0;
            let mut skipped = 0;

            for def in import.day {
                let mut configs = Vec::with_capacity(def.exercise.len());
                for ex in &def.exercise {
                    let exercise = match store::exercises::find_by_name(&mut *conn, &ex.name).await? {
                        Some(e) => e,
                        None => match ex.category.as_deref() {
                            Some(c) => {
                                let draft = NewExercise::new(ex.name.clone(), parse_muscle(c)?, "", now);
                                let created = store::exercises::create(&mut conn, draft).await?;
                                println!("{} created exercise `{}`", "ok:".green().bold(), created.name);
                                created
                            }
                            None => {
                                println!(
                                    "{} `{}`: unknown exercise `{}` skipped -- give it a `category` to create it",
                                    "warning:".yellow().bold(),
                                    def.name,
                                    ex.name
                                );
                                continue;
                            }
                        },
                    };
                    configs.push(ExerciseConfig {
                        exercise_id: exercise.id,
                        number_of_sets: ex.sets,
                        position: configs.len() as u32,
                    });
                }

                match store::exercise_days::create(&mut conn, &def.name, def.category, configs, def.rotation_order, now)
                    .await
                {
                    Ok(day) => {
                        inserted += 1;
                        println!("{} `{}` ({} exercises)", "ok:".green().bold(), day.name, day.exercises.len());
                    }
                    Err(Error::NameConflict { name, .. }) => {
                        skipped += 1;
                        println!("{} `{}` (already exists)", "info:".blue().bold(), name);
                    }
                    Err(e) => return Err(e).with_context(|| format!("Could not import `{}`", def.name)),
                }
            }

            println!("\n{} {} inserted, {} skipped", "Summary:".cyan().bold(), inserted, skipped);
        }

        DayCmd::Delete { day } => {
            let day = resolve_day(pool, &day).await?;
            store::exercise_days::delete(pool, day.id).await?;
            println!("{} deleted exercise day `{}`", "ok:".green().bold(), day.name);
        }

        DayCmd::AddEx { day, exercise, sets } => {
            let day = resolve_day(pool, &day).await?;
            let exercise = resolve_exercise(pool, &exercise).await?;
            if day.exercises.iter().any(|c| c.exercise_id == exercise.id) {
                println!(
                    "{} `{}` is already part of `{}` -- use `day sets` to change its sets",
                    "warning:".yellow().bold(),
                    exercise.name,
                    day.name
                );
                return Ok(());
            }
            let mut conn = pool.acquire().await?;
            let updated = store::exercise_days::add_exercise(&mut conn, day.id, exercise.id, sets, now).await?;
            emit(ctx.fmt, &updated, || {
                println!(
                    "{} added `{}` ({} sets) to `{}`",
                    "ok:".green().bold(),
                    exercise.name,
                    sets,
                    updated.name
                )
            });
        }

        DayCmd::RmEx { day, exercise } => {
            let day = resolve_day(pool, &day).await?;
            let exercise = resolve_exercise(pool, &exercise).await?;
            let mut conn = pool.acquire().await?;
            let updated = store::exercise_days::remove_exercise(&mut conn, day.id, exercise.id, now).await?;
            emit(ctx.fmt, &updated, || {
                println!("{} removed `{}` from `{}`", "ok:".green().bold(), exercise.name, updated.name)
            });
        }

        DayCmd::Sets { day, exercise, sets } => {
            let day = resolve_day(pool, &day).await?;
            let exercise = resolve_exercise(pool, &exercise).await?;
            let mut conn = pool.acquire().await?;
            let updated =
                store::exercise_days::set_number_of_sets(&mut conn, day.id, exercise.id, sets, now).await?;
            emit(ctx.fmt, &updated, || {
                println!(
                    "{} `{}` in `{}` now has {} sets",
                    "ok:".green().bold(),
                    exercise.name,
                    updated.name,
                    sets
                )
            });
        }

        DayCmd::Reorder { day, exercises } => {
            let day = resolve_day(pool, &day).await?;
            let mut ordered = Vec::with_capacity(exercises.len());
            for input in &exercises {
                ordered.push(resolve_exercise(pool, input).await?.id);
            }
            let mut conn = pool.acquire().await?;
            let updated = store::exercise_days::reorder_exercises(&mut conn, day.id, &ordered, now).await?;
            drop(conn);
            let all = store::exercises::all(pool).await?;
            emit(ctx.fmt, &updated, || print_day(&updated, &index_exercises(&all)));
        }

        DayCmd::Rotation { days } => {
            let mut ordered = Vec::with_capacity(days.len());
            for input in &days {
                ordered.push(resolve_day(pool, input).await?.id);
            }
            store::exercise_days::reorder_rotation(pool, &ordered, now).await?;
            let names: Vec<String> = store::exercise_days::all(pool)
                .await?
                .into_iter()
                .filter(|d| ordered.contains(&d.id))
                .map(|d| d.name)
                .collect();
            println!("{} rotation: {}", "ok:".green().bold(), names.join(" → "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_file_parses() {
        let import: DayImport = toml::from_str(
            r#"
            [[day]]
            name = "Push A"
            category = "push"

            [[day.exercise]]
            name = "Bench Press"
            sets = 4
            category = "chest"

            [[day.exercise]]
            name = "Dips"
            sets = 3

            [[day]]
            name = "Full"
            category = "full-body"
            rotation_order = 7
            "#,
        )
        .unwrap();

        assert_eq!(import.day.len(), 2);
        assert_eq!(import.day[0].category, DayCategory::Push);
        assert_eq!(import.day[0].exercise[0].sets, 4);
        assert_eq!(import.day[0].exercise[1].category, None);
        assert_eq!(import.day[1].rotation_order, Some(7));
        assert!(import.day[1].exercise.is_empty());
    }
}
