use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use pushpull::{
    analytics::{self, index_exercises},
    models::{ExerciseDay, ExerciseId, SettingsPatch},
    rotation,
    session::{CurrentTraining, SetUpdate},
    storage, store,
    types::emit,
    utils, volume,
};
use serde::Serialize;

use super::{Ctx, resolve_day, resolve_exercise};
use crate::cli::SessionCmd;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView<'a> {
    session: &'a CurrentTraining,
    volume: f64,
    completion_percentage: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndSummary {
    training_id: i64,
    exercise_day: String,
    volume: f64,
    volume_change: Option<f64>,
    prs: u32,
}

/// Map user input to an exercise of the running session: a 1-based
/// position as shown by `session show`, or a name.
async fn session_exercise(ctx: &Ctx, day: &ExerciseDay, input: &str) -> Result<ExerciseId> {
    let ordered = day.ordered_exercises();
    if let Ok(n) = input.trim().parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| ordered.get(i))
            .map(|c| c.exercise_id)
            .ok_or_else(|| anyhow!("exercise index must be between 1 and {}", ordered.len()));
    }
    let exercise = resolve_exercise(&ctx.pool, input).await?;
    if !ordered.iter().any(|c| c.exercise_id == exercise.id) {
        bail!("`{}` is not part of `{}`", exercise.name, day.name);
    }
    Ok(exercise.id)
}

fn active_day(session: &CurrentTraining) -> Result<ExerciseDay> {
    session
        .exercise_day()
        .cloned()
        .ok_or_else(|| anyhow!("no active session -- start one with `session start`"))
}

fn check_set(day: &ExerciseDay, exercise_id: ExerciseId, set: u32) -> Result<()> {
    let sets = day
        .exercises
        .iter()
        .find(|c| c.exercise_id == exercise_id)
        .map_or(0, |c| c.number_of_sets);
    if set == 0 || set > sets {
        bail!("set must be between 1 and {sets}");
    }
    Ok(())
}

fn save(ctx: &Ctx, session: &CurrentTraining) -> Result<()> {
    storage::save_session(&ctx.session_path, session)
        .with_context(|| format!("Failed to save session to {}", ctx.session_path.display()))
}

async fn show(ctx: &Ctx, session: &CurrentTraining) -> Result<()> {
    let view = SessionView {
        session,
        volume: session.current_volume(),
        completion_percentage: session.completion_percentage(),
    };
    let Some(day) = session.exercise_day() else {
        emit(ctx.fmt, &view, || println!("{}", "(no active session)".dimmed()));
        return Ok(());
    };

    let exercises = store::exercises::all(&ctx.pool).await?;
    let names = index_exercises(&exercises);
    let history = store::trainings::by_exercise_day(&ctx.pool, day.id).await?;
    let started = session.started_at().unwrap_or_default();

    emit(ctx.fmt, &view, || {
        println!("{} {}", "Session:".cyan().bold(), day.name.bold());
        println!(
            "{}: {} | {}: {} | {}: {}%",
            "Started".dimmed(),
            utils::to_local(started).map_or_else(|| "-".into(), |d| d.format("%Y-%m-%d %H:%M").to_string()),
            "Elapsed".dimmed(),
            utils::format_duration(chrono::Duration::milliseconds(utils::now_millis() - started)),
            "Done".dimmed(),
            view.completion_percentage
        );

        for (i, config) in day.ordered_exercises().iter().enumerate() {
            let name = names
                .get(&config.exercise_id)
                .map_or_else(|| format!("exercise {}", config.exercise_id), |e| e.name.clone());
            println!("\n{}. {}", i + 1, name.bold());

            let previous = analytics::last_training_sets(&history, config.exercise_id);
            for set in session.sets_for_exercise(config.exercise_id) {
                print!("  Set {}: ", set.set_number);
                if let Some(prev) = previous.iter().find(|p| p.set_number == set.set_number) {
                    if let Some((w, r)) = prev.performance() {
                        print!("{} ", format!("(Previous: {w}kg × {r})").dimmed());
                    }
                }
                match (set.skipped, set.weight, set.repetitions) {
                    (true, ..) => println!("{}", "skipped".yellow()),
                    (false, Some(w), Some(r)) => println!("{}", format!("{w}kg × {r}").green()),
                    (false, Some(w), None) => println!("{w}kg × ?"),
                    (false, None, Some(r)) => println!("? × {r}"),
                    (false, None, None) => println!("{}", "-".dimmed()),
                }
            }
        }

        println!("\n{}: {}", "Volume".cyan().bold(), utils::format_volume(view.volume));
    });
    Ok(())
}

pub async fn handle(cmd: SessionCmd, ctx: &Ctx) -> Result<()> {
    let pool = &ctx.pool;
    let mut session = storage::load_session(&ctx.session_path)
        .with_context(|| format!("Failed to read session file: {}", ctx.session_path.display()))?;
    let now = utils::now_millis();

    match cmd {
        SessionCmd::Start { day } => {
            if let Some(current) = session.exercise_day() {
                println!(
                    "{} session `{}` is still running -- `session end` or `session cancel` it first",
                    "warning:".yellow().bold(),
                    current.name
                );
                return Ok(());
            }

            let day = match day {
                Some(input) => resolve_day(pool, &input).await?,
                None => {
                    let days = store::exercise_days::all(pool).await?;
                    let last = store::trainings::last(pool).await?;
                    rotation::next_exercise_day(&days, last.as_ref())
                        .cloned()
                        .ok_or_else(|| anyhow!("no exercise days configured -- create one with `day add`"))?
                }
            };
            if day.exercises.is_empty() {
                println!("{} `{}` has no exercises", "warning:".yellow().bold(), day.name);
            }

            session.start(&day, now);
            save(ctx, &session)?;
            println!("{} started `{}`", "ok:".green().bold(), day.name.bold());
            show(ctx, &session).await?;
        }

        SessionCmd::Show => show(ctx, &session).await?,

        SessionCmd::Set {
            exercise,
            set,
            weight,
            reps,
        } => {
            let day = active_day(&session)?;
            let exercise_id = session_exercise(ctx, &day, &exercise).await?;
            check_set(&day, exercise_id, set)?;
            session.update_set(
                exercise_id,
                set,
                SetUpdate {
                    skipped: Some(false),
                    ..SetUpdate::values(weight, reps)
                },
            )?;
            save(ctx, &session)?;
            println!("{} set {} logged: {}kg × {}", "ok:".green().bold(), set, weight, reps);
        }

        SessionCmd::Skip { exercise, set } => {
            let day = active_day(&session)?;
            let exercise_id = session_exercise(ctx, &day, &exercise).await?;
            check_set(&day, exercise_id, set)?;
            session.skip_set(exercise_id, set);
            save(ctx, &session)?;
            println!("{} set {} skipped", "ok:".green().bold(), set);
        }

        SessionCmd::Unskip { exercise, set } => {
            let day = active_day(&session)?;
            let exercise_id = session_exercise(ctx, &day, &exercise).await?;
            check_set(&day, exercise_id, set)?;
            session.unskip_set(exercise_id, set);
            save(ctx, &session)?;
            println!("{} set {} back in play", "ok:".green().bold(), set);
        }

        SessionCmd::SkipEx { exercise } => {
            let day = active_day(&session)?;
            let exercise_id = session_exercise(ctx, &day, &exercise).await?;
            session.skip_exercise(exercise_id);
            save(ctx, &session)?;
            println!("{} every set skipped", "ok:".green().bold());
        }

        SessionCmd::FillFirst { exercise } => {
            let day = active_day(&session)?;
            let exercise_id = session_exercise(ctx, &day, &exercise).await?;
            let first = session.sets_for_exercise(exercise_id).into_iter().next();
            if first.is_none_or(|s| s.weight.is_none() || s.repetitions.is_none()) {
                println!("{} log set 1 first", "warning:".yellow().bold());
                return Ok(());
            }
            session.fill_first_values(exercise_id);
            save(ctx, &session)?;
            println!("{} copied set 1 to the remaining sets", "ok:".green().bold());
        }

        SessionCmd::FillLast { exercise } => {
            let day = active_day(&session)?;
            let exercise_id = session_exercise(ctx, &day, &exercise).await?;
            let history = store::trainings::by_exercise_day(pool, day.id).await?;
            let reference = analytics::last_training_sets(&history, exercise_id);
            if reference.is_empty() {
                println!("{} no previous `{}` session with this exercise", "warning:".yellow().bold(), day.name);
                return Ok(());
            }
            session.fill_last_values(exercise_id, &reference);
            save(ctx, &session)?;
            println!("{} copied values from the last session", "ok:".green().bold());
        }

        SessionCmd::Reset => {
            active_day(&session)?;
            session.reset();
            save(ctx, &session)?;
            println!("{} every set cleared", "ok:".green().bold());
        }

        SessionCmd::End => {
            let day = active_day(&session)?;
            let previous = store::trainings::last_for_day(pool, day.id).await?;

            let Some(id) = session.complete(pool, now).await? else {
                return Ok(());
            };
            save(ctx, &session)?;

            let mut conn = pool.acquire().await?;
            store::settings::update(
                &mut conn,
                SettingsPatch {
                    last_exercise_day_id: Some(Some(day.id)),
                    ..Default::default()
                },
            )
            .await?;

            let stored = store::trainings::get(&mut *conn, id)
                .await?
                .ok_or_else(|| anyhow!("training {id} vanished after insert"))?;
            let history = store::trainings::all(&mut *conn).await?;
            let summary = EndSummary {
                training_id: id.0,
                exercise_day: day.name.clone(),
                volume: stored.total_volume,
                volume_change: previous.map(|p| volume::volume_comparison(stored.total_volume, p.total_volume)),
                prs: analytics::count_prs_in_period(&history, Some(day.id), now),
            };

            emit(ctx.fmt, &summary, || {
                println!("{} finished `{}`", "ok:".green().bold(), summary.exercise_day.bold());
                print!("{}: {}", "Volume".cyan().bold(), utils::format_volume(summary.volume));
                match summary.volume_change {
                    Some(pct) if pct > 0.0 => println!("  {}", format!("▲ {pct}% vs last time").green()),
                    Some(pct) if pct < 0.0 => println!("  {}", format!("▼ {}% vs last time", -pct).red()),
                    Some(_) => println!("  {}", "same as last time".dimmed()),
                    None => println!(),
                }
                if summary.prs > 0 {
                    println!("{} {} new weight PR(s)", "PR:".green().bold(), summary.prs);
                }
            });
        }

        SessionCmd::Cancel => {
            let Some(day) = session.exercise_day().map(|d| d.name.clone()) else {
                println!("{} no active session", "warning:".yellow().bold());
                return Ok(());
            };
            session.cancel();
            save(ctx, &session)?;
            println!("{} discarded `{}`", "ok:".green().bold(), day);
        }
    }

    Ok(())
}
