use anyhow::Result;
use colored::Colorize;
use pushpull::{
    analytics::{self, index_exercises},
    models::{ExerciseDay, Timestamp},
    rotation::{self, LastTrainedDay},
    store,
    types::{DayCategory, MuscleCategory, emit},
    utils::{self, DAY_MS, format_date, format_volume},
};
use serde::Serialize;

use super::{Ctx, resolve_day, resolve_exercise};
use crate::cli::StatsCmd;

const GRAPH_HEIGHT: usize = 12;

/// Plot `data` as a dotted line chart, oldest point on the left.
fn create_ascii_graph(data: &[(Timestamp, f64)], width: usize, height: usize, title: &str) -> Vec<String> {
    if data.is_empty() {
        return vec!["No data available".to_string()];
    }
    if data.len() == 1 || width < 2 || height < 2 {
        return vec![format!("{}: {}", title.bold(), format_volume(data[0].1))];
    }

    let min_value = data.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max_value = data.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;

    if range == 0.0 {
        return vec!["No variation in data".to_string()];
    }

    let mut grid = vec![vec![' '; width]; height];
    let point = |i: usize, value: f64| {
        let x = (i as f64 / (data.len() - 1) as f64 * (width - 1) as f64) as usize;
        let y = ((value - min_value) / range * (height - 1) as f64) as usize;
        (x.min(width - 1), height - 1 - y.min(height - 1))
    };

    for (i, (_, value)) in data.iter().enumerate() {
        let (x, y) = point(i, *value);
        grid[y][x] = '●';

        if i > 0 {
            let (prev_x, prev_y) = point(i - 1, data[i - 1].1);
            let dx = x as isize - prev_x as isize;
            let dy = y as isize - prev_y as isize;
            let steps = dx.abs().max(dy.abs());

            for step in 1..steps {
                let px = (prev_x as isize + dx * step / steps) as usize;
                let py = (prev_y as isize + dy * step / steps) as usize;
                if grid[py][px] == ' ' {
                    grid[py][px] = '·';
                }
            }
        }
    }

    let step = range / (height - 1) as f64;
    let mut result = Vec::with_capacity(height + 4);
    result.push(format!("\n{} {}", title.bold(), "Progression"));
    result.push("─".repeat(width + 9));

    for (i, row) in grid.iter().enumerate() {
        let value = min_value + step * (height - 1 - i) as f64;
        result.push(format!("{:7.0} │{}", value, row.iter().collect::<String>()));
    }
    result.push(format!("        └{}", "─".repeat(width)));

    if let (Some(first), Some(last)) = (data.first(), data.last()) {
        let first = format_date(first.0);
        let last = format_date(last.0);
        let gap = width.saturating_sub(first.len() + last.len()).max(2);
        result.push(format!("         {first}{}{last}", " ".repeat(gap)));
    }

    result
}

fn graph_width() -> usize {
    term_size::dimensions().map_or(60, |(w, _)| w.saturating_sub(12).clamp(20, 100))
}

fn trend_arrow(pct: f64) -> String {
    if pct > 0.0 {
        format!("▲ {pct:+.1}%").green().to_string()
    } else if pct < 0.0 {
        format!("▼ {pct:+.1}%").red().to_string()
    } else {
        "= 0.0%".dimmed().to_string()
    }
}

const TOP_EXERCISES: usize = 5;
const RECENT_DAYS: usize = 3;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverviewReport {
    #[serde(flatten)]
    stats: analytics::TrainingStats,
    last_exercise_day: Option<String>,
    top_exercises: Vec<analytics::ExerciseVolumeShare>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetProgression {
    set_number: u32,
    points: Vec<analytics::SetProgressionPoint>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseReport {
    stats: analytics::ExerciseStats,
    records: analytics::PersonalRecords,
    max: analytics::MaxValues,
    average: analytics::ExerciseAverage,
    trend: analytics::ProgressTrend,
    set_averages: Vec<analytics::SetAverage>,
    progression: Vec<SetProgression>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextReport<'a> {
    #[serde(flatten)]
    recommendation: analytics::Recommendation,
    next_category: DayCategory,
    category_day: Option<&'a ExerciseDay>,
    recently_trained: Vec<LastTrainedDay<'a>>,
}

/// Weights of one set across sessions, e.g. `80 → 82.5 → 85`.
fn progression_line(points: &[analytics::SetProgressionPoint]) -> String {
    points
        .iter()
        .map(|p| p.weight.to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendsReport {
    improving: Vec<analytics::ProgressTrend>,
    needs_attention: Vec<analytics::ProgressTrend>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrReport {
    days: i64,
    since: Timestamp,
    count: u32,
}

pub async fn handle(cmd: StatsCmd, ctx: &Ctx) -> Result<()> {
    let pool = &ctx.pool;
    let now = utils::now_millis();
    let window = ctx.cfg.trend_window()?;

    match cmd {
        StatsCmd::Overview => {
            let trainings = store::trainings::all(pool).await?;
            let exercises = store::exercises::all(pool).await?;
            let last_day = match trainings.first() {
                Some(last) => store::exercise_days::get(pool, last.exercise_day_id).await?,
                None => None,
            };
            let top_exercises = match &last_day {
                Some(day) => {
                    analytics::top_exercises_by_volume(&trainings, day.id, &index_exercises(&exercises), TOP_EXERCISES)
                }
                None => Vec::new(),
            };
            let report = OverviewReport {
                stats: analytics::training_stats(&trainings, now),
                last_exercise_day: last_day.map(|d| d.name),
                top_exercises,
            };
            let stats = &report.stats;

            emit(ctx.fmt, &report, || {
                println!("{}", "Training overview".cyan().bold());
                println!("  {:<22} {}", "Sessions".dimmed(), stats.total_sessions);
                println!("  {:<22} {}", "Total volume".dimmed(), format_volume(stats.total_volume));
                println!(
                    "  {:<22} {}",
                    "Average per session".dimmed(),
                    format_volume(stats.avg_volume_per_session)
                );
                println!("  {:<22} {}", "This week".dimmed(), stats.sessions_this_week);
                println!("  {:<22} {}", "Last 30 days".dimmed(), stats.sessions_this_month);
                println!(
                    "  {:<22} {} days (longest {})",
                    "Current streak".dimmed(),
                    stats.current_streak.to_string().green().bold(),
                    stats.longest_streak
                );

                if let Some(day) = &report.last_exercise_day {
                    if !report.top_exercises.is_empty() {
                        println!("\n{} {}", "Top exercises of".cyan().bold(), day.bold());
                        for share in &report.top_exercises {
                            println!(
                                "  {:<24} {:>12} {:>5.1}%",
                                share.exercise_name,
                                format_volume(share.total_volume),
                                share.percentage
                            );
                        }
                    }
                }
            });
        }

        StatsCmd::Exercise { exercise } => {
            let exercise = resolve_exercise(pool, &exercise.join(" ")).await?;
            let exercises = store::exercises::all(pool).await?;
            let history = store::trainings::with_exercise(pool, exercise.id).await?;

            let limit = ctx.cfg.history_limit()?;
            let progression = analytics::exercise_set_numbers(&history, exercise.id)
                .into_iter()
                .map(|set_number| SetProgression {
                    set_number,
                    points: analytics::set_progression(&history, exercise.id, set_number, limit),
                })
                .filter(|p| !p.points.is_empty())
                .collect();

            let report = ExerciseReport {
                stats: analytics::exercise_stats(&history, exercise.id, &index_exercises(&exercises)),
                records: analytics::personal_records(&history, exercise.id),
                max: analytics::max_values(&history, exercise.id),
                average: analytics::exercise_average(&history, exercise.id, analytics::DEFAULT_AVERAGE_WINDOW),
                trend: analytics::progress_trend(&history, exercise.id, &exercise.name, window),
                set_averages: analytics::set_averages(&history, exercise.id, analytics::DEFAULT_AVERAGE_WINDOW)
                    .into_values()
                    .collect(),
                progression,
            };

            emit(ctx.fmt, &report, || {
                println!(
                    "{}: {} ({})",
                    "Exercise".cyan().bold(),
                    exercise.name.bold(),
                    exercise.category.to_string().yellow()
                );
                println!(
                    "{}: {} | {}: {} {}",
                    "Sessions".dimmed(),
                    report.stats.session_count,
                    "Trend".dimmed(),
                    report.trend.trend,
                    trend_arrow(report.trend.percentage_change)
                );
                println!();

                if let Some(pr) = &report.records.weight {
                    println!("{}: {}kg on {}", "Weight PR".cyan().bold(), pr.value, format_date(pr.date));
                }
                if let Some(pr) = &report.records.volume {
                    println!(
                        "{}: {} on {}",
                        "Best session".cyan().bold(),
                        format_volume(pr.value),
                        format_date(pr.date)
                    );
                }
                println!(
                    "{}: {}",
                    "Lifetime volume".cyan().bold(),
                    format_volume(report.stats.total_volume)
                );
                println!(
                    "{}: {}kg | {} reps | {} in one session",
                    "Best".cyan().bold(),
                    report.max.max_weight,
                    report.max.max_reps,
                    format_volume(report.max.max_volume)
                );
                if report.average.session_count > 0 {
                    println!(
                        "{}: {}kg × {} | {} per session {}",
                        "Average".cyan().bold(),
                        report.average.avg_weight,
                        report.average.avg_reps,
                        format_volume(report.average.avg_volume),
                        format!("(last {} sessions)", report.average.session_count).dimmed()
                    );
                }

                if !report.set_averages.is_empty() {
                    println!("\n{}", "Average per set (last sessions)".cyan().bold());
                    for avg in &report.set_averages {
                        println!(
                            "  Set {}: {}kg × {}  {}",
                            avg.set_number,
                            avg.avg_weight,
                            avg.avg_reps,
                            format!("({} sessions)", avg.count).dimmed()
                        );
                    }
                }

                if !report.progression.is_empty() {
                    println!("\n{}", "Progression per set".cyan().bold());
                    for set in &report.progression {
                        println!("  Set {}: {} kg", set.set_number, progression_line(&set.points));
                    }
                }
            });
        }

        StatsCmd::Volume { day, limit, graph } => {
            let limit = match limit {
                Some(n) => n,
                None => ctx.cfg.history_limit()?,
            };
            let (title, points): (String, Vec<(Timestamp, f64, u32)>) = match day {
                Some(input) => {
                    let day = resolve_day(pool, &input).await?;
                    let history = store::trainings::by_exercise_day(pool, day.id).await?;
                    let points = analytics::exercise_day_volume_history(&history, day.id, limit)
                        .into_iter()
                        .map(|p| (p.date, p.volume, p.pr_count))
                        .collect();
                    (day.name, points)
                }
                None => {
                    let history = store::trainings::all(pool).await?;
                    let points = analytics::volume_over_time(&history, limit)
                        .into_iter()
                        .map(|p| (p.date, p.volume, 0))
                        .collect();
                    ("Volume".to_string(), points)
                }
            };

            let series: Vec<(Timestamp, f64)> = points.iter().map(|(d, v, _)| (*d, *v)).collect();
            emit(ctx.fmt, &series, || {
                if graph {
                    for line in create_ascii_graph(&series, graph_width(), GRAPH_HEIGHT, &title) {
                        println!("{line}");
                    }
                    return;
                }
                println!("{}", title.cyan().bold());
                if points.is_empty() {
                    println!("{}", "  (no trainings yet)".dimmed());
                }
                for (date, volume, prs) in &points {
                    let pr = if *prs > 0 {
                        format!("  {} PR", prs).green().to_string()
                    } else {
                        String::new()
                    };
                    println!("  {}  {:>12}{}", format_date(*date), format_volume(*volume), pr);
                }
            });
        }

        StatsCmd::Categories => {
            let exercises = store::exercises::all(pool).await?;
            let history = store::trainings::all(pool).await?;
            let by_category = analytics::volume_by_category(&history, &index_exercises(&exercises));
            let total: f64 = by_category.values().sum();

            emit(ctx.fmt, &by_category, || {
                println!("{}", "Volume by category".cyan().bold());
                let bar_width = graph_width().saturating_sub(30).max(10);
                for category in MuscleCategory::ALL {
                    let volume = by_category.get(&category).copied().unwrap_or(0.0);
                    let share = if total > 0.0 { volume / total } else { 0.0 };
                    let bar = "█".repeat((share * bar_width as f64).round() as usize);
                    println!(
                        "  {:<10} {:>12} {:>5.1}% {}",
                        category.to_string(),
                        format_volume(volume),
                        share * 100.0,
                        bar.cyan()
                    );
                }
            });
        }

        StatsCmd::Trends { limit } => {
            let exercises = store::exercises::all(pool).await?;
            let history = store::trainings::all(pool).await?;
            let threshold = ctx.cfg.attention_threshold()?;
            let report = TrendsReport {
                improving: analytics::top_improvers(&history, &exercises, limit, window),
                needs_attention: analytics::exercises_needing_attention(&history, &exercises, threshold, window),
            };

            emit(ctx.fmt, &report, || {
                println!("{}", "Top improvers".green().bold());
                if report.improving.is_empty() {
                    println!("{}", "  (not enough history)".dimmed());
                }
                for t in &report.improving {
                    println!("  {:<24} {}", t.exercise_name, trend_arrow(t.percentage_change));
                }

                println!("\n{}", "Needs attention".yellow().bold());
                if report.needs_attention.is_empty() {
                    println!("{}", "  (nothing is slipping)".dimmed());
                }
                for t in &report.needs_attention {
                    println!("  {:<24} {}", t.exercise_name, trend_arrow(t.percentage_change));
                }
            });
        }

        StatsCmd::Next => {
            let exercises = store::exercises::all(pool).await?;
            let days = store::exercise_days::all(pool).await?;
            let history = store::trainings::all(pool).await?;
            let recommendation =
                analytics::next_session_recommendation(&history, &days, &index_exercises(&exercises), window);
            let last_category = history
                .first()
                .and_then(|t| days.iter().find(|d| d.id == t.exercise_day_id))
                .map(|d| d.category);
            let next_category = rotation::next_category(last_category);
            let report = NextReport {
                recommendation,
                next_category,
                category_day: rotation::exercise_day_for_category(&days, next_category),
                recently_trained: rotation::last_trained_days(&history, &days, RECENT_DAYS, now),
            };
            let rec = &report.recommendation;

            emit(ctx.fmt, &report, || {
                match &rec.exercise_day {
                    Some(day) => println!("{} {} ({})", "Next:".cyan().bold(), day.name.bold(), rec.reason.dimmed()),
                    None => println!("{} {}", "warning:".yellow().bold(), rec.reason),
                }
                let by_category = report
                    .category_day
                    .map_or_else(|| "no template".dimmed().to_string(), |d| d.name.clone());
                println!(
                    "{} {} ({})",
                    "Category cycle:".cyan().bold(),
                    report.next_category.to_string().yellow(),
                    by_category
                );
                if !rec.focus_exercises.is_empty() {
                    println!("{}", "Focus on:".cyan().bold());
                    for focus in &rec.focus_exercises {
                        println!("  • {} {}", focus.exercise_name, format!("({})", focus.reason).dimmed());
                    }
                }
                if !report.recently_trained.is_empty() {
                    println!("{}", "Recently trained:".cyan().bold());
                    for last in &report.recently_trained {
                        let ago = match last.days_ago {
                            0 => "today".to_string(),
                            1 => "1 day ago".to_string(),
                            n => format!("{n} days ago"),
                        };
                        println!("  • {} {}", last.exercise_day.name, ago.dimmed());
                    }
                }
            });
        }

        StatsCmd::Prs { days, day } => {
            let day_id = match day {
                Some(input) => Some(resolve_day(pool, &input).await?.id),
                None => None,
            };
            let history = store::trainings::all(pool).await?;
            let since = now - days.max(0) * DAY_MS;
            let report = PrReport {
                days,
                since,
                count: analytics::count_prs_in_period(&history, day_id, since),
            };
            emit(ctx.fmt, &report, || {
                println!(
                    "{} {} weight PR(s) since {}",
                    "PRs:".green().bold(),
                    report.count,
                    format_date(report.since)
                )
            });
        }
    }

    Ok(())
}
