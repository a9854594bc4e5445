use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, Months, NaiveDate};
use colored::Colorize;
use pushpull::{
    models::{ExerciseDayId, Training},
    store,
    types::emit,
    utils::{self, format_volume},
};
use serde::Serialize;

use super::Ctx;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarDay {
    date: String,
    trainings: Vec<CalendarEntry>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEntry {
    exercise_day_id: ExerciseDayId,
    exercise_day: String,
    volume: f64,
}

pub async fn handle(ctx: &Ctx, year: Option<i32>, month: Option<u32>) -> Result<()> {
    let today = Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());

    if !(1..=12).contains(&month) {
        bail!("month must be between 1 and 12");
    }

    let first_day = NaiveDate::from_ymd_opt(year, month, 1).context("invalid year")?;
    let next_month = first_day
        .checked_add_months(Months::new(1))
        .context("date out of range")?;
    let last_day = next_month.pred_opt().context("date out of range")?;

    let start = utils::local_timestamp(first_day, 0).context("invalid local date")?;
    let end = utils::local_timestamp(next_month, 0).context("invalid local date")? - 1;
    let trainings = store::trainings::in_range(&ctx.pool, start, end).await?;
    let days = store::exercise_days::all(&ctx.pool).await?;
    let day_name = |t: &Training| {
        days.iter()
            .find(|d| d.id == t.exercise_day_id)
            .map_or_else(|| "deleted day".to_string(), |d| d.name.clone())
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<CalendarEntry>> = BTreeMap::new();
    for training in &trainings {
        let Some(date) = utils::local_date(training.date) else {
            continue;
        };
        by_date.entry(date).or_default().push(CalendarEntry {
            exercise_day_id: training.exercise_day_id,
            exercise_day: day_name(training),
            volume: training.total_volume,
        });
    }

    let json: Vec<CalendarDay> = by_date
        .iter()
        .map(|(date, entries)| CalendarDay {
            date: date.format("%Y-%m-%d").to_string(),
            trainings: entries.clone(),
        })
        .collect();

    emit(ctx.fmt, &json, || {
        println!("\n{}", first_day.format("%B %Y").to_string().bold().cyan());
        println!("{}", "Su Mo Tu We Th Fr Sa".dimmed());

        let first_weekday = first_day.weekday().num_days_from_sunday() as usize;
        print!("{}", "   ".repeat(first_weekday));

        for day in 1..=last_day.day() {
            let trained = first_day
                .with_day(day)
                .is_some_and(|d| by_date.contains_key(&d));
            let label = format!("{day:2}");
            if trained {
                print!("{} ", label.green().bold());
            } else if year == today.year() && month == today.month() && day == today.day() {
                print!("{} ", label.underline());
            } else {
                print!("{label} ");
            }

            if (first_weekday + day as usize) % 7 == 0 {
                println!();
            }
        }
        println!("\n");

        if by_date.is_empty() {
            println!("{}", "(no trainings this month)".dimmed());
            return;
        }
        println!("{}", "Trainings:".bold().cyan());
        for (date, entries) in &by_date {
            for entry in entries {
                println!(
                    "  {}  {} {}",
                    date.format("%a %b %d").to_string().green(),
                    entry.exercise_day.bold(),
                    format!("({})", format_volume(entry.volume)).dimmed()
                );
            }
        }
    });

    Ok(())
}
