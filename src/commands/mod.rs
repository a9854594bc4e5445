use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use colored::Colorize;
use pushpull::{
    config::Config,
    db::DB,
    models::{Exercise, ExerciseDay, ExerciseDayId, ExerciseId},
    storage, store,
    types::{MuscleCategory, OutputFmt, best_muscle_suggestion, canonical_muscle},
};

pub mod backup;
pub mod calendar;
pub mod config;
pub mod day;
pub mod exercise;
pub mod history;
pub mod session;
pub mod settings;
pub mod stats;

/// What every database-backed command gets.
pub struct Ctx {
    pub pool: DB,
    pub fmt: OutputFmt,
    pub cfg: Config,
    pub session_path: PathBuf,
}

impl Ctx {
    pub fn new(pool: DB, fmt: OutputFmt, cfg: Config, db_path: &Path) -> Self {
        let data_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
        Self {
            pool,
            fmt,
            cfg,
            session_path: storage::session_path(data_dir),
        }
    }
}

/// Look up an exercise by id, falling back to its name in any case.
pub async fn resolve_exercise(pool: &DB, input: &str) -> Result<Exercise> {
    let input = input.trim();
    if let Ok(id) = input.parse::<i64>() {
        if let Some(exercise) = store::exercises::get(pool, ExerciseId(id)).await? {
            return Ok(exercise);
        }
    }
    match store::exercises::find_by_name(pool, input).await? {
        Some(exercise) => Ok(exercise),
        None => bail!("no exercise `{input}` (use `ex list` to view all exercises)"),
    }
}

pub async fn resolve_day(pool: &DB, input: &str) -> Result<ExerciseDay> {
    let input = input.trim();
    if let Ok(id) = input.parse::<i64>() {
        if let Some(day) = store::exercise_days::get(pool, ExerciseDayId(id)).await? {
            return Ok(day);
        }
    }
    match store::exercise_days::find_by_name(pool, input).await? {
        Some(day) => Ok(day),
        None => bail!("no exercise day `{input}` (use `day list` to view all days)"),
    }
}

pub fn parse_muscle(input: &str) -> Result<MuscleCategory> {
    if let Some(category) = canonical_muscle(input) {
        return Ok(category);
    }
    let allowed = MuscleCategory::ALL.map(MuscleCategory::as_str).join(", ");
    match best_muscle_suggestion(input) {
        Some(suggestion) => bail!("unknown category `{input}` -- did you mean: `{suggestion}`?"),
        None => bail!("unknown category `{input}` (allowed: {allowed})"),
    }
}

/// Printable width of `s`, ignoring ANSI colour sequences.
pub fn plain_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut count = 0;
    while i < bytes.len() {
        if bytes[i] == 0x1B {
            // Skip \x1b[... m
            while i < bytes.len() && bytes[i] != b'm' {
                i += 1;
            }
            i += 1;
        } else {
            if bytes[i] & 0xC0 != 0x80 {
                count += 1;
            }
            i += 1;
        }
    }
    count
}

/// Print `left | right` rows with the separators lined up.
pub fn print_columns(rows: Vec<(String, String)>) {
    let pad = rows.iter().map(|(l, _)| plain_len(l)).max().unwrap_or(0);
    for (left, right) in rows {
        let hidden = left.chars().count() - plain_len(&left);
        println!("{:<width$} {} {}", left, "|".blue(), right, width = pad + hidden);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_len_skips_colour_codes_and_counts_chars() {
        colored::control::set_override(true);
        assert_eq!(plain_len(&"bench".green().bold().to_string()), 5);
        assert_eq!(plain_len("• Rücken"), 8);
        colored::control::unset_override();
    }

    #[test]
    fn muscle_parsing_suggests() {
        assert_eq!(parse_muscle("CHEST").unwrap(), MuscleCategory::Chest);
        let err = parse_muscle("chets").unwrap_err().to_string();
        assert!(err.contains("did you mean"), "{err}");
    }
}
