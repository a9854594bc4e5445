use anyhow::{Context, Result};
use colored::Colorize;
use pushpull::{
    backup::{self, ImportMode},
    types::emit,
    utils,
};

use super::Ctx;
use crate::cli::BackupCmd;

pub async fn handle(cmd: BackupCmd, ctx: &Ctx) -> Result<()> {
    match cmd {
        BackupCmd::Export { file } => {
            let document = backup::export(&ctx.pool, utils::now_millis()).await?;
            let json = backup::to_json(&document)?;

            match file {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write backup to {}", path.display()))?;
                    eprintln!(
                        "{} exported {} exercises, {} exercise days, {} trainings to {}",
                        "ok:".green().bold(),
                        document.exercises.len(),
                        document.exercise_days.len(),
                        document.trainings.len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }

        BackupCmd::Import { file, mode } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Could not read file: `{}`", file.display()))?;
            let document = backup::parse(&text).with_context(|| format!("Invalid backup file: {}", file.display()))?;

            let summary = backup::import(&ctx.pool, &document, mode).await?;
            emit(ctx.fmt, &summary, || match mode {
                ImportMode::Replace => println!(
                    "{} replaced all data: {} exercises, {} exercise days, {} trainings",
                    "ok:".green().bold(),
                    summary.exercises_added,
                    summary.exercise_days_added,
                    summary.trainings_added
                ),
                ImportMode::Merge => println!(
                    "{} merged: {} new exercises, {} new exercise days, {} new trainings",
                    "ok:".green().bold(),
                    summary.exercises_added,
                    summary.exercise_days_added,
                    summary.trainings_added
                ),
            });
        }
    }

    Ok(())
}
