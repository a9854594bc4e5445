use anyhow::{Result, bail};
use colored::Colorize;
use pushpull::{
    models::{AppSettings, SettingsPatch},
    store,
    types::{OutputFmt, emit},
};

use super::Ctx;
use crate::cli::SettingsCmd;

fn print_settings(settings: &AppSettings, last_day: Option<&str>) {
    println!("{}", "Settings:".cyan().bold());
    println!("  {:<20} {}", "theme".green(), settings.theme);
    println!("  {:<20} {}s", "rest timer".green(), settings.rest_timer_duration);
    println!("  {:<20} {}", "rest timer volume".green(), settings.rest_timer_volume);
    println!("  {:<20} {}", "last exercise day".green(), last_day.unwrap_or("-"));
}

pub async fn handle(cmd: SettingsCmd, ctx: &Ctx) -> Result<()> {
    let mut conn = ctx.pool.acquire().await?;

    let settings = match cmd {
        SettingsCmd::Show => store::settings::get_or_init(&mut conn).await?,
        SettingsCmd::Set {
            theme,
            rest_timer,
            rest_volume,
        } => {
            if theme.is_none() && rest_timer.is_none() && rest_volume.is_none() {
                bail!("nothing to change -- pass `--theme`, `--rest-timer` or `--rest-volume`");
            }
            let patch = SettingsPatch {
                theme,
                rest_timer_duration: rest_timer,
                rest_timer_volume: rest_volume,
                ..Default::default()
            };
            let updated = store::settings::update(&mut conn, patch).await?;
            if ctx.fmt == OutputFmt::Text {
                println!("{} settings updated", "ok:".green().bold());
            }
            updated
        }
    };

    let last_day = match settings.last_exercise_day_id {
        Some(id) => store::exercise_days::get(&mut *conn, id).await?.map(|d| d.name),
        None => None,
    };
    emit(ctx.fmt, &settings, || print_settings(&settings, last_day.as_deref()));
    Ok(())
}
