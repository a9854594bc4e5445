use sqlx::{SqliteConnection, SqliteExecutor};

use crate::{
    Result,
    models::{AppSettings, SettingsPatch},
};

const COLUMNS: &str = "last_exercise_day_id, theme, rest_timer_duration, rest_timer_volume";

pub async fn get<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Option<AppSettings>> {
    let sql = format!("SELECT {COLUMNS} FROM settings WHERE id = 1");
    Ok(sqlx::query_as(&sql).fetch_optional(ex).await?)
}

/// Insert or overwrite the single settings row.
pub async fn put<'e, E: SqliteExecutor<'e>>(ex: E, settings: &AppSettings) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (id, last_exercise_day_id, theme, rest_timer_duration, rest_timer_volume)
         VALUES (1, ?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            last_exercise_day_id = excluded.last_exercise_day_id,
            theme = excluded.theme,
            rest_timer_duration = excluded.rest_timer_duration,
            rest_timer_volume = excluded.rest_timer_volume",
    )
    .bind(settings.last_exercise_day_id)
    .bind(settings.theme)
    .bind(settings.rest_timer_duration)
    .bind(settings.rest_timer_volume)
    .execute(ex)
    .await?;
    Ok(())
}

/// Stored settings, writing the defaults on first access.
pub async fn get_or_init(conn: &mut SqliteConnection) -> Result<AppSettings> {
    if let Some(settings) = get(&mut *conn).await? {
        return Ok(settings);
    }
    let defaults = AppSettings::default();
    put(&mut *conn, &defaults).await?;
    Ok(defaults)
}

pub async fn update(conn: &mut SqliteConnection, patch: SettingsPatch) -> Result<AppSettings> {
    let mut settings = get_or_init(&mut *conn).await?;
    if let Some(day) = patch.last_exercise_day_id {
        settings.last_exercise_day_id = day;
    }
    if let Some(theme) = patch.theme {
        settings.theme = theme;
    }
    if let Some(duration) = patch.rest_timer_duration {
        settings.rest_timer_duration = duration;
    }
    if let Some(volume) = patch.rest_timer_volume {
        settings.rest_timer_volume = volume;
    }
    put(&mut *conn, &settings).await?;
    Ok(settings)
}

pub async fn clear<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    Ok(sqlx::query("DELETE FROM settings").execute(ex).await?.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, models::ExerciseDayId, types::Theme};

    #[tokio::test]
    async fn defaults_are_written_once_and_patched() {
        let pool = db::open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(get(&mut *conn).await.unwrap(), None);
        assert_eq!(get_or_init(&mut conn).await.unwrap(), AppSettings::default());
        assert!(get(&mut *conn).await.unwrap().is_some());

        let patched = update(
            &mut conn,
            SettingsPatch {
                last_exercise_day_id: Some(Some(ExerciseDayId(3))),
                theme: Some(Theme::Light),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(patched.rest_timer_duration, 120);
        assert_eq!(get(&mut *conn).await.unwrap(), Some(patched));

        let cleared = update(
            &mut conn,
            SettingsPatch {
                last_exercise_day_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.last_exercise_day_id, None);
        assert_eq!(cleared.theme, Theme::Light);
    }
}
