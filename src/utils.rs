use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::models::Timestamp;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub fn now_millis() -> Timestamp {
    Local::now().timestamp_millis()
}

/// Local calendar day a timestamp falls on.
pub fn local_date(ts: Timestamp) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ts).map(|utc| utc.with_timezone(&Local).date_naive())
}

/// Timestamp of `date` at `hour:00` local time.
pub fn local_timestamp(date: NaiveDate, hour: u32) -> Option<Timestamp> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// `ts` moved to `date`, keeping its local time of day.
pub fn with_local_date(ts: Timestamp, date: NaiveDate) -> Option<Timestamp> {
    let time = to_local(ts)?.time();
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

pub fn to_local(ts: Timestamp) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(ts).map(|utc| utc.with_timezone(&Local))
}

pub fn format_date(ts: Timestamp) -> String {
    to_local(ts)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Whole days elapsed between `ts` and `now`.
pub fn days_ago(ts: Timestamp, now: Timestamp) -> i64 {
    (now - ts).div_euclid(DAY_MS)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn format_duration(duration: chrono::Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    let seconds = duration.num_seconds() % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Volume with thousands separators, e.g. `12,340 kg`.
pub fn format_volume(volume: f64) -> String {
    let rounded = volume.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    format!("{out} kg")
}
