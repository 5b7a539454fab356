use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;

use crate::categories::Category;
use crate::db::models::{Interval, OpenSlot};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed-width UTC form so stored instants sort lexicographically.
pub fn format_instant(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_category(value: &str) -> Result<Category> {
    Category::from_key(value)
}

pub fn row_to_interval(row: &Row) -> Result<Interval> {
    let category: String = row.get("category")?;
    let local_date: String = row.get("local_date")?;
    let start_instant: String = row.get("start_instant")?;
    let end_instant: String = row.get("end_instant")?;

    Ok(Interval {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        category: parse_category(&category)?,
        local_date: parse_date(&local_date, "local_date")?,
        start_instant: parse_datetime(&start_instant, "start_instant")?,
        end_instant: parse_datetime(&end_instant, "end_instant")?,
        duration_minutes: row.get("duration_minutes")?,
    })
}

pub fn row_to_open_slot(row: &Row) -> Result<OpenSlot> {
    let category: String = row.get("category")?;
    let start_instant: String = row.get("start_instant")?;

    Ok(OpenSlot {
        user_id: row.get("user_id")?,
        category: parse_category(&category)?,
        start_instant: parse_datetime(&start_instant, "start_instant")?,
    })
}
