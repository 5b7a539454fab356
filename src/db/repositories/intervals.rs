use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::categories::{Category, UserId};
use crate::db::{
    connection::Database,
    helpers::{format_date, format_instant, parse_category, parse_date, row_to_interval},
    models::{Boundary, Interval, NewInterval},
};
use crate::error::{TrackerError, ValidationError};

/// Per-category minute totals in order of first appearance.
pub type CategoryTotals = Vec<(Category, i64)>;

const INTERVAL_COLUMNS: &str =
    "id, user_id, category, local_date, start_instant, end_instant, duration_minutes";

pub(crate) fn insert_interval(conn: &Connection, record: &NewInterval) -> Result<Interval> {
    if record.end_instant < record.start_instant {
        return Err(ValidationError::EndBeforeStart.into());
    }

    conn.execute(
        "INSERT INTO closed_intervals
             (user_id, category, local_date, start_instant, end_instant, duration_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.user_id,
            record.category.as_str(),
            format_date(record.local_date),
            format_instant(record.start_instant),
            format_instant(record.end_instant),
            record.duration_minutes,
        ],
    )?;

    Ok(Interval {
        id: conn.last_insert_rowid(),
        user_id: record.user_id,
        category: record.category,
        local_date: record.local_date,
        start_instant: record.start_instant,
        end_instant: record.end_instant,
        duration_minutes: record.duration_minutes,
    })
}

fn find_interval(conn: &Connection, interval_id: i64) -> Result<Option<Interval>> {
    let query = format!("SELECT {INTERVAL_COLUMNS} FROM closed_intervals WHERE id = ?1");
    let mut stmt = conn.prepare(&query)?;
    let interval = stmt
        .query_row(params![interval_id], |row| Ok(row_to_interval(row)))
        .optional()?
        .transpose()?;
    Ok(interval)
}

impl Database {
    /// Inserts a closed interval; rejects `end < start`.
    pub async fn append_interval(&self, record: NewInterval) -> Result<Interval> {
        self.execute(move |conn| insert_interval(conn, &record)).await
    }

    pub async fn get_interval(&self, interval_id: i64) -> Result<Option<Interval>> {
        self.execute(move |conn| find_interval(conn, interval_id))
            .await
    }

    /// Moves one boundary of an interval and recomputes its duration and
    /// local date from the resulting pair of instants.
    pub async fn update_interval_boundary(
        &self,
        interval_id: i64,
        which: Boundary,
        new_instant: DateTime<Utc>,
    ) -> Result<Interval> {
        let clock = self.clock();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let current = find_interval(&tx, interval_id)?.ok_or_else(|| {
                TrackerError::NotFound(format!("interval {interval_id}"))
            })?;

            let (start_instant, end_instant) = match which {
                Boundary::Start => (new_instant, current.end_instant),
                Boundary::End => (current.start_instant, new_instant),
            };
            let derived = NewInterval::derive(
                current.user_id,
                current.category,
                start_instant,
                end_instant,
                &clock,
            )?;

            tx.execute(
                "UPDATE closed_intervals
                 SET start_instant = ?1,
                     end_instant = ?2,
                     duration_minutes = ?3,
                     local_date = ?4
                 WHERE id = ?5",
                params![
                    format_instant(derived.start_instant),
                    format_instant(derived.end_instant),
                    derived.duration_minutes,
                    format_date(derived.local_date),
                    interval_id,
                ],
            )?;
            tx.commit()?;

            Ok(Interval {
                id: interval_id,
                user_id: derived.user_id,
                category: derived.category,
                local_date: derived.local_date,
                start_instant: derived.start_instant,
                end_instant: derived.end_instant,
                duration_minutes: derived.duration_minutes,
            })
        })
        .await
    }

    /// Most recent interval by start instant.
    pub async fn latest_interval_for(&self, user_id: UserId) -> Result<Option<Interval>> {
        self.execute(move |conn| {
            let query = format!(
                "SELECT {INTERVAL_COLUMNS}
                 FROM closed_intervals
                 WHERE user_id = ?1
                 ORDER BY start_instant DESC, id DESC
                 LIMIT 1"
            );
            let mut stmt = conn.prepare(&query)?;
            let mut rows = stmt.query(params![user_id])?;
            let interval = match rows.next()? {
                Some(row) => Some(row_to_interval(row)?),
                None => None,
            };
            Ok(interval)
        })
        .await
    }

    pub async fn sum_durations_by_category(
        &self,
        user_id: UserId,
        local_date: NaiveDate,
    ) -> Result<CategoryTotals> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT category, SUM(duration_minutes) AS minutes
                 FROM closed_intervals
                 WHERE user_id = ?1 AND local_date = ?2
                 GROUP BY category
                 ORDER BY MIN(id) ASC",
            )?;

            let mut rows = stmt.query(params![user_id, format_date(local_date)])?;
            let mut totals = Vec::new();
            while let Some(row) = rows.next()? {
                let category: String = row.get("category")?;
                let minutes: i64 = row.get("minutes")?;
                totals.push((parse_category(&category)?, minutes));
            }

            Ok(totals)
        })
        .await
    }

    /// Totals for every date in `from..=to` that has at least one interval.
    pub async fn sum_durations_by_category_range(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, CategoryTotals>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT local_date, category, SUM(duration_minutes) AS minutes
                 FROM closed_intervals
                 WHERE user_id = ?1 AND local_date BETWEEN ?2 AND ?3
                 GROUP BY local_date, category
                 ORDER BY local_date ASC, MIN(id) ASC",
            )?;

            let mut rows = stmt.query(params![user_id, format_date(from), format_date(to)])?;
            let mut by_date: BTreeMap<NaiveDate, CategoryTotals> = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let local_date: String = row.get("local_date")?;
                let category: String = row.get("category")?;
                let minutes: i64 = row.get("minutes")?;
                by_date
                    .entry(parse_date(&local_date, "local_date")?)
                    .or_default()
                    .push((parse_category(&category)?, minutes));
            }

            Ok(by_date)
        })
        .await
    }

    /// Intervals of one category that touch the instant window `[from, to)`.
    ///
    /// An interval ending exactly at `from` is included, so a span closed at
    /// local midnight is still seen by the day it is bucketed on.
    pub async fn intervals_overlapping(
        &self,
        user_id: UserId,
        category: Category,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        self.execute(move |conn| {
            let query = format!(
                "SELECT {INTERVAL_COLUMNS}
                 FROM closed_intervals
                 WHERE user_id = ?1 AND category = ?2 AND end_instant >= ?3 AND start_instant < ?4
                 ORDER BY start_instant ASC, id ASC"
            );
            let mut stmt = conn.prepare(&query)?;
            let mut rows = stmt.query(params![
                user_id,
                category.as_str(),
                format_instant(from),
                format_instant(to)
            ])?;

            let mut intervals = Vec::new();
            while let Some(row) = rows.next()? {
                intervals.push(row_to_interval(row)?);
            }

            Ok(intervals)
        })
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_interval(&self, interval_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM closed_intervals WHERE id = ?1",
                params![interval_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
