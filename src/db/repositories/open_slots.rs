use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::categories::{Category, UserId};
use crate::clock::LocalClock;
use crate::db::{
    connection::Database,
    helpers::{format_instant, row_to_open_slot},
    models::{Interval, NewInterval, OpenSlot},
    repositories::intervals::insert_interval,
};
use crate::error::TrackerError;

fn find_slot(conn: &Connection, user_id: UserId) -> Result<Option<OpenSlot>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, category, start_instant
         FROM open_slots
         WHERE user_id = ?1",
    )?;

    let slot = stmt
        .query_row(params![user_id], |row| Ok(row_to_open_slot(row)))
        .optional()?
        .transpose()?;
    Ok(slot)
}

pub(crate) fn insert_slot(
    conn: &Connection,
    user_id: UserId,
    category: Category,
    start_instant: DateTime<Utc>,
) -> Result<()> {
    if find_slot(conn, user_id)?.is_some() {
        return Err(TrackerError::Conflict { user_id }.into());
    }

    conn.execute(
        "INSERT INTO open_slots (user_id, category, start_instant)
         VALUES (?1, ?2, ?3)",
        params![user_id, category.as_str(), format_instant(start_instant)],
    )?;
    Ok(())
}

pub(crate) fn take_slot(conn: &Connection, user_id: UserId) -> Result<Option<OpenSlot>> {
    let slot = find_slot(conn, user_id)?;
    if slot.is_some() {
        conn.execute("DELETE FROM open_slots WHERE user_id = ?1", params![user_id])?;
    }
    Ok(slot)
}

/// Turns the user's open slot into a closed interval ending at `end_instant`.
fn close_into_interval(
    conn: &Connection,
    user_id: UserId,
    end_instant: DateTime<Utc>,
    clock: &LocalClock,
) -> Result<Option<Interval>> {
    let Some(slot) = take_slot(conn, user_id)? else {
        return Ok(None);
    };

    let record = NewInterval::derive(
        user_id,
        slot.category,
        slot.start_instant,
        end_instant,
        clock,
    )?;
    let interval = insert_interval(conn, &record)?;
    Ok(Some(interval))
}

impl Database {
    /// Fails with a conflict if the user already has an open slot.
    pub async fn open_slot(
        &self,
        user_id: UserId,
        category: Category,
        start_instant: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| insert_slot(conn, user_id, category, start_instant))
            .await
    }

    /// Removes and returns the open slot; `None` when there is nothing to close.
    pub async fn close_slot(&self, user_id: UserId) -> Result<Option<(Category, DateTime<Utc>)>> {
        self.execute(move |conn| {
            let slot = take_slot(conn, user_id)?;
            Ok(slot.map(|slot| (slot.category, slot.start_instant)))
        })
        .await
    }

    pub async fn get_open_slot(&self, user_id: UserId) -> Result<Option<OpenSlot>> {
        self.execute(move |conn| find_slot(conn, user_id)).await
    }

    pub async fn list_open_slots(&self) -> Result<Vec<OpenSlot>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, category, start_instant
                 FROM open_slots
                 ORDER BY start_instant ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut slots = Vec::new();
            while let Some(row) = rows.next()? {
                slots.push(row_to_open_slot(row)?);
            }

            Ok(slots)
        })
        .await
    }

    /// Closes the open slot (if any) into an interval ending at `end_instant`,
    /// in one transaction.
    pub async fn close_slot_into_interval(
        &self,
        user_id: UserId,
        end_instant: DateTime<Utc>,
    ) -> Result<Option<Interval>> {
        let clock = self.clock();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let closed = close_into_interval(&tx, user_id, end_instant, &clock)?;
            tx.commit()?;
            Ok(closed)
        })
        .await
    }

    /// Close-then-open in one transaction: the previous slot (if any) becomes a
    /// closed interval ending at `now` and a new slot for `category` starts at `now`.
    pub async fn switch_slot(
        &self,
        user_id: UserId,
        category: Category,
        now: DateTime<Utc>,
    ) -> Result<Option<Interval>> {
        let clock = self.clock();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let closed = close_into_interval(&tx, user_id, now, &clock)?;
            insert_slot(&tx, user_id, category, now)?;
            tx.commit()?;
            Ok(closed)
        })
        .await
    }
}
