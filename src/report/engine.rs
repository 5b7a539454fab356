//! Daily and weekly breakdowns.
//!
//! Interval rows are bucketed by the local date of their end instant. An
//! overnight interval (sleep) that starts before the midnight of its bucket
//! date would otherwise count its pre-midnight part on the wrong day, so that
//! part is moved back to the previous date before the untracked remainder is
//! derived. With that split, tracked plus untracked equals the elapsed minutes
//! of every day.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::{
    categories::{Category, UserId},
    clock::{minutes_between, LocalClock},
    db::{CategoryTotals, Database, Interval},
    error::{TrackerError, TrackerResult},
    log_debug,
};

use super::types::{Bucket, BucketMinutes, DayBreakdown, WeeklyReport};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "daytally::report";

const WEEK_DAYS: i64 = 7;

#[derive(Clone)]
pub struct ReportEngine {
    db: Database,
    clock: LocalClock,
}

impl ReportEngine {
    pub fn new(db: Database) -> Self {
        let clock = db.clock();
        Self { db, clock }
    }

    /// Breakdown of the local day containing `now`.
    pub async fn daily_report(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> TrackerResult<DayBreakdown> {
        let today = self.clock.local_date(now);
        self.daily_report_for(user_id, today, now).await
    }

    /// Breakdown of any local date as seen at `now`: past dates count the full
    /// 1440 minutes, today counts the minutes elapsed so far.
    pub async fn daily_report_for(
        &self,
        user_id: UserId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> TrackerResult<DayBreakdown> {
        let mut days = self.breakdowns(user_id, date, date, now).await?;
        days.remove(&date)
            .ok_or_else(|| TrackerError::NotFound(format!("breakdown for {date}")))
    }

    /// The seven local dates ending at `reference_date`.
    pub async fn weekly_report(
        &self,
        user_id: UserId,
        reference_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> TrackerResult<WeeklyReport> {
        let from = reference_date - Duration::days(WEEK_DAYS - 1);
        let days = self.breakdowns(user_id, from, reference_date, now).await?;
        Ok(WeeklyReport {
            reference_date,
            days,
        })
    }

    async fn breakdowns(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
    ) -> TrackerResult<BTreeMap<NaiveDate, DayBreakdown>> {
        let mut totals = self
            .db
            .sum_durations_by_category_range(user_id, from, to)
            .await
            .map_err(TrackerError::from_storage)?;

        let shifts = self.overnight_shifts(user_id, from, to).await?;

        let mut days = BTreeMap::new();
        let mut date = from;
        while date <= to {
            let day_totals = totals.remove(&date).unwrap_or_default();
            let day_shifts = shifts.get(&date);
            let elapsed = self.clock.elapsed_minutes_on(date, now);
            days.insert(date, build_day(date, day_totals, day_shifts, elapsed));

            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        Ok(days)
    }

    /// Minute adjustments per date and overnight category: negative on the
    /// date an interval is bucketed on, positive on every earlier date it covers.
    async fn overnight_shifts(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> TrackerResult<HashMap<NaiveDate, HashMap<Category, i64>>> {
        let mut shifts: HashMap<NaiveDate, HashMap<Category, i64>> = HashMap::new();
        let window_start = self.clock.midnight_of(from);
        let window_end = self.clock.midnight_of(to.succ_opt().unwrap_or(to));

        for category in overnight_categories() {
            let intervals = self
                .db
                .intervals_overlapping(user_id, category, window_start, window_end)
                .await
                .map_err(TrackerError::from_storage)?;

            for interval in intervals {
                let credits = earlier_day_shares(&interval, &self.clock);
                let carried: i64 = credits.iter().map(|(_, minutes)| minutes).sum();
                if carried == 0 {
                    continue;
                }

                log_debug!(
                    "interval {} carries {carried} min back over {} day(s)",
                    interval.id,
                    credits.len()
                );
                for (date, minutes) in credits {
                    *shifts
                        .entry(date)
                        .or_default()
                        .entry(category)
                        .or_insert(0) += minutes;
                }
                *shifts
                    .entry(interval.local_date)
                    .or_default()
                    .entry(category)
                    .or_insert(0) -= carried;
            }
        }

        Ok(shifts)
    }
}

/// Minutes of an interval that fall on local dates before the one it is
/// bucketed on, one entry per such date.
///
/// Shares are taken as differences of the rounded running total from the
/// start, so together they never exceed the stored duration.
fn earlier_day_shares(interval: &Interval, clock: &LocalClock) -> Vec<(NaiveDate, i64)> {
    let mut shares = Vec::new();
    let mut day = clock.local_date(interval.start_instant);
    let mut counted = 0;

    while day < interval.local_date {
        let Some(next) = day.succ_opt() else {
            break;
        };
        let day_end = clock.midnight_of(next).min(interval.end_instant);
        let running = minutes_between(interval.start_instant, day_end)
            .min(interval.duration_minutes)
            .max(0);
        if running > counted {
            shares.push((day, running - counted));
            counted = running;
        }
        day = next;
    }

    shares
}

fn overnight_categories() -> impl Iterator<Item = Category> {
    Category::ALL.into_iter().filter(Category::is_overnight)
}

fn build_day(
    date: NaiveDate,
    totals: CategoryTotals,
    shifts: Option<&HashMap<Category, i64>>,
    elapsed_minutes: i64,
) -> DayBreakdown {
    let mut entries: Vec<BucketMinutes> = totals
        .into_iter()
        .map(|(category, minutes)| BucketMinutes {
            bucket: Bucket::Category(category),
            minutes,
        })
        .collect();

    if let Some(shifts) = shifts {
        for category in overnight_categories() {
            let Some(&shift) = shifts.get(&category) else {
                continue;
            };
            if shift == 0 {
                continue;
            }

            let bucket = Bucket::Category(category);
            match entries.iter_mut().find(|entry| entry.bucket == bucket) {
                Some(entry) => entry.minutes = (entry.minutes + shift).max(0),
                None if shift > 0 => entries.push(BucketMinutes {
                    bucket,
                    minutes: shift,
                }),
                None => {}
            }
            entries.retain(|entry| entry.bucket != bucket || entry.minutes > 0);
        }
    }

    let tracked_minutes: i64 = entries.iter().map(|entry| entry.minutes).sum();
    let untracked_minutes = (elapsed_minutes - tracked_minutes).max(0);
    entries.push(BucketMinutes {
        bucket: Bucket::Untracked,
        minutes: untracked_minutes,
    });

    DayBreakdown {
        date,
        weekday: date.weekday(),
        elapsed_minutes,
        tracked_minutes,
        untracked_minutes,
        entries,
    }
}
