//! Closed interval records.
//!
//! `duration_minutes` and `local_date` are derived from the two instants and
//! are only ever computed by [`NewInterval::derive`] or a boundary update;
//! neither is edited on its own.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::{Category, UserId};
use crate::clock::{minutes_between, LocalClock};
use crate::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub id: i64,
    pub user_id: UserId,
    pub category: Category,
    pub local_date: NaiveDate,
    pub start_instant: DateTime<Utc>,
    pub end_instant: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl Interval {
    pub fn boundary(&self, which: Boundary) -> DateTime<Utc> {
        match which {
            Boundary::Start => self.start_instant,
            Boundary::End => self.end_instant,
        }
    }
}

/// A closed interval that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInterval {
    pub user_id: UserId,
    pub category: Category,
    pub local_date: NaiveDate,
    pub start_instant: DateTime<Utc>,
    pub end_instant: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl NewInterval {
    pub fn derive(
        user_id: UserId,
        category: Category,
        start_instant: DateTime<Utc>,
        end_instant: DateTime<Utc>,
        clock: &LocalClock,
    ) -> Result<Self, ValidationError> {
        if end_instant < start_instant {
            return Err(ValidationError::EndBeforeStart);
        }

        Ok(Self {
            user_id,
            category,
            local_date: clock.local_date(end_instant),
            start_instant,
            end_instant,
            duration_minutes: minutes_between(start_instant, end_instant),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Boundary {
    Start,
    End,
}

impl Boundary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Boundary::Start => "start",
            Boundary::End => "end",
        }
    }

    pub fn opposite(&self) -> Boundary {
        match self {
            Boundary::Start => Boundary::End,
            Boundary::End => Boundary::Start,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::NewInterval;
    use crate::categories::Category;
    use crate::clock::LocalClock;
    use crate::error::ValidationError;

    #[test]
    fn buckets_by_local_date_of_end() {
        let clock = LocalClock::default();
        // 23:00 -> 07:00 Dubai time
        let start = Utc.with_ymd_and_hms(2026, 3, 9, 19, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 3, 0, 0).unwrap();
        let record = NewInterval::derive(1, Category::Sleep, start, end, &clock).unwrap();
        assert_eq!(record.local_date, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(record.duration_minutes, 480);
    }

    #[test]
    fn rejects_reversed_instants() {
        let clock = LocalClock::default();
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 5, 0, 0).unwrap();
        let end = start - chrono::Duration::minutes(1);
        assert_eq!(
            NewInterval::derive(1, Category::Work, start, end, &clock),
            Err(ValidationError::EndBeforeStart)
        );
    }
}
