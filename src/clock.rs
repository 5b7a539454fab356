//! Conversions between absolute instants and wall-clock time in the configured zone.
//!
//! Every interval boundary is stored as a UTC instant; day bucketing and
//! anything shown to the user goes through a [`LocalClock`].

use anyhow::{anyhow, Result};
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::ValidationError;

pub const DEFAULT_TIME_ZONE: &str = "Asia/Dubai";
pub const MINUTES_PER_DAY: i64 = 1440;

/// A DST gap never lasts longer than this; the forward scan stops there.
const MAX_GAP_MINUTES: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    zone: Tz,
}

impl Default for LocalClock {
    fn default() -> Self {
        Self {
            zone: chrono_tz::Asia::Dubai,
        }
    }
}

impl LocalClock {
    pub fn from_name(name: &str) -> Result<Self> {
        let zone: Tz = name
            .trim()
            .parse()
            .map_err(|err| anyhow!("unknown time zone '{name}': {err}"))?;
        Ok(Self { zone })
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Interprets a naive local timestamp in this zone.
    ///
    /// Ambiguous wall times (DST fall-back) resolve to the earlier instant;
    /// wall times inside a DST gap move forward to the first minute that exists.
    pub fn to_absolute(&self, local: NaiveDateTime) -> DateTime<Utc> {
        if let Some(instant) = self.resolve(local) {
            return instant;
        }

        let mut cursor = local + Duration::minutes(1);
        for _ in 0..MAX_GAP_MINUTES {
            if let Some(instant) = self.resolve(cursor) {
                return instant;
            }
            cursor += Duration::minutes(1);
        }

        // Unreachable for real zone data; fall back to the offset in force at
        // that moment read as UTC.
        let offset = self.zone.offset_from_utc_datetime(&local).fix();
        Utc.from_utc_datetime(&(local - Duration::seconds(offset.local_minus_utc().into())))
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.zone).naive_local()
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date()
    }

    /// Absolute instant of 00:00 local time on the day containing `instant`.
    pub fn local_midnight(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.midnight_of(self.local_date(instant))
    }

    pub fn midnight_of(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_absolute(date.and_time(NaiveTime::MIN))
    }

    /// Minutes elapsed since local midnight, rounded like interval durations.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        minutes_between(self.local_midnight(now), now)
    }

    /// Minutes of `date` that have elapsed by `now`: the full day for past
    /// dates, nothing for future ones.
    pub fn elapsed_minutes_on(&self, date: NaiveDate, now: DateTime<Utc>) -> i64 {
        let today = self.local_date(now);
        if date < today {
            MINUTES_PER_DAY
        } else if date == today {
            self.elapsed_minutes(now)
        } else {
            0
        }
    }

    /// Resolves a bare time of day to the latest occurrence not after `now`.
    pub fn most_recent(&self, time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.local_date(now);
        let candidate = self.to_absolute(today.and_time(time));
        if candidate <= now {
            return candidate;
        }
        match today.pred_opt() {
            Some(yesterday) => self.to_absolute(yesterday.and_time(time)),
            None => candidate,
        }
    }

    /// Resolves a bare time of day to the first occurrence at or after `anchor`.
    pub fn next_on_or_after(&self, time: NaiveTime, anchor: DateTime<Utc>) -> DateTime<Utc> {
        let day = self.local_date(anchor);
        let candidate = self.to_absolute(day.and_time(time));
        if candidate >= anchor {
            return candidate;
        }
        match day.succ_opt() {
            Some(next_day) => self.to_absolute(next_day.and_time(time)),
            None => candidate,
        }
    }

    /// Resolves user input against the local calendar date of `reference`.
    pub fn on_date_of(&self, input: LocalInput, reference: DateTime<Utc>) -> DateTime<Utc> {
        match input {
            LocalInput::TimeOfDay(time) => {
                self.to_absolute(self.local_date(reference).and_time(time))
            }
            LocalInput::DateTime(local) => self.to_absolute(local),
        }
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(datetime) => Some(datetime.with_timezone(&Utc)),
            LocalResult::Ambiguous(first, second) => Some(first.min(second).with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }
}

/// Whole minutes between two instants, rounded half up. Negative spans are
/// rounded symmetrically so a reversed pair gives the negated value.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds();
    if seconds >= 0 {
        (seconds + 30) / 60
    } else {
        -((-seconds + 30) / 60)
    }
}

/// A timestamp typed by the user, before it is anchored to a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalInput {
    TimeOfDay(NaiveTime),
    DateTime(NaiveDateTime),
}

const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H.%M"];
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%d.%m.%Y %H:%M"];

pub fn parse_local_input(input: &str) -> Result<LocalInput, ValidationError> {
    let trimmed = input.trim();

    for format in DATE_TIME_FORMATS {
        if let Ok(local) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(LocalInput::DateTime(local));
        }
    }

    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
            return Ok(LocalInput::TimeOfDay(time));
        }
    }

    Err(ValidationError::MalformedTime(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use super::{minutes_between, parse_local_input, LocalClock, LocalInput};
    use crate::error::ValidationError;

    fn dubai() -> LocalClock {
        LocalClock::from_name("Asia/Dubai").expect("zone should parse")
    }

    #[test]
    fn converts_dubai_wall_time_both_ways() {
        let clock = dubai();
        let local = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let instant = clock.to_absolute(local);
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 10, 5, 0, 0).unwrap());
        assert_eq!(clock.to_local(instant), local);
    }

    #[test]
    fn local_midnight_is_previous_utc_evening() {
        let clock = dubai();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        assert_eq!(
            clock.local_midnight(now),
            Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap()
        );
        assert_eq!(clock.elapsed_minutes(now), 360);
    }

    #[test]
    fn skips_forward_over_dst_gap() {
        let clock = LocalClock::from_name("Europe/Berlin").unwrap();
        let in_gap = NaiveDate::from_ymd_opt(2026, 3, 29)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert_eq!(
            clock.to_absolute(in_gap),
            Utc.with_ymd_and_hms(2026, 3, 29, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn ambiguous_wall_time_takes_earlier_instant() {
        let clock = LocalClock::from_name("Europe/Berlin").unwrap();
        let repeated = NaiveDate::from_ymd_opt(2026, 10, 25)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert_eq!(
            clock.to_absolute(repeated),
            Utc.with_ymd_and_hms(2026, 10, 25, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn rejects_unknown_zone() {
        assert!(LocalClock::from_name("Mars/Olympus").is_err());
    }

    #[test]
    fn rounds_minutes_half_up() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(minutes_between(start, start + chrono::Duration::seconds(89)), 1);
        assert_eq!(minutes_between(start, start + chrono::Duration::seconds(90)), 2);
        assert_eq!(minutes_between(start, start + chrono::Duration::seconds(29)), 0);
        assert_eq!(minutes_between(start + chrono::Duration::seconds(90), start), -2);
    }

    #[test]
    fn parses_supported_input_shapes() {
        assert_eq!(
            parse_local_input("7:05"),
            Ok(LocalInput::TimeOfDay(NaiveTime::from_hms_opt(7, 5, 0).unwrap()))
        );
        assert_eq!(
            parse_local_input(" 23.15 "),
            Ok(LocalInput::TimeOfDay(NaiveTime::from_hms_opt(23, 15, 0).unwrap()))
        );
        assert!(matches!(
            parse_local_input("2026-03-09 23:00"),
            Ok(LocalInput::DateTime(_))
        ));
        assert_eq!(
            parse_local_input("25:00"),
            Err(ValidationError::MalformedTime("25:00".to_string()))
        );
        assert!(parse_local_input("soon").is_err());
    }

    #[test]
    fn bare_times_resolve_relative_to_now_and_anchor() {
        let clock = dubai();
        // 08:00 local on 2026-03-10
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap();
        let eleven_pm = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        let seven_am = NaiveTime::from_hms_opt(7, 0, 0).unwrap();

        let start = clock.most_recent(eleven_pm, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 19, 0, 0).unwrap());

        let end = clock.next_on_or_after(seven_am, start);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 10, 3, 0, 0).unwrap());
    }

    #[test]
    fn elapsed_minutes_on_past_and_future_days() {
        let clock = dubai();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap();
        let today = clock.local_date(now);
        assert_eq!(clock.elapsed_minutes_on(today, now), 480);
        assert_eq!(clock.elapsed_minutes_on(today.pred_opt().unwrap(), now), 1440);
        assert_eq!(clock.elapsed_minutes_on(today.succ_opt().unwrap(), now), 0);
    }
}
