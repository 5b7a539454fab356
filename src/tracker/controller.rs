use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    categories::{Category, UserId},
    clock::{LocalClock, LocalInput},
    db::{Boundary, Database, Interval, NewInterval},
    error::{TrackerError, TrackerResult, ValidationError},
    log_debug, log_info, log_warn,
};

use super::{ClosedSpan, StartOutcome, StopOutcome, TrackingState};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "daytally::tracker";

/// Start/stop/backfill/edit transitions for every user.
///
/// Holds no per-user state of its own: the open-slot table is the source of
/// truth, and every multi-step transition runs as a single store transaction,
/// so a failed write leaves nothing to roll back here.
#[derive(Clone)]
pub struct TrackingController {
    db: Database,
    clock: LocalClock,
}

impl TrackingController {
    pub fn new(db: Database) -> Self {
        let clock = db.clock();
        Self { db, clock }
    }

    pub fn clock(&self) -> LocalClock {
        self.clock
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn state(&self, user_id: UserId) -> TrackerResult<TrackingState> {
        let slot = self
            .db
            .get_open_slot(user_id)
            .await
            .map_err(TrackerError::from_storage)?;
        Ok(TrackingState::from(slot))
    }

    /// Closes whatever is being tracked and starts `category` at `now`.
    ///
    /// Selecting the category that is already running closes the finished span
    /// through the stop path and starts a fresh one.
    pub async fn start(
        &self,
        user_id: UserId,
        category: Category,
        now: DateTime<Utc>,
    ) -> TrackerResult<StartOutcome> {
        let closed = self
            .db
            .switch_slot(user_id, category, now)
            .await
            .map_err(TrackerError::from_storage)?;

        let closed = closed.as_ref().map(ClosedSpan::from);
        if let Some(span) = &closed {
            log_info!(
                "user {user_id}: closed {} after {} min",
                span.category.as_str(),
                span.minutes
            );
        }
        log_info!("user {user_id}: tracking {}", category.as_str());

        Ok(StartOutcome {
            closed,
            state: TrackingState::Tracking {
                category,
                started_at: now,
            },
        })
    }

    pub async fn stop(&self, user_id: UserId, now: DateTime<Utc>) -> TrackerResult<StopOutcome> {
        let closed = self
            .db
            .close_slot_into_interval(user_id, now)
            .await
            .map_err(TrackerError::from_storage)?;

        match closed {
            Some(interval) => {
                log_info!(
                    "user {user_id}: stopped {} after {} min",
                    interval.category.as_str(),
                    interval.duration_minutes
                );
                Ok(StopOutcome::Stopped(ClosedSpan::from(&interval)))
            }
            None => {
                log_debug!("user {user_id}: nothing to stop");
                Ok(StopOutcome::NothingToStop)
            }
        }
    }

    /// Logs a past interval given in local wall time. Never touches the open slot.
    pub async fn backfill(
        &self,
        user_id: UserId,
        category: Category,
        start_local: NaiveDateTime,
        end_local: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> TrackerResult<Interval> {
        let start = self.clock.to_absolute(start_local);
        let end = self.clock.to_absolute(end_local);
        self.backfill_between(user_id, category, start, end, now).await
    }

    /// Same as [`backfill`](Self::backfill) for boundaries already resolved to instants.
    pub async fn backfill_between(
        &self,
        user_id: UserId,
        category: Category,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TrackerResult<Interval> {
        if start > now || end > now {
            log_debug!("user {user_id}: rejected backfill in the future");
            return Err(ValidationError::FutureTime.into());
        }

        let record = NewInterval::derive(user_id, category, start, end, &self.clock)?;
        let interval = self
            .db
            .append_interval(record)
            .await
            .map_err(TrackerError::from_storage)?;

        log_info!(
            "user {user_id}: backfilled {} min of {} on {}",
            interval.duration_minutes,
            category.as_str(),
            interval.local_date
        );
        Ok(interval)
    }

    /// Most recently started interval of the user.
    pub async fn latest_interval(&self, user_id: UserId) -> TrackerResult<Interval> {
        self.db
            .latest_interval_for(user_id)
            .await
            .map_err(TrackerError::from_storage)?
            .ok_or_else(|| TrackerError::NotFound(format!("no intervals for user {user_id}")))
    }

    /// Loads an interval, treating someone else's interval as missing.
    pub async fn interval_for_user(
        &self,
        user_id: UserId,
        interval_id: i64,
    ) -> TrackerResult<Interval> {
        match self
            .db
            .get_interval(interval_id)
            .await
            .map_err(TrackerError::from_storage)?
        {
            Some(interval) if interval.user_id == user_id => Ok(interval),
            Some(_) => {
                log_warn!("user {user_id}: refused access to interval {interval_id}");
                Err(TrackerError::NotFound(format!("interval {interval_id}")))
            }
            None => Err(TrackerError::NotFound(format!("interval {interval_id}"))),
        }
    }

    /// Moves one boundary of an interval.
    ///
    /// A bare time of day is placed on the local calendar date of the boundary
    /// being replaced. The result must not be in the future and must keep the
    /// interval's start at or before its end.
    pub async fn edit_boundary(
        &self,
        user_id: UserId,
        interval_id: i64,
        which: Boundary,
        new_local: LocalInput,
        now: DateTime<Utc>,
    ) -> TrackerResult<Interval> {
        let interval = self.interval_for_user(user_id, interval_id).await?;
        let new_instant = self.clock.on_date_of(new_local, interval.boundary(which));

        if new_instant > now {
            log_debug!("user {user_id}: rejected {} edit in the future", which.as_str());
            return Err(ValidationError::FutureTime.into());
        }

        let fixed = interval.boundary(which.opposite());
        let inverted = match which {
            Boundary::Start => new_instant > fixed,
            Boundary::End => new_instant < fixed,
        };
        if inverted {
            log_debug!(
                "user {user_id}: rejected {} edit past the opposite boundary",
                which.as_str()
            );
            return Err(ValidationError::EndBeforeStart.into());
        }

        let updated = self
            .db
            .update_interval_boundary(interval_id, which, new_instant)
            .await
            .map_err(TrackerError::from_storage)?;

        log_info!(
            "user {user_id}: interval {interval_id} {} moved, now {} min",
            which.as_str(),
            updated.duration_minutes
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use tempfile::TempDir;

    use super::TrackingController;
    use crate::categories::Category;
    use crate::clock::{LocalClock, LocalInput};
    use crate::db::{Boundary, Database};
    use crate::error::{TrackerError, ValidationError};
    use crate::tracker::{StopOutcome, TrackingState};

    fn controller(dir: &TempDir) -> TrackingController {
        let db = Database::new(dir.path().join("tracker.sqlite3"), LocalClock::default())
            .expect("database should open");
        TrackingController::new(db)
    }

    /// Dubai wall time on 2026-03-10.
    fn local(hour: u32, minute: u32) -> DateTime<Utc> {
        LocalClock::default().to_absolute(
            NaiveDate::from_ymd_opt(2026, 3, 10)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
        )
    }

    fn time(hour: u32, minute: u32) -> LocalInput {
        LocalInput::TimeOfDay(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
    }

    #[tokio::test]
    async fn start_closes_previous_category() {
        let dir = TempDir::new().unwrap();
        let tracker = controller(&dir);

        let first = tracker.start(1, Category::Work, local(9, 0)).await.unwrap();
        assert!(first.closed.is_none());

        let second = tracker.start(1, Category::Chores, local(10, 30)).await.unwrap();
        let closed = second.closed.expect("work should be closed");
        assert_eq!((closed.category, closed.minutes), (Category::Work, 90));
        assert_eq!(
            tracker.state(1).await.unwrap(),
            TrackingState::Tracking {
                category: Category::Chores,
                started_at: local(10, 30)
            }
        );
    }

    #[tokio::test]
    async fn same_category_closes_and_restarts() {
        let dir = TempDir::new().unwrap();
        let tracker = controller(&dir);

        tracker.start(1, Category::Work, local(9, 0)).await.unwrap();
        let outcome = tracker.start(1, Category::Work, local(9, 40)).await.unwrap();
        assert_eq!(outcome.closed.map(|span| span.minutes), Some(40));
        assert_eq!(tracker.state(1).await.unwrap().category(), Some(Category::Work));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let tracker = controller(&dir);
        tracker.start(1, Category::Work, local(9, 0)).await.unwrap();

        let first = tracker.stop(1, local(10, 30)).await.unwrap();
        assert_eq!(first.closed().map(|span| span.minutes), Some(90));
        assert_eq!(tracker.stop(1, local(10, 31)).await.unwrap(), StopOutcome::NothingToStop);
        assert_eq!(tracker.state(1).await.unwrap(), TrackingState::Idle);

        let totals = tracker
            .database()
            .sum_durations_by_category(1, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(totals, vec![(Category::Work, 90)]);
    }

    #[tokio::test]
    async fn backfill_rejects_future_and_reversed_spans() {
        let dir = TempDir::new().unwrap();
        let tracker = controller(&dir);
        let now = local(12, 0);

        let err = tracker
            .backfill_between(1, Category::Work, local(11, 0), local(12, 30), now)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ValidationError::FutureTime)));

        let err = tracker
            .backfill_between(1, Category::Work, local(11, 0), local(10, 0), now)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ValidationError::EndBeforeStart)));

        assert!(matches!(
            tracker.latest_interval(1).await,
            Err(TrackerError::NotFound(_))
        ));

        let interval = tracker
            .backfill(
                1,
                Category::Chores,
                NaiveDate::from_ymd_opt(2026, 3, 10).unwrap().and_hms_opt(10, 0, 0).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 10).unwrap().and_hms_opt(10, 45, 0).unwrap(),
                now,
            )
            .await
            .unwrap();
        assert_eq!(interval.duration_minutes, 45);
        assert_eq!(tracker.state(1).await.unwrap(), TrackingState::Idle);
    }

    #[tokio::test]
    async fn editing_start_and_back_restores_duration() {
        let dir = TempDir::new().unwrap();
        let tracker = controller(&dir);
        let now = local(12, 0);
        let interval = tracker
            .backfill_between(1, Category::Work, local(9, 0), local(10, 30), now)
            .await
            .unwrap();

        let moved = tracker
            .edit_boundary(1, interval.id, Boundary::Start, time(8, 15), now)
            .await
            .unwrap();
        assert_eq!(moved.duration_minutes, 135);

        let restored = tracker
            .edit_boundary(1, interval.id, Boundary::Start, time(9, 0), now)
            .await
            .unwrap();
        assert_eq!(restored.duration_minutes, interval.duration_minutes);
        assert_eq!(restored.start_instant, interval.start_instant);
    }

    #[tokio::test]
    async fn edit_rejects_inversion_future_and_foreign_interval() {
        let dir = TempDir::new().unwrap();
        let tracker = controller(&dir);
        let now = local(12, 0);
        let interval = tracker
            .backfill_between(1, Category::Work, local(9, 0), local(10, 30), now)
            .await
            .unwrap();

        let err = tracker
            .edit_boundary(1, interval.id, Boundary::End, time(8, 0), now)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ValidationError::EndBeforeStart)));

        let err = tracker
            .edit_boundary(1, interval.id, Boundary::End, time(13, 0), now)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ValidationError::FutureTime)));

        let err = tracker
            .edit_boundary(2, interval.id, Boundary::End, time(11, 0), now)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));

        let unchanged = tracker.latest_interval(1).await.unwrap();
        assert_eq!(unchanged, interval);
        assert_eq!(unchanged.end_instant - unchanged.start_instant, Duration::minutes(90));
    }
}
