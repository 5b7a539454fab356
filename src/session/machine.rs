use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    categories::{Category, UserId},
    clock::{parse_local_input, LocalInput},
    db::{Boundary, Interval},
    error::{TrackerError, TrackerResult, ValidationError},
    log_debug, log_info,
    tracker::TrackingController,
};

use super::{EditSession, SessionKind};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "daytally::session";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmitOutcome {
    /// No dialogue is in progress for the user.
    NoSession,
    /// Backfill start accepted; the end is asked next.
    #[serde(rename_all = "camelCase")]
    AwaitingEnd { start: DateTime<Utc> },
    BackfillCommitted { interval: Interval },
    EditCommitted { interval: Interval },
    /// Input rejected; the session stays where it was.
    #[serde(rename_all = "camelCase")]
    Retry {
        reason: String,
        awaiting: SessionKind,
    },
}

/// In-memory table of edit dialogues, one per user.
#[derive(Clone)]
pub struct EditSessions {
    sessions: Arc<Mutex<HashMap<UserId, EditSession>>>,
    tracker: TrackingController,
}

impl EditSessions {
    pub fn new(tracker: TrackingController) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            tracker,
        }
    }

    pub async fn current(&self, user_id: UserId) -> Option<EditSession> {
        self.sessions.lock().await.get(&user_id).copied()
    }

    pub async fn kind(&self, user_id: UserId) -> SessionKind {
        SessionKind::of(self.sessions.lock().await.get(&user_id))
    }

    /// Starts a backfill dialogue, discarding any session in flight.
    pub async fn begin_backfill(&self, user_id: UserId, category: Category) -> SessionKind {
        self.replace(user_id, EditSession::AwaitingBackfillStart { category })
            .await
    }

    /// Starts editing one boundary of the user's latest interval.
    pub async fn begin_edit(&self, user_id: UserId, which: Boundary) -> TrackerResult<Interval> {
        let interval = self.tracker.latest_interval(user_id).await?;
        self.begin_edit_of(user_id, &interval, which).await;
        Ok(interval)
    }

    /// Starts editing one boundary of a specific interval owned by the user.
    pub async fn begin_edit_interval(
        &self,
        user_id: UserId,
        interval_id: i64,
        which: Boundary,
    ) -> TrackerResult<Interval> {
        let interval = self.tracker.interval_for_user(user_id, interval_id).await?;
        self.begin_edit_of(user_id, &interval, which).await;
        Ok(interval)
    }

    pub async fn cancel(&self, user_id: UserId) -> bool {
        let removed = self.sessions.lock().await.remove(&user_id);
        if let Some(session) = &removed {
            log_debug!("user {user_id}: cancelled {:?}", session.kind());
        }
        removed.is_some()
    }

    /// Feeds one line of user text into the active dialogue.
    ///
    /// Validation failures keep the session in its current state. A storage
    /// failure restores the session as it was before the call and is returned
    /// as an error.
    pub async fn submit(
        &self,
        user_id: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> TrackerResult<SubmitOutcome> {
        let Some(session) = self.sessions.lock().await.remove(&user_id) else {
            return Ok(SubmitOutcome::NoSession);
        };

        match self.advance(user_id, session, text, now).await {
            Ok(Step::BackfillStarted { category, start }) => {
                self.restore(user_id, EditSession::AwaitingBackfillEnd { category, start })
                    .await;
                Ok(SubmitOutcome::AwaitingEnd { start })
            }
            Ok(Step::Done(outcome)) => Ok(outcome),
            Err(TrackerError::Validation(reason)) => {
                log_debug!("user {user_id}: {:?} input rejected: {reason}", session.kind());
                self.restore(user_id, session).await;
                Ok(SubmitOutcome::Retry {
                    reason: reason.to_string(),
                    awaiting: session.kind(),
                })
            }
            // The interval vanished underneath the dialogue, which ends here.
            Err(err @ TrackerError::NotFound(_)) => Err(err),
            Err(err) => {
                self.restore(user_id, session).await;
                Err(err)
            }
        }
    }

    async fn advance(
        &self,
        user_id: UserId,
        session: EditSession,
        text: &str,
        now: DateTime<Utc>,
    ) -> TrackerResult<Step> {
        let input = parse_local_input(text)?;
        let clock = self.tracker.clock();

        match session {
            EditSession::AwaitingBackfillStart { category } => {
                let start = match input {
                    LocalInput::TimeOfDay(time) => clock.most_recent(time, now),
                    LocalInput::DateTime(local) => clock.to_absolute(local),
                };
                if start > now {
                    return Err(ValidationError::FutureTime.into());
                }
                Ok(Step::BackfillStarted { category, start })
            }
            EditSession::AwaitingBackfillEnd { category, start } => {
                let end = match input {
                    LocalInput::TimeOfDay(time) => clock.next_on_or_after(time, start),
                    LocalInput::DateTime(local) => clock.to_absolute(local),
                };
                let interval = self
                    .tracker
                    .backfill_between(user_id, category, start, end, now)
                    .await?;
                log_info!("user {user_id}: backfill dialogue committed interval {}", interval.id);
                Ok(Step::Done(SubmitOutcome::BackfillCommitted { interval }))
            }
            EditSession::AwaitingEditStart { interval_id, .. } => {
                let interval = self
                    .tracker
                    .edit_boundary(user_id, interval_id, Boundary::Start, input, now)
                    .await?;
                Ok(Step::Done(SubmitOutcome::EditCommitted { interval }))
            }
            EditSession::AwaitingEditEnd { interval_id, .. } => {
                let interval = self
                    .tracker
                    .edit_boundary(user_id, interval_id, Boundary::End, input, now)
                    .await?;
                Ok(Step::Done(SubmitOutcome::EditCommitted { interval }))
            }
        }
    }

    async fn begin_edit_of(&self, user_id: UserId, interval: &Interval, which: Boundary) {
        let fixed = interval.boundary(which.opposite());
        self.replace(user_id, EditSession::edit(interval.id, which, fixed))
            .await;
    }

    async fn replace(&self, user_id: UserId, session: EditSession) -> SessionKind {
        let kind = session.kind();
        if let Some(previous) = self.sessions.lock().await.insert(user_id, session) {
            log_debug!("user {user_id}: discarded {:?}", previous.kind());
        }
        kind
    }

    /// Puts a session back unless a new one was started meanwhile.
    async fn restore(&self, user_id: UserId, session: EditSession) {
        self.sessions
            .lock()
            .await
            .entry(user_id)
            .or_insert(session);
    }
}

enum Step {
    BackfillStarted {
        category: Category,
        start: DateTime<Utc>,
    },
    Done(SubmitOutcome),
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, Utc};
    use tempfile::TempDir;

    use super::{EditSessions, SubmitOutcome};
    use crate::categories::Category;
    use crate::clock::LocalClock;
    use crate::db::{Boundary, Database};
    use crate::error::TrackerError;
    use crate::session::{EditSession, SessionKind};
    use crate::tracker::TrackingController;

    fn sessions(dir: &TempDir) -> EditSessions {
        let db = Database::new(dir.path().join("sessions.sqlite3"), LocalClock::default())
            .expect("database should open");
        EditSessions::new(TrackingController::new(db))
    }

    /// Dubai wall time.
    fn local(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        LocalClock::default().to_absolute(
            NaiveDate::from_ymd_opt(2026, 3, day)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn backfill_dialogue_spans_midnight() {
        let dir = TempDir::new().unwrap();
        let machine = sessions(&dir);
        let now = local(10, 8, 0);

        machine.begin_backfill(1, Category::Sleep).await;
        let outcome = machine.submit(1, "23:00", now).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::AwaitingEnd { start: local(9, 23, 0) });
        assert_eq!(machine.kind(1).await, SessionKind::AwaitingBackfillEnd);

        let SubmitOutcome::BackfillCommitted { interval } =
            machine.submit(1, "07:00", now).await.unwrap()
        else {
            panic!("backfill should commit");
        };
        assert_eq!(interval.duration_minutes, 480);
        assert_eq!(interval.local_date, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(machine.kind(1).await, SessionKind::NoSession);
    }

    #[tokio::test]
    async fn malformed_and_invalid_input_keeps_state() {
        let dir = TempDir::new().unwrap();
        let machine = sessions(&dir);
        let now = local(10, 8, 0);

        machine.begin_backfill(1, Category::Work).await;
        let outcome = machine.submit(1, "half past nine", now).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Retry {
                awaiting: SessionKind::AwaitingBackfillStart,
                ..
            }
        ));

        machine.submit(1, "06:00", now).await.unwrap();
        let outcome = machine.submit(1, "2026-03-10 09:00", now).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Retry {
                awaiting: SessionKind::AwaitingBackfillEnd,
                ..
            }
        ));
        assert_eq!(machine.kind(1).await, SessionKind::AwaitingBackfillEnd);

        let outcome = machine.submit(1, "07:30", now).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::BackfillCommitted { .. }));
    }

    #[tokio::test]
    async fn new_session_replaces_old_and_cancel_clears() {
        let dir = TempDir::new().unwrap();
        let machine = sessions(&dir);
        let now = local(10, 12, 0);
        machine
            .tracker
            .backfill_between(1, Category::Work, local(10, 9, 0), local(10, 10, 30), now)
            .await
            .unwrap();

        machine.begin_backfill(1, Category::Chores).await;
        let interval = machine.begin_edit(1, Boundary::End).await.unwrap();
        assert_eq!(
            machine.current(1).await,
            Some(EditSession::AwaitingEditEnd {
                interval_id: interval.id,
                fixed_start: interval.start_instant,
            })
        );

        assert!(machine.cancel(1).await);
        assert!(!machine.cancel(1).await);
        assert_eq!(machine.submit(1, "11:00", now).await.unwrap(), SubmitOutcome::NoSession);
    }

    #[tokio::test]
    async fn edit_dialogue_commits_new_boundary() {
        let dir = TempDir::new().unwrap();
        let machine = sessions(&dir);
        let now = local(10, 12, 0);
        let original = machine
            .tracker
            .backfill_between(1, Category::Work, local(10, 9, 0), local(10, 10, 30), now)
            .await
            .unwrap();

        machine.begin_edit(1, Boundary::Start).await.unwrap();
        let outcome = machine.submit(1, "10:45", now).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Retry { .. }));

        let SubmitOutcome::EditCommitted { interval } =
            machine.submit(1, "08:30", now).await.unwrap()
        else {
            panic!("edit should commit");
        };
        assert_eq!(interval.id, original.id);
        assert_eq!(interval.duration_minutes, 120);
        assert_eq!(machine.kind(1).await, SessionKind::NoSession);
    }

    #[tokio::test]
    async fn storage_failure_restores_the_dialogue() {
        let dir = TempDir::new().unwrap();
        let machine = sessions(&dir);
        let now = local(10, 12, 0);

        machine.begin_backfill(1, Category::Work).await;
        machine.submit(1, "09:00", now).await.unwrap();
        let before = machine.current(1).await;

        machine
            .tracker
            .database()
            .execute(|conn| {
                conn.execute_batch("DROP TABLE closed_intervals")?;
                Ok(())
            })
            .await
            .unwrap();

        let err = machine.submit(1, "10:00", now).await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert_eq!(machine.current(1).await, before);
        assert_eq!(
            before,
            Some(EditSession::AwaitingBackfillEnd {
                category: Category::Work,
                start: local(10, 9, 0),
            })
        );
    }

    #[tokio::test]
    async fn edit_without_intervals_is_not_found() {
        let dir = TempDir::new().unwrap();
        let machine = sessions(&dir);
        let err = machine.begin_edit(1, Boundary::Start).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
        assert_eq!(machine.kind(1).await, SessionKind::NoSession);

        let err = machine
            .begin_edit_interval(1, 42, Boundary::End)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }
}
