//! Turns chat events into structured replies.
//!
//! The chat transport and all rendering stay outside the crate; every event
//! yields exactly one [`Reply`] that the caller serializes or renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    categories::{Category, UserId},
    db::{Boundary, Interval},
    error::TrackerError,
    log_debug, log_error,
    report::{
        format::{render_daily, render_weekly},
        ChartSeries, DayBreakdown, ReportEngine, WeeklyReport,
    },
    session::{EditSessions, SessionKind, SubmitOutcome},
    tracker::{ClosedSpan, StopOutcome, TrackingController, TrackingState},
};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "daytally::commands";

/// Shown for conflicts and storage failures; details go to the log.
pub const FAILURE_MESSAGE: &str = "Something went wrong, please try again";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub user_id: UserId,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    Track(Category),
    Stop,
    StatsDay,
    StatsWeek,
    Backfill(Option<Category>),
    Edit(Boundary),
    Cancel,
    Status,
}

impl Command {
    /// Slash commands and category labels. Anything else is free text.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Category::parse(trimmed).map(Command::Track);
        };

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };
        // Group chats append the bot name: /stop@daytally_bot
        let name = name.split('@').next().unwrap_or(name);

        let command = match name {
            "start" | "menu" => Command::Menu,
            "stop" => Command::Stop,
            "stats_day" => Command::StatsDay,
            "stats_week" => Command::StatsWeek,
            "backfill" => Command::Backfill(Category::parse(argument)),
            "edit_start" => Command::Edit(Boundary::Start),
            "edit_end" => Command::Edit(Boundary::End),
            "cancel" => Command::Cancel,
            "status" => Command::Status,
            _ => return None,
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "reply", rename_all = "camelCase")]
pub enum Reply {
    #[serde(rename_all = "camelCase")]
    Menu { rows: Vec<Vec<String>> },
    #[serde(rename_all = "camelCase")]
    Started {
        category: Category,
        closed: Option<ClosedSpan>,
    },
    #[serde(rename_all = "camelCase")]
    Stopped { closed: ClosedSpan },
    NothingToStop,
    #[serde(rename_all = "camelCase")]
    DailyReport {
        day: DayBreakdown,
        chart: ChartSeries,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    WeeklyReport { report: WeeklyReport, text: String },
    /// The dialogue moved on and asks for the next value. `fixed` is the
    /// boundary that is already settled, if any.
    #[serde(rename_all = "camelCase")]
    Prompt {
        awaiting: SessionKind,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fixed: Option<DateTime<Utc>>,
    },
    /// The last value was rejected; the same question is asked again.
    #[serde(rename_all = "camelCase")]
    RePrompt {
        awaiting: SessionKind,
        reason: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Saved { interval: Interval },
    NothingToEdit,
    #[serde(rename_all = "camelCase")]
    Cancelled { had_session: bool },
    #[serde(rename_all = "camelCase")]
    Status {
        state: TrackingState,
        session: SessionKind,
    },
    #[serde(rename_all = "camelCase")]
    UnknownCategory { rows: Vec<Vec<String>> },
    #[serde(rename_all = "camelCase")]
    Failure { message: String },
    #[serde(rename_all = "camelCase")]
    Unrecognized { text: String },
}

#[derive(Clone)]
pub struct CommandRouter {
    tracker: TrackingController,
    reports: ReportEngine,
    sessions: EditSessions,
}

impl CommandRouter {
    pub fn new(
        tracker: TrackingController,
        reports: ReportEngine,
        sessions: EditSessions,
    ) -> Self {
        Self {
            tracker,
            reports,
            sessions,
        }
    }

    pub fn sessions(&self) -> &EditSessions {
        &self.sessions
    }

    pub async fn handle(&self, event: &Event) -> Reply {
        let user_id = event.user_id;
        let result = match Command::parse(&event.text) {
            Some(command) => self.dispatch(user_id, command, event.received_at).await,
            None => self.submit(user_id, &event.text, event.received_at).await,
        };

        result.unwrap_or_else(|err| self.reply_for_error(user_id, err))
    }

    async fn dispatch(
        &self,
        user_id: UserId,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<Reply, TrackerError> {
        let reply = match command {
            Command::Menu => Reply::Menu {
                rows: Category::menu_rows(),
            },
            Command::Track(category) => {
                let outcome = self.tracker.start(user_id, category, now).await?;
                Reply::Started {
                    category,
                    closed: outcome.closed,
                }
            }
            Command::Stop => match self.tracker.stop(user_id, now).await? {
                StopOutcome::Stopped(closed) => Reply::Stopped { closed },
                StopOutcome::NothingToStop => Reply::NothingToStop,
            },
            Command::StatsDay => {
                let day = self.reports.daily_report(user_id, now).await?;
                Reply::DailyReport {
                    chart: ChartSeries::from_day(&day),
                    text: render_daily(&day),
                    day,
                }
            }
            Command::StatsWeek => {
                let today = self.tracker.clock().local_date(now);
                let report = self.reports.weekly_report(user_id, today, now).await?;
                Reply::WeeklyReport {
                    text: render_weekly(&report),
                    report,
                }
            }
            Command::Backfill(Some(category)) => {
                self.sessions.begin_backfill(user_id, category).await;
                self.prompt(user_id).await
            }
            Command::Backfill(None) => Reply::UnknownCategory {
                rows: Category::menu_rows(),
            },
            Command::Edit(which) => {
                self.sessions.begin_edit(user_id, which).await?;
                self.prompt(user_id).await
            }
            Command::Cancel => Reply::Cancelled {
                had_session: self.sessions.cancel(user_id).await,
            },
            Command::Status => Reply::Status {
                state: self.tracker.state(user_id).await?,
                session: self.sessions.kind(user_id).await,
            },
        };
        Ok(reply)
    }

    async fn submit(
        &self,
        user_id: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Reply, TrackerError> {
        let reply = match self.sessions.submit(user_id, text, now).await? {
            SubmitOutcome::NoSession => {
                log_debug!("user {user_id}: unrecognized input");
                Reply::Unrecognized {
                    text: text.to_string(),
                }
            }
            SubmitOutcome::AwaitingEnd { .. } => self.prompt(user_id).await,
            SubmitOutcome::BackfillCommitted { interval }
            | SubmitOutcome::EditCommitted { interval } => Reply::Saved { interval },
            SubmitOutcome::Retry { reason, awaiting } => Reply::RePrompt {
                awaiting,
                reason,
                text: awaiting.prompt().to_string(),
            },
        };
        Ok(reply)
    }

    /// Asks for the value the user's current dialogue is waiting on.
    async fn prompt(&self, user_id: UserId) -> Reply {
        let session = self.sessions.current(user_id).await;
        let awaiting = SessionKind::of(session.as_ref());
        Reply::Prompt {
            awaiting,
            text: awaiting.prompt().to_string(),
            fixed: session.and_then(|session| session.fixed_boundary()),
        }
    }

    fn reply_for_error(&self, user_id: UserId, err: TrackerError) -> Reply {
        match err {
            TrackerError::Validation(reason) => Reply::Failure {
                message: reason.to_string(),
            },
            TrackerError::NotFound(what) => {
                log_debug!("user {user_id}: nothing to edit ({what})");
                Reply::NothingToEdit
            }
            err @ (TrackerError::Conflict { .. } | TrackerError::Storage(_)) => {
                log_error!("user {user_id}: {err}");
                Reply::Failure {
                    message: FAILURE_MESSAGE.to_string(),
                }
            }
        }
    }
}
