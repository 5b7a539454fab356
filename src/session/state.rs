use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::Category;
use crate::db::Boundary;

/// Pending two-step dialogue for one user. Absence of a session is the
/// `NoSession` state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EditSession {
    #[serde(rename_all = "camelCase")]
    AwaitingBackfillStart { category: Category },
    #[serde(rename_all = "camelCase")]
    AwaitingBackfillEnd {
        category: Category,
        start: DateTime<Utc>,
    },
    /// `fixed_end`/`fixed_start` snapshot the untouched boundary for the
    /// prompt. Validation on commit uses the interval as currently stored.
    #[serde(rename_all = "camelCase")]
    AwaitingEditStart {
        interval_id: i64,
        fixed_end: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AwaitingEditEnd {
        interval_id: i64,
        fixed_start: DateTime<Utc>,
    },
}

impl EditSession {
    pub fn edit(interval_id: i64, which: Boundary, fixed: DateTime<Utc>) -> Self {
        match which {
            Boundary::Start => EditSession::AwaitingEditStart {
                interval_id,
                fixed_end: fixed,
            },
            Boundary::End => EditSession::AwaitingEditEnd {
                interval_id,
                fixed_start: fixed,
            },
        }
    }

    /// The boundary that stays put while the user types the other one.
    pub fn fixed_boundary(&self) -> Option<DateTime<Utc>> {
        match self {
            EditSession::AwaitingBackfillStart { .. } => None,
            EditSession::AwaitingBackfillEnd { start, .. } => Some(*start),
            EditSession::AwaitingEditStart { fixed_end, .. } => Some(*fixed_end),
            EditSession::AwaitingEditEnd { fixed_start, .. } => Some(*fixed_start),
        }
    }

    pub fn kind(&self) -> SessionKind {
        match self {
            EditSession::AwaitingBackfillStart { .. } => SessionKind::AwaitingBackfillStart,
            EditSession::AwaitingBackfillEnd { .. } => SessionKind::AwaitingBackfillEnd,
            EditSession::AwaitingEditStart { .. } => SessionKind::AwaitingEditStart,
            EditSession::AwaitingEditEnd { .. } => SessionKind::AwaitingEditEnd,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    NoSession,
    AwaitingBackfillStart,
    AwaitingBackfillEnd,
    AwaitingEditStart,
    AwaitingEditEnd,
}

impl SessionKind {
    pub fn of(session: Option<&EditSession>) -> Self {
        session.map_or(SessionKind::NoSession, EditSession::kind)
    }

    /// What the user is asked to type next.
    pub fn prompt(&self) -> &'static str {
        match self {
            SessionKind::NoSession => "",
            SessionKind::AwaitingBackfillStart => "Enter the start of the interval (HH:MM)",
            SessionKind::AwaitingBackfillEnd => "Enter the end of the interval (HH:MM)",
            SessionKind::AwaitingEditStart => "Enter the new start time (HH:MM)",
            SessionKind::AwaitingEditEnd => "Enter the new end time (HH:MM)",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{EditSession, SessionKind};
    use crate::categories::Category;
    use crate::db::Boundary;

    #[test]
    fn fixed_boundary_is_the_side_not_being_entered() {
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 5, 0, 0).unwrap();

        let start = EditSession::edit(7, Boundary::Start, at);
        assert_eq!(start.kind(), SessionKind::AwaitingEditStart);
        assert_eq!(start.fixed_boundary(), Some(at));

        let end = EditSession::edit(7, Boundary::End, at);
        assert_eq!(end.kind(), SessionKind::AwaitingEditEnd);
        assert_eq!(end.fixed_boundary(), Some(at));

        let backfill = EditSession::AwaitingBackfillStart {
            category: Category::Work,
        };
        assert_eq!(backfill.fixed_boundary(), None);
        let backfill = EditSession::AwaitingBackfillEnd {
            category: Category::Work,
            start: at,
        };
        assert_eq!(backfill.fixed_boundary(), Some(at));
    }
}
