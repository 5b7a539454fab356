use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::Category;
use crate::db::{Interval, OpenSlot};

/// Per-user tracking state, read from the open-slot table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TrackingState {
    #[default]
    Idle,
    #[serde(rename_all = "camelCase")]
    Tracking {
        category: Category,
        started_at: DateTime<Utc>,
    },
}

impl TrackingState {
    pub fn category(&self) -> Option<Category> {
        match self {
            TrackingState::Idle => None,
            TrackingState::Tracking { category, .. } => Some(*category),
        }
    }
}

impl From<Option<OpenSlot>> for TrackingState {
    fn from(slot: Option<OpenSlot>) -> Self {
        match slot {
            Some(slot) => TrackingState::Tracking {
                category: slot.category,
                started_at: slot.start_instant,
            },
            None => TrackingState::Idle,
        }
    }
}

/// Category and rounded minutes of an interval that was just closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClosedSpan {
    pub interval_id: i64,
    pub category: Category,
    pub minutes: i64,
}

impl From<&Interval> for ClosedSpan {
    fn from(interval: &Interval) -> Self {
        Self {
            interval_id: interval.id,
            category: interval.category,
            minutes: interval.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub closed: Option<ClosedSpan>,
    pub state: TrackingState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StopOutcome {
    NothingToStop,
    Stopped(ClosedSpan),
}

impl StopOutcome {
    pub fn closed(&self) -> Option<ClosedSpan> {
        match self {
            StopOutcome::NothingToStop => None,
            StopOutcome::Stopped(span) => Some(*span),
        }
    }
}
