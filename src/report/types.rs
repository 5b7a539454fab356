use std::collections::BTreeMap;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::categories::{Category, UNTRACKED_LABEL, UNTRACKED_PLAIN_LABEL};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Category(Category),
    Untracked,
}

impl Bucket {
    pub fn label(&self) -> String {
        match self {
            Bucket::Category(category) => category.label(),
            Bucket::Untracked => UNTRACKED_LABEL.to_string(),
        }
    }

    pub fn plain_label(&self) -> &'static str {
        match self {
            Bucket::Category(category) => category.plain_label(),
            Bucket::Untracked => UNTRACKED_PLAIN_LABEL,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BucketMinutes {
    pub bucket: Bucket,
    pub minutes: i64,
}

/// One local day: tracked categories in first-appearance order, then the
/// untracked remainder as the final entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayBreakdown {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub elapsed_minutes: i64,
    pub tracked_minutes: i64,
    pub untracked_minutes: i64,
    pub entries: Vec<BucketMinutes>,
}

impl DayBreakdown {
    pub fn minutes_for(&self, category: Category) -> i64 {
        self.entries
            .iter()
            .find(|entry| entry.bucket == Bucket::Category(category))
            .map(|entry| entry.minutes)
            .unwrap_or(0)
    }

    /// `(category, minutes)` pairs, untracked included, in report order.
    pub fn pairs(&self) -> Vec<(Bucket, i64)> {
        self.entries
            .iter()
            .map(|entry| (entry.bucket, entry.minutes))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub reference_date: NaiveDate,
    pub days: BTreeMap<NaiveDate, DayBreakdown>,
}
