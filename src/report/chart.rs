use serde::{Deserialize, Serialize};

use super::types::DayBreakdown;

/// Legend entries under this share of the total get no percentage label.
const MIN_LABELLED_PERCENT: f64 = 1.0;

/// Data handed to the chart renderer: labels and minutes in the same order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub categories: Vec<String>,
    pub durations: Vec<i64>,
}

impl ChartSeries {
    pub fn from_day(day: &DayBreakdown) -> Self {
        let (categories, durations) = day
            .entries
            .iter()
            .map(|entry| (entry.bucket.plain_label().to_string(), entry.minutes))
            .unzip();
        Self {
            categories,
            durations,
        }
    }

    pub fn total(&self) -> i64 {
        self.durations.iter().map(|minutes| (*minutes).max(0)).sum()
    }

    /// Nothing to draw when every duration is zero.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn percent(&self, index: usize) -> Option<f64> {
        let total = self.total();
        let minutes = *self.durations.get(index)?;
        if total == 0 {
            return None;
        }
        Some(minutes.max(0) as f64 * 100.0 / total as f64)
    }

    /// Rounded percentage for the slice at `index`, or `None` when it is below 1%.
    pub fn percent_label(&self, index: usize) -> Option<String> {
        let percent = self.percent(index)?;
        if percent < MIN_LABELLED_PERCENT {
            return None;
        }
        Some(format!("{percent:.0}%"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::ChartSeries;
    use crate::categories::Category;
    use crate::report::types::{Bucket, BucketMinutes, DayBreakdown};

    fn day(entries: Vec<(Bucket, i64)>) -> DayBreakdown {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        DayBreakdown {
            date,
            weekday: chrono::Weekday::Tue,
            elapsed_minutes: 1440,
            tracked_minutes: 0,
            untracked_minutes: 0,
            entries: entries
                .into_iter()
                .map(|(bucket, minutes)| BucketMinutes { bucket, minutes })
                .collect(),
        }
    }

    #[test]
    fn labels_use_plain_names_in_report_order() {
        let series = ChartSeries::from_day(&day(vec![
            (Bucket::Category(Category::Work), 90),
            (Bucket::Untracked, 540),
        ]));
        assert_eq!(series.categories, vec!["Work", "Untracked"]);
        assert_eq!(series.durations, vec![90, 540]);
        assert_eq!(series.percent_label(0).as_deref(), Some("14%"));
        assert_eq!(series.percent_label(1).as_deref(), Some("86%"));
        assert_eq!(series.percent_label(2), None);
    }

    #[test]
    fn suppresses_slices_under_one_percent() {
        let series = ChartSeries::from_day(&day(vec![
            (Bucket::Category(Category::Chores), 5),
            (Bucket::Untracked, 1435),
        ]));
        assert_eq!(series.percent_label(0), None);
        assert_eq!(series.percent_label(1).as_deref(), Some("100%"));
    }

    #[test]
    fn empty_when_nothing_elapsed() {
        let series = ChartSeries::from_day(&day(vec![(Bucket::Untracked, 0)]));
        assert!(series.is_empty());
        assert_eq!(series.percent_label(0), None);
    }
}
