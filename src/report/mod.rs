pub mod chart;
pub mod engine;
pub mod format;
pub mod types;

pub use chart::ChartSeries;
pub use engine::ReportEngine;
pub use types::{Bucket, BucketMinutes, DayBreakdown, WeeklyReport};
