use chrono::Weekday;

use super::types::{DayBreakdown, WeeklyReport};

pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{} h {} min", minutes / 60, minutes % 60)
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn day_lines(day: &DayBreakdown) -> String {
    day.entries
        .iter()
        .map(|entry| format!("📌 {}: {}", entry.bucket.label(), format_minutes(entry.minutes)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_daily(day: &DayBreakdown) -> String {
    format!("📊 Today ({}):\n{}", day.date.format("%Y-%m-%d"), day_lines(day))
}

pub fn render_weekly(report: &WeeklyReport) -> String {
    let mut text = String::from("📊 Last 7 days:\n");
    for day in report.days.values() {
        text.push_str(&format!(
            "\n📅 {} {}:\n{}\n",
            weekday_name(day.weekday),
            day.date.format("%d.%m"),
            day_lines(day)
        ));
    }
    text
}
