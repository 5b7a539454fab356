use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Front-end user identifier.
pub type UserId = i64;

pub const UNTRACKED_LABEL: &str = "🕰 Untracked";
pub const UNTRACKED_PLAIN_LABEL: &str = "Untracked";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sleep,
    SelfCare,
    Work,
    SportHealth,
    FamilyFriends,
    Logistics,
    Chores,
    Entertainment,
    PersonalGrowth,
    Procrastination,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Sleep,
        Category::SelfCare,
        Category::Work,
        Category::SportHealth,
        Category::FamilyFriends,
        Category::Logistics,
        Category::Chores,
        Category::Entertainment,
        Category::PersonalGrowth,
        Category::Procrastination,
    ];

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sleep => "sleep",
            Category::SelfCare => "self_care",
            Category::Work => "work",
            Category::SportHealth => "sport_health",
            Category::FamilyFriends => "family_friends",
            Category::Logistics => "logistics",
            Category::Chores => "chores",
            Category::Entertainment => "entertainment",
            Category::PersonalGrowth => "personal_growth",
            Category::Procrastination => "procrastination",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Sleep => "😴",
            Category::SelfCare => "🛁",
            Category::Work => "💼",
            Category::SportHealth => "🏋️",
            Category::FamilyFriends => "👨‍👩‍👧‍👦",
            Category::Logistics => "🚗",
            Category::Chores => "🏡",
            Category::Entertainment => "🎮",
            Category::PersonalGrowth => "📚",
            Category::Procrastination => "🐌",
        }
    }

    /// Label without the emoji, used in chart legends.
    pub fn plain_label(&self) -> &'static str {
        match self {
            Category::Sleep => "Sleep",
            Category::SelfCare => "Self-care",
            Category::Work => "Work",
            Category::SportHealth => "Sport & Health",
            Category::FamilyFriends => "Family & Friends",
            Category::Logistics => "Logistics",
            Category::Chores => "Chores",
            Category::Entertainment => "Entertainment",
            Category::PersonalGrowth => "Personal growth",
            Category::Procrastination => "Procrastination",
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.emoji(), self.plain_label())
    }

    /// Intervals of an overnight category routinely cross local midnight and
    /// get split between the two days in reports.
    pub fn is_overnight(&self) -> bool {
        matches!(self, Category::Sleep)
    }

    pub fn from_key(value: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| anyhow!("unknown category key '{value}'"))
    }

    /// Accepts a menu label, a plain label (any case) or a storage key.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        Category::ALL.into_iter().find(|category| {
            trimmed == category.label()
                || trimmed.eq_ignore_ascii_case(category.plain_label())
                || trimmed.eq_ignore_ascii_case(category.as_str())
                || strip_leading_symbols(trimmed).eq_ignore_ascii_case(category.plain_label())
        })
    }

    /// Category labels laid out two per row, in menu order.
    pub fn menu_rows() -> Vec<Vec<String>> {
        Category::ALL
            .chunks(2)
            .map(|row| row.iter().map(Category::label).collect())
            .collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// Emoji sequences carry joiners and variation selectors, so skip anything
// that is not a letter before comparing.
fn strip_leading_symbols(input: &str) -> &str {
    input.trim_start_matches(|c: char| !c.is_alphanumeric()).trim()
}
