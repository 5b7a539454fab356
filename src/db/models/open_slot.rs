use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::{Category, UserId};

/// The single in-progress interval a user may have.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenSlot {
    pub user_id: UserId,
    pub category: Category,
    pub start_instant: DateTime<Utc>,
}
