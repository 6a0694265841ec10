//! Admin inbox message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of an activity event. Only `is_read` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
