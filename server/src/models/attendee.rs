use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attendee {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendee {
    pub fn display_name(&self, event_name: &str) -> String {
        format!("Attendee-{:06}-{}-{}", self.id, self.name, event_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendee {
    pub name: String,
    pub email: String,
}

impl NewAttendee {
    /// Emails are compared case-insensitively, so they are stored trimmed and lowercased.
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
        }
    }
}
