use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::timezone::ClientTimezone;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Human readable label used in logs and admin listings, e.g. `Event-000042-RustConf`.
    pub fn display_name(&self) -> String {
        format!("Event-{:06}-{}", self.id, self.name)
    }
}

/// An event together with the number of registrations it currently holds.
#[derive(Debug, Clone, FromRow)]
pub struct EventSummary {
    #[sqlx(flatten)]
    pub event: Event,
    pub attendee_count: i64,
}

impl EventSummary {
    pub fn is_full(&self) -> bool {
        self.attendee_count >= i64::from(self.event.max_capacity)
    }

    pub fn spots_left(&self) -> i64 {
        (i64::from(self.event.max_capacity) - self.attendee_count).max(0)
    }
}

/// Validated event fields with times already normalized to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_capacity: i32,
}

/// Event as returned to clients, with times rendered in the caller's zone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventView {
    pub id: i64,
    #[schema(example = "Event-000042-RustConf")]
    pub display_name: String,
    pub name: String,
    pub location: String,
    /// `YYYY-MM-DD HH:MM:SS` in `timezone`.
    #[schema(example = "2030-10-15 09:00:00")]
    pub start_time: String,
    /// `YYYY-MM-DD HH:MM:SS` in `timezone`.
    #[schema(example = "2030-10-17 17:00:00")]
    pub end_time: String,
    /// IANA zone the times above are expressed in.
    #[schema(example = "UTC")]
    pub timezone: String,
    pub max_capacity: i32,
    pub attendee_count: i64,
    pub spots_left: i64,
    pub is_full: bool,
}

impl EventView {
    pub fn render(summary: &EventSummary, timezone: &ClientTimezone) -> Self {
        let event = &summary.event;
        Self {
            id: event.id,
            display_name: event.display_name(),
            name: event.name.clone(),
            location: event.location.clone(),
            start_time: timezone.format(event.start_time),
            end_time: timezone.format(event.end_time),
            timezone: timezone.tz().name().to_string(),
            max_capacity: event.max_capacity,
            attendee_count: summary.attendee_count,
            spots_left: summary.spots_left(),
            is_full: summary.is_full(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(max_capacity: i32) -> Event {
        let start = Utc.with_ymd_and_hms(2030, 10, 15, 9, 0, 0).unwrap();
        Event {
            id: 42,
            name: "RustConf".to_string(),
            location: "Montreal".to_string(),
            start_time: start,
            end_time: Utc.with_ymd_and_hms(2030, 10, 17, 17, 0, 0).unwrap(),
            max_capacity,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_display_name_is_zero_padded() {
        assert_eq!(event(10).display_name(), "Event-000042-RustConf");
    }

    #[test]
    fn test_summary_full_and_spots_left() {
        let summary = EventSummary {
            event: event(2),
            attendee_count: 1,
        };
        assert!(!summary.is_full());
        assert_eq!(summary.spots_left(), 1);

        let full = EventSummary {
            event: event(2),
            attendee_count: 2,
        };
        assert!(full.is_full());
        assert_eq!(full.spots_left(), 0);
    }

    #[test]
    fn test_view_renders_in_client_zone() {
        let summary = EventSummary {
            event: event(200),
            attendee_count: 3,
        };
        let view = EventView::render(&summary, &ClientTimezone::from_header(Some("Asia/Kolkata")));
        assert_eq!(view.start_time, "2030-10-15 14:30:00");
        assert_eq!(view.end_time, "2030-10-17 22:30:00");
        assert_eq!(view.timezone, "Asia/Kolkata");
        assert_eq!(view.display_name, "Event-000042-RustConf");
        assert_eq!(view.spots_left, 197);
        assert!(!view.is_full);
    }

    #[test]
    fn test_zero_capacity_event_is_always_full() {
        let summary = EventSummary {
            event: event(0),
            attendee_count: 0,
        };
        assert!(summary.is_full());
    }
}
