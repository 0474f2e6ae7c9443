//! Persistence for events and their registrations.
//!
//! Handlers only talk to [`EventStore`]; the Postgres backend is used in
//! deployments and the in-memory backend for local runs and tests. Both
//! backends enforce the same invariants: event names are unique, an email
//! registers at most once per event, and an event never holds more
//! registrations than its `max_capacity`.
use crate::models::{Attendee, EventSummary, NewAttendee, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod postgres;

/// Slice of a result set to return, expressed as row offset and row limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of rows matching the query, ignoring the window.
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("event {event_id} is full")]
    EventFull { event_id: i64 },

    #[error("{email} is already registered for event {event_id}")]
    AlreadyRegistered { event_id: i64, email: String },

    #[error("capacity cannot drop below {registered} existing registrations")]
    CapacityBelowRegistrations { registered: i64 },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events starting at or after `now`, newest first.
    async fn list_upcoming_events(
        &self,
        now: DateTime<Utc>,
        window: PageWindow,
    ) -> StoreResult<Page<EventSummary>>;
    /// Every event regardless of start time, newest first.
    async fn list_events(&self, window: PageWindow) -> StoreResult<Page<EventSummary>>;
    async fn get_event(&self, event_id: i64) -> StoreResult<EventSummary>;
    async fn create_event(&self, event: NewEvent) -> StoreResult<EventSummary>;
    async fn update_event(&self, event_id: i64, event: NewEvent) -> StoreResult<EventSummary>;
    async fn delete_event(&self, event_id: i64) -> StoreResult<()>;

    async fn list_attendees(&self, event_id: i64, window: PageWindow)
        -> StoreResult<Page<Attendee>>;
    /// Registers an attendee, checking existence, capacity and uniqueness atomically.
    async fn register_attendee(
        &self,
        event_id: i64,
        attendee: NewAttendee,
    ) -> StoreResult<Attendee>;
    async fn delete_attendee(&self, attendee_id: i64) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
