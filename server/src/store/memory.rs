//! In-memory [`EventStore`] for local development and tests.
//!
//! All state sits behind a single `tokio::sync::RwLock`, so every mutation,
//! including the capacity check and insert of a registration, happens under one
//! write lock. Nothing is durable; state is lost on restart.
use super::{EventStore, Page, PageWindow, StoreError, StoreResult};
use crate::models::{Attendee, Event, EventSummary, NewAttendee, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    next_event_id: i64,
    next_attendee_id: i64,
    events: BTreeMap<i64, Event>,
    attendees: BTreeMap<i64, Attendee>,
}

impl State {
    fn attendee_count(&self, event_id: i64) -> i64 {
        self.attendees
            .values()
            .filter(|attendee| attendee.event_id == event_id)
            .count() as i64
    }

    fn summary(&self, event: &Event) -> EventSummary {
        EventSummary {
            event: event.clone(),
            attendee_count: self.attendee_count(event.id),
        }
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.events
            .values()
            .any(|event| event.name == name && Some(event.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn page_of_summaries<F>(&self, window: PageWindow, keep: F) -> Page<EventSummary>
    where
        F: Fn(&Event) -> bool,
    {
        let state = self.state.read().await;
        // Newest first, matching the Postgres ordering.
        let matching: Vec<&Event> = state.events.values().rev().filter(|event| keep(*event)).collect();
        let total = matching.len() as u64;
        let items = window_of(matching.into_iter(), window)
            .map(|event| state.summary(event))
            .collect();
        Page { items, total }
    }
}

fn window_of<I: Iterator>(iter: I, window: PageWindow) -> impl Iterator<Item = I::Item> {
    iter.skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn list_upcoming_events(
        &self,
        now: DateTime<Utc>,
        window: PageWindow,
    ) -> StoreResult<Page<EventSummary>> {
        Ok(self
            .page_of_summaries(window, |event| event.start_time >= now)
            .await)
    }

    async fn list_events(&self, window: PageWindow) -> StoreResult<Page<EventSummary>> {
        Ok(self.page_of_summaries(window, |_| true).await)
    }

    async fn get_event(&self, event_id: i64) -> StoreResult<EventSummary> {
        let state = self.state.read().await;
        state
            .events
            .get(&event_id)
            .map(|event| state.summary(event))
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<EventSummary> {
        let mut state = self.state.write().await;
        if state.name_taken(&event.name, None) {
            return Err(StoreError::Conflict(format!(
                "event named '{}' already exists",
                event.name
            )));
        }

        state.next_event_id += 1;
        let now = Utc::now();
        let created = Event {
            id: state.next_event_id,
            name: event.name,
            location: event.location,
            start_time: event.start_time,
            end_time: event.end_time,
            max_capacity: event.max_capacity,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(created.id, created.clone());
        Ok(EventSummary {
            event: created,
            attendee_count: 0,
        })
    }

    async fn update_event(&self, event_id: i64, event: NewEvent) -> StoreResult<EventSummary> {
        let mut state = self.state.write().await;
        if !state.events.contains_key(&event_id) {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }
        let registered = state.attendee_count(event_id);
        if registered > i64::from(event.max_capacity) {
            return Err(StoreError::CapacityBelowRegistrations { registered });
        }
        if state.name_taken(&event.name, Some(event_id)) {
            return Err(StoreError::Conflict(format!(
                "event named '{}' already exists",
                event.name
            )));
        }

        let stored = state
            .events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;
        stored.name = event.name;
        stored.location = event.location;
        stored.start_time = event.start_time;
        stored.end_time = event.end_time;
        stored.max_capacity = event.max_capacity;
        stored.updated_at = Utc::now();
        let updated = stored.clone();

        Ok(EventSummary {
            event: updated,
            attendee_count: registered,
        })
    }

    async fn delete_event(&self, event_id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.events.remove(&event_id).is_none() {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }
        state
            .attendees
            .retain(|_, attendee| attendee.event_id != event_id);
        Ok(())
    }

    async fn list_attendees(
        &self,
        event_id: i64,
        window: PageWindow,
    ) -> StoreResult<Page<Attendee>> {
        let state = self.state.read().await;
        if !state.events.contains_key(&event_id) {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }
        let matching: Vec<&Attendee> = state
            .attendees
            .values()
            .filter(|attendee| attendee.event_id == event_id)
            .collect();
        let total = matching.len() as u64;
        let items = window_of(matching.into_iter(), window).cloned().collect();
        Ok(Page { items, total })
    }

    async fn register_attendee(
        &self,
        event_id: i64,
        attendee: NewAttendee,
    ) -> StoreResult<Attendee> {
        let mut state = self.state.write().await;
        let max_capacity = state
            .events
            .get(&event_id)
            .map(|event| event.max_capacity)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;

        if state.attendee_count(event_id) >= i64::from(max_capacity) {
            return Err(StoreError::EventFull { event_id });
        }
        let duplicate = state
            .attendees
            .values()
            .any(|existing| existing.event_id == event_id && existing.email == attendee.email);
        if duplicate {
            return Err(StoreError::AlreadyRegistered {
                event_id,
                email: attendee.email,
            });
        }

        state.next_attendee_id += 1;
        let now = Utc::now();
        let created = Attendee {
            id: state.next_attendee_id,
            event_id,
            name: attendee.name,
            email: attendee.email,
            created_at: now,
            updated_at: now,
        };
        state.attendees.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_attendee(&self, attendee_id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .attendees
            .remove(&attendee_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("attendee {attendee_id}")))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
