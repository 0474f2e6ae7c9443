//! Postgres-backed [`EventStore`].
//!
//! Schema lives in `server/migrations` and is applied on connect. Capacity is
//! enforced inside a transaction that locks the event row (`FOR UPDATE`), so
//! concurrent registrations for the same event are serialized by Postgres and
//! the attendee count can never pass `max_capacity`. The `(event_id, email)`
//! unique constraint backs duplicate detection.
use super::{EventStore, Page, PageWindow, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::models::{Attendee, Event, EventSummary, NewAttendee, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;

const SUMMARY_COLUMNS: &str = "e.id, e.name, e.location, e.start_time, e.end_time, \
     e.max_capacity, e.created_at, e.updated_at, \
     (SELECT COUNT(*) FROM attendees a WHERE a.event_id = e.id) AS attendee_count";

const EVENT_COLUMNS: &str =
    "id, name, location, start_time, end_time, max_capacity, created_at, updated_at";

const ATTENDEE_COLUMNS: &str = "id, event_id, name, email, created_at, updated_at";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects, then applies pending migrations before returning.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        // The URL may carry credentials, so it is never logged.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;

        tracing::info!("Successfully connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Migrations run successfully");

        Ok(Self { pool })
    }

    async fn page_of_summaries(
        &self,
        since: Option<DateTime<Utc>>,
        window: PageWindow,
    ) -> StoreResult<Page<EventSummary>> {
        let (total, items) = match since {
            Some(now) => {
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE start_time >= $1")
                        .bind(now)
                        .fetch_one(&self.pool)
                        .await?;
                let items = sqlx::query_as::<_, EventSummary>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM events e WHERE e.start_time >= $1 \
                     ORDER BY e.id DESC LIMIT $2 OFFSET $3"
                ))
                .bind(now)
                .bind(to_i64(window.limit))
                .bind(to_i64(window.offset))
                .fetch_all(&self.pool)
                .await?;
                (total, items)
            }
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
                    .fetch_one(&self.pool)
                    .await?;
                let items = sqlx::query_as::<_, EventSummary>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM events e ORDER BY e.id DESC LIMIT $1 OFFSET $2"
                ))
                .bind(to_i64(window.limit))
                .bind(to_i64(window.offset))
                .fetch_all(&self.pool)
                .await?;
                (total, items)
            }
        };

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn list_upcoming_events(
        &self,
        now: DateTime<Utc>,
        window: PageWindow,
    ) -> StoreResult<Page<EventSummary>> {
        self.page_of_summaries(Some(now), window).await
    }

    async fn list_events(&self, window: PageWindow) -> StoreResult<Page<EventSummary>> {
        self.page_of_summaries(None, window).await
    }

    async fn get_event(&self, event_id: i64) -> StoreResult<EventSummary> {
        sqlx::query_as::<_, EventSummary>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM events e WHERE e.id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<EventSummary> {
        let inserted = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (name, location, start_time, end_time, max_capacity) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&event.name)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.max_capacity)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(event) => Ok(EventSummary {
                event,
                attendee_count: 0,
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
                "event named '{}' already exists",
                event.name
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_event(&self, event_id: i64, event: NewEvent) -> StoreResult<EventSummary> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }

        let registered: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attendees WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
        if registered > i64::from(event.max_capacity) {
            return Err(StoreError::CapacityBelowRegistrations { registered });
        }

        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET name = $2, location = $3, start_time = $4, end_time = $5, \
             max_capacity = $6, updated_at = NOW() WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event_id)
        .bind(&event.name)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.max_capacity)
        .fetch_one(&mut *tx)
        .await;

        let updated = match updated {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict(format!(
                    "event named '{}' already exists",
                    event.name
                )))
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await?;
        Ok(EventSummary {
            event: updated,
            attendee_count: registered,
        })
    }

    async fn delete_event(&self, event_id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }
        Ok(())
    }

    async fn list_attendees(
        &self,
        event_id: i64,
        window: PageWindow,
    ) -> StoreResult<Page<Attendee>> {
        let event_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        if !event_exists {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendees WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        let items = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1 \
             ORDER BY id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(event_id)
        .bind(to_i64(window.limit))
        .bind(to_i64(window.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn register_attendee(
        &self,
        event_id: i64,
        attendee: NewAttendee,
    ) -> StoreResult<Attendee> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent registrations for this event until commit.
        let event: Option<(String, i32)> =
            sqlx::query_as("SELECT name, max_capacity FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((event_name, max_capacity)) = event else {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        };

        let registered: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attendees WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
        if registered >= i64::from(max_capacity) {
            return Err(StoreError::EventFull { event_id });
        }

        let inserted = sqlx::query_as::<_, Attendee>(&format!(
            "INSERT INTO attendees (event_id, name, email) VALUES ($1, $2, $3) \
             RETURNING {ATTENDEE_COLUMNS}"
        ))
        .bind(event_id)
        .bind(&attendee.name)
        .bind(&attendee.email)
        .fetch_one(&mut *tx)
        .await;

        let created = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::AlreadyRegistered {
                    event_id,
                    email: attendee.email,
                })
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await?;
        tracing::debug!(
            attendee = %created.display_name(&event_name),
            registered = registered + 1,
            max_capacity,
            "Registration stored"
        );
        Ok(created)
    }

    async fn delete_attendee(&self, attendee_id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM attendees WHERE id = $1")
            .bind(attendee_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("attendee {attendee_id}")));
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_i64_saturates() {
        assert_eq!(to_i64(20), 20);
        assert_eq!(to_i64(u64::MAX), i64::MAX);
    }

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
