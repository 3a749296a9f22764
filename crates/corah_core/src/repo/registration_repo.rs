//! Registration repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Inserting a second registration for the same `(attendee, event)` pair
//!   fails with `RepoError::UniqueViolation`; callers translate it.
//! - Registrations are never updated; they disappear only by cascade.

use crate::model::attendee::AttendeeId;
use crate::model::event::EventId;
use crate::model::registration::Registration;
use crate::repo::{parse_count, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const REGISTRATION_SELECT_SQL: &str =
    "SELECT id, attendee_id, event_id, registered_at FROM registrations";

/// Repository interface for registration records.
pub trait RegistrationRepository {
    fn create_registration(&self, registration: &Registration) -> RepoResult<()>;
    fn find_registration(
        &self,
        attendee_id: AttendeeId,
        event_id: EventId,
    ) -> RepoResult<Option<Registration>>;
    /// Registrations for one event, oldest first.
    fn list_for_event(&self, event_id: EventId) -> RepoResult<Vec<Registration>>;
    fn list_for_attendee(&self, attendee_id: AttendeeId) -> RepoResult<Vec<Registration>>;
    fn count_for_event(&self, event_id: EventId) -> RepoResult<u32>;
}

/// SQLite-backed registration repository.
pub struct SqliteRegistrationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistrationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn list_where(&self, filter: &str, value: String) -> RepoResult<Vec<Registration>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REGISTRATION_SELECT_SQL} WHERE {filter} = ?1 ORDER BY registered_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([value])?;
        let mut registrations = Vec::new();
        while let Some(row) = rows.next()? {
            registrations.push(parse_registration_row(row)?);
        }
        Ok(registrations)
    }
}

impl RegistrationRepository for SqliteRegistrationRepository<'_> {
    fn create_registration(&self, registration: &Registration) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO registrations (id, attendee_id, event_id, registered_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                registration.id.to_string(),
                registration.attendee_id.to_string(),
                registration.event_id.to_string(),
                registration.registered_at,
            ],
        )?;
        Ok(())
    }

    fn find_registration(
        &self,
        attendee_id: AttendeeId,
        event_id: EventId,
    ) -> RepoResult<Option<Registration>> {
        self.conn
            .query_row(
                &format!("{REGISTRATION_SELECT_SQL} WHERE attendee_id = ?1 AND event_id = ?2;"),
                params![attendee_id.to_string(), event_id.to_string()],
                |row| Ok(parse_registration_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_for_event(&self, event_id: EventId) -> RepoResult<Vec<Registration>> {
        self.list_where("event_id", event_id.to_string())
    }

    fn list_for_attendee(&self, attendee_id: AttendeeId) -> RepoResult<Vec<Registration>> {
        self.list_where("attendee_id", attendee_id.to_string())
    }

    fn count_for_event(&self, event_id: EventId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM registrations WHERE event_id = ?1;",
            [event_id.to_string()],
            |row| row.get(0),
        )?;
        parse_count(count, "registrations.count")
    }
}

fn parse_registration_row(row: &Row<'_>) -> RepoResult<Registration> {
    let id_text: String = row.get("id")?;
    let attendee_text: String = row.get("attendee_id")?;
    let event_text: String = row.get("event_id")?;

    Ok(Registration {
        id: parse_uuid(&id_text, "registrations.id")?,
        attendee_id: parse_uuid(&attendee_text, "registrations.attendee_id")?,
        event_id: parse_uuid(&event_text, "registrations.event_id")?,
        registered_at: row.get("registered_at")?,
    })
}
