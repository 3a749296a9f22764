//! Attendee repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `email` is unique across attendees; duplicates fail with
//!   `RepoError::UniqueViolation` on `attendees.email`.
//! - An identity owns at most one attendee (`attendees.identity_id` unique).

use crate::model::attendee::{Attendee, AttendeeId};
use crate::model::identity::IdentityId;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ATTENDEE_SELECT_SQL: &str = "SELECT id, identity_id, name, email FROM attendees";

/// Repository interface for attendee profiles.
pub trait AttendeeRepository {
    fn create_attendee(&self, attendee: &Attendee) -> RepoResult<()>;
    fn update_attendee(&self, attendee: &Attendee) -> RepoResult<()>;
    fn get_attendee(&self, id: AttendeeId) -> RepoResult<Option<Attendee>>;
    fn find_by_identity(&self, identity_id: IdentityId) -> RepoResult<Option<Attendee>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Attendee>>;
    /// Deletes the attendee and, by cascade, its registrations.
    fn delete_attendee(&self, id: AttendeeId) -> RepoResult<()>;
}

/// SQLite-backed attendee repository.
pub struct SqliteAttendeeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendeeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, filter: &str, value: String) -> RepoResult<Option<Attendee>> {
        self.conn
            .query_row(
                &format!("{ATTENDEE_SELECT_SQL} WHERE {filter} = ?1;"),
                [value],
                |row| Ok(parse_attendee_row(row)),
            )
            .optional()?
            .transpose()
    }
}

impl AttendeeRepository for SqliteAttendeeRepository<'_> {
    fn create_attendee(&self, attendee: &Attendee) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO attendees (id, identity_id, name, email)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                attendee.id.to_string(),
                attendee.identity_id.map(|id| id.to_string()),
                attendee.name.as_str(),
                attendee.email.as_str(),
            ],
        )?;
        Ok(())
    }

    fn update_attendee(&self, attendee: &Attendee) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE attendees
             SET identity_id = ?1, name = ?2, email = ?3
             WHERE id = ?4;",
            params![
                attendee.identity_id.map(|id| id.to_string()),
                attendee.name.as_str(),
                attendee.email.as_str(),
                attendee.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "attendee",
                id: attendee.id,
            });
        }
        Ok(())
    }

    fn get_attendee(&self, id: AttendeeId) -> RepoResult<Option<Attendee>> {
        self.find_one("id", id.to_string())
    }

    fn find_by_identity(&self, identity_id: IdentityId) -> RepoResult<Option<Attendee>> {
        self.find_one("identity_id", identity_id.to_string())
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Attendee>> {
        self.find_one("email", email.to_string())
    }

    fn delete_attendee(&self, id: AttendeeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM attendees WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "attendee",
                id,
            });
        }
        Ok(())
    }
}

fn parse_attendee_row(row: &Row<'_>) -> RepoResult<Attendee> {
    let id_text: String = row.get("id")?;
    let identity_id = match row.get::<_, Option<String>>("identity_id")? {
        Some(value) => Some(parse_uuid(&value, "attendees.identity_id")?),
        None => None,
    };

    Ok(Attendee {
        id: parse_uuid(&id_text, "attendees.id")?,
        identity_id,
        name: row.get("name")?,
        email: row.get("email")?,
    })
}
