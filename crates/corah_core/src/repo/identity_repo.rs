//! Identity repository contracts and SQLite implementation.
//!
//! Identities mirror the principals of the external identity provider so
//! attendees can reference them. Deleting an identity cascades to its
//! attendee and that attendee's registrations.

use crate::model::identity::{Identity, IdentityId};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const IDENTITY_SELECT_SQL: &str =
    "SELECT id, handle, first_name, last_name, email FROM identities";

/// Repository interface for identity records.
pub trait IdentityRepository {
    /// Inserts an identity; a taken handle fails with `UniqueViolation`.
    fn create_identity(&self, identity: &Identity) -> RepoResult<()>;
    fn update_identity(&self, identity: &Identity) -> RepoResult<()>;
    fn get_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>>;
    fn find_by_handle(&self, handle: &str) -> RepoResult<Option<Identity>>;
    fn delete_identity(&self, id: IdentityId) -> RepoResult<()>;
}

/// SQLite-backed identity repository.
pub struct SqliteIdentityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, filter: &str, value: &str) -> RepoResult<Option<Identity>> {
        self.conn
            .query_row(
                &format!("{IDENTITY_SELECT_SQL} WHERE {filter} = ?1;"),
                [value],
                |row| Ok(parse_identity_row(row)),
            )
            .optional()?
            .transpose()
    }
}

impl IdentityRepository for SqliteIdentityRepository<'_> {
    fn create_identity(&self, identity: &Identity) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO identities (id, handle, first_name, last_name, email)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                identity.id.to_string(),
                identity.handle.as_str(),
                identity.first_name.as_str(),
                identity.last_name.as_str(),
                identity.contact_address(),
            ],
        )?;
        Ok(())
    }

    fn update_identity(&self, identity: &Identity) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE identities
             SET
                handle = ?1,
                first_name = ?2,
                last_name = ?3,
                email = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                identity.handle.as_str(),
                identity.first_name.as_str(),
                identity.last_name.as_str(),
                identity.contact_address(),
                identity.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "identity",
                id: identity.id,
            });
        }
        Ok(())
    }

    fn get_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>> {
        self.find_one("id", &id.to_string())
    }

    fn find_by_handle(&self, handle: &str) -> RepoResult<Option<Identity>> {
        self.find_one("handle", handle)
    }

    fn delete_identity(&self, id: IdentityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM identities WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "identity",
                id,
            });
        }
        Ok(())
    }
}

fn parse_identity_row(row: &Row<'_>) -> RepoResult<Identity> {
    let id_text: String = row.get("id")?;
    Ok(Identity {
        id: parse_uuid(&id_text, "identities.id")?,
        handle: row.get("handle")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
    })
}
