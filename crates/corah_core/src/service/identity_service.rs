//! Identity administration use case.
//!
//! # Responsibility
//! - Persist identities mirrored from the identity provider.
//! - Run attendee provisioning and contact sync in the same transaction
//!   as the identity write.
//!
//! # Invariants
//! - A created identity always ends with exactly one linked attendee.
//! - Profile conflicts during sync never fail the identity update.

use crate::model::attendee::Attendee;
use crate::model::identity::{Identity, IdentityId};
use crate::repo::attendee_repo::SqliteAttendeeRepository;
use crate::repo::identity_repo::{IdentityRepository, SqliteIdentityRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::profile_resolver::{FallbackEmailPolicy, ProfileResolver};
use crate::service::profile_sync::{on_identity_created, on_identity_updated, ContactSync};
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;

/// Identity use-case failure.
#[derive(Debug, Error)]
pub enum IdentityServiceError {
    #[error("handle must not be blank")]
    BlankHandle,
    #[error("handle already taken: {0}")]
    HandleTaken(String),
    #[error("identity not found: {0}")]
    NotFound(IdentityId),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for IdentityServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "identity",
                id,
            } => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for IdentityServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(RepoError::from(value))
    }
}

/// Identity CRUD with attendee provisioning.
pub struct IdentityService<'conn> {
    conn: &'conn mut Connection,
    fallback: FallbackEmailPolicy,
}

impl<'conn> IdentityService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self::with_fallback_policy(conn, FallbackEmailPolicy::default())
    }

    pub fn with_fallback_policy(
        conn: &'conn mut Connection,
        fallback: FallbackEmailPolicy,
    ) -> Self {
        Self { conn, fallback }
    }

    /// Inserts `identity` and provisions its attendee.
    ///
    /// Returns the linked attendee. A taken handle fails with
    /// `HandleTaken` and nothing is written.
    pub fn create_identity(
        &mut self,
        identity: &Identity,
    ) -> Result<Attendee, IdentityServiceError> {
        if identity.handle.trim().is_empty() {
            return Err(IdentityServiceError::BlankHandle);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let identities = SqliteIdentityRepository::new(&tx);
        match identities.create_identity(identity) {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("identities", "handle") => {
                return Err(IdentityServiceError::HandleTaken(identity.handle.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        let resolver = ProfileResolver::new(
            SqliteAttendeeRepository::new(&tx),
            SqliteIdentityRepository::new(&tx),
            self.fallback.clone(),
        );
        let attendee = on_identity_created(&resolver, identity)?;
        tx.commit()?;

        info!(
            "event=identity_create module=identity status=ok identity_id={} attendee_id={}",
            identity.id, attendee.id
        );
        Ok(attendee)
    }

    /// Overwrites the stored identity and syncs its contact address.
    pub fn update_identity(
        &mut self,
        identity: &Identity,
    ) -> Result<ContactSync, IdentityServiceError> {
        if identity.handle.trim().is_empty() {
            return Err(IdentityServiceError::BlankHandle);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        match SqliteIdentityRepository::new(&tx).update_identity(identity) {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("identities", "handle") => {
                return Err(IdentityServiceError::HandleTaken(identity.handle.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        let sync = on_identity_updated(&SqliteAttendeeRepository::new(&tx), identity)?;
        tx.commit()?;

        info!(
            "event=identity_update module=identity status=ok identity_id={} synced={}",
            identity.id,
            matches!(sync, ContactSync::Updated(_))
        );
        Ok(sync)
    }

    pub fn get_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>> {
        SqliteIdentityRepository::new(self.conn).get_identity(id)
    }

    pub fn find_by_handle(&self, handle: &str) -> RepoResult<Option<Identity>> {
        SqliteIdentityRepository::new(self.conn).find_by_handle(handle)
    }

    /// Deletes the identity together with its attendee and registrations.
    pub fn delete_identity(&mut self, id: IdentityId) -> Result<(), IdentityServiceError> {
        SqliteIdentityRepository::new(self.conn).delete_identity(id)?;
        info!("event=identity_delete module=identity status=ok identity_id={id}");
        Ok(())
    }
}
