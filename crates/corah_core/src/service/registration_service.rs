//! Capacity-gated registration use case.
//!
//! # Responsibility
//! - Register an identity for an event as one atomic unit of work.
//! - Translate storage outcomes into business rejections.
//!
//! # Invariants
//! - The event is locked before its seat count is read.
//! - A rejected or failed attempt leaves `seats_taken` and the
//!   registrations table untouched.
//! - Every committed registration holds exactly one seat; deleting the
//!   registration (directly or by cascade) releases it.

use crate::markup::strip_markup;
use crate::model::attendee::AttendeeId;
use crate::model::event::{EventId, EventValidationError};
use crate::model::identity::{Identity, IdentityId};
use crate::model::registration::{Registration, RegistrationId};
use crate::repo::attendee_repo::SqliteAttendeeRepository;
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::identity_repo::SqliteIdentityRepository;
use crate::repo::registration_repo::{RegistrationRepository, SqliteRegistrationRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::profile_resolver::{FallbackEmailPolicy, ProfileResolver};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Instant;
use thiserror::Error;

/// Outcome of a successful registration, with display-safe names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    pub registration_id: RegistrationId,
    pub attendee_id: AttendeeId,
    /// Attendee name with all markup stripped.
    pub attendee_name: String,
    /// Event title with all markup stripped.
    pub event_title: String,
}

/// Registration failure.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("event is full, no seats available: {event_id}")]
    SoldOut { event_id: EventId },
    #[error("attendee {attendee_id} is already registered for event {event_id}")]
    DuplicateRegistration {
        event_id: EventId,
        attendee_id: AttendeeId,
    },
    #[error("event not found: {0}")]
    EventNotFound(EventId),
    #[error("identity is not persisted: {0}")]
    UnknownIdentity(IdentityId),
    #[error(transparent)]
    Validation(#[from] EventValidationError),
    #[error(transparent)]
    Repo(RepoError),
}

impl RegistrationError {
    /// Stable reason code used in logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SoldOut { .. } => "sold_out",
            Self::DuplicateRegistration { .. } => "duplicate_registration",
            Self::EventNotFound(_) => "event_not_found",
            Self::UnknownIdentity(_) => "unknown_identity",
            Self::Validation(_) => "validation",
            Self::Repo(_) => "storage",
        }
    }

    /// Whether this is a business rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SoldOut { .. }
                | Self::DuplicateRegistration { .. }
                | Self::EventNotFound(_)
                | Self::UnknownIdentity(_)
        )
    }
}

impl From<RepoError> for RegistrationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for RegistrationError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(RepoError::from(value))
    }
}

/// Runs registrations on one connection, one transaction per call.
pub struct RegistrationService<'conn> {
    conn: &'conn mut Connection,
    fallback: FallbackEmailPolicy,
}

impl<'conn> RegistrationService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self::with_fallback_policy(conn, FallbackEmailPolicy::default())
    }

    pub fn with_fallback_policy(
        conn: &'conn mut Connection,
        fallback: FallbackEmailPolicy,
    ) -> Self {
        Self { conn, fallback }
    }

    /// Registers `identity` for `event_id`.
    ///
    /// # Contract
    /// - Opens an immediate transaction, so concurrent writers on other
    ///   connections wait up to the busy timeout.
    /// - Resolves (or lazily creates) the attendee inside that transaction.
    /// - Commits only when the seat was claimed and the registration row
    ///   inserted; every error path rolls back.
    pub fn register(
        &mut self,
        identity: &Identity,
        event_id: EventId,
    ) -> Result<RegistrationResult, RegistrationError> {
        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        match register_in_tx(&tx, &self.fallback, identity, event_id) {
            Ok(result) => {
                tx.commit()?;
                info!(
                    "event=registration module=registration status=ok event_id={} attendee_id={} registration_id={} duration_ms={}",
                    event_id,
                    result.attendee_id,
                    result.registration_id,
                    started_at.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=registration_rollback module=registration status=error event_id={} error={}",
                        event_id, rollback_err
                    );
                }
                if err.is_rejection() {
                    info!(
                        "event=registration module=registration status=rejected reason={} event_id={} identity_id={} duration_ms={}",
                        err.code(),
                        event_id,
                        identity.id,
                        started_at.elapsed().as_millis()
                    );
                } else {
                    error!(
                        "event=registration module=registration status=error reason={} event_id={} identity_id={} duration_ms={} error={}",
                        err.code(),
                        event_id,
                        identity.id,
                        started_at.elapsed().as_millis(),
                        err
                    );
                }
                Err(err)
            }
        }
    }

    /// Registrations for `event_id`, oldest first.
    pub fn list_registrations(&self, event_id: EventId) -> RepoResult<Vec<Registration>> {
        SqliteRegistrationRepository::new(self.conn).list_for_event(event_id)
    }

    pub fn registration_count(&self, event_id: EventId) -> RepoResult<u32> {
        SqliteRegistrationRepository::new(self.conn).count_for_event(event_id)
    }
}

fn register_in_tx(
    conn: &Connection,
    fallback: &FallbackEmailPolicy,
    identity: &Identity,
    event_id: EventId,
) -> Result<RegistrationResult, RegistrationError> {
    let resolver = ProfileResolver::new(
        SqliteAttendeeRepository::new(conn),
        SqliteIdentityRepository::new(conn),
        fallback.clone(),
    );
    let attendee = resolver
        .resolve_or_create_attendee(identity)
        .map_err(|err| match err {
            RepoError::NotFound {
                entity: "identity",
                id,
            } => RegistrationError::UnknownIdentity(id),
            other => other.into(),
        })?;

    let events = SqliteEventRepository::new(conn);
    let event = events
        .lock_event_for_update(event_id)?
        .ok_or(RegistrationError::EventNotFound(event_id))?;
    if event.is_sold_out() {
        return Err(RegistrationError::SoldOut { event_id });
    }

    let registration = Registration::new(attendee.id, event.id);
    match SqliteRegistrationRepository::new(conn).create_registration(&registration) {
        Ok(()) => {}
        Err(err) if err.is_unique_violation_on("registrations", "attendee_id") => {
            return Err(RegistrationError::DuplicateRegistration {
                event_id,
                attendee_id: attendee.id,
            });
        }
        Err(err) => return Err(err.into()),
    }

    events
        .claim_seat(event.id)?
        .ok_or(RegistrationError::SoldOut { event_id })?;

    Ok(RegistrationResult {
        registration_id: registration.id,
        attendee_id: attendee.id,
        attendee_name: strip_markup(&attendee.name),
        event_title: strip_markup(&event.title),
    })
}

#[cfg(test)]
mod tests {
    use super::RegistrationError;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn business_rejections_are_distinguished_from_faults() {
        let event_id = Uuid::new_v4();
        assert!(RegistrationError::SoldOut { event_id }.is_rejection());
        assert!(RegistrationError::EventNotFound(event_id).is_rejection());
        let storage = RegistrationError::from(RepoError::InvalidData("bad".to_string()));
        assert!(!storage.is_rejection());
        assert_eq!(storage.code(), "storage");
    }
}
