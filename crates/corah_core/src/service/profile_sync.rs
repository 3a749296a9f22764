//! Attendee provisioning and contact sync driven by identity writes.
//!
//! Called explicitly by `IdentityService` after an identity row is
//! inserted or updated, inside the same transaction.

use crate::model::attendee::{Attendee, AttendeeId};
use crate::model::identity::Identity;
use crate::repo::attendee_repo::AttendeeRepository;
use crate::repo::identity_repo::IdentityRepository;
use crate::repo::RepoResult;
use crate::service::profile_resolver::ProfileResolver;
use log::{info, warn};

/// What an identity update did to the linked attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactSync {
    /// The attendee email now matches the identity address.
    Updated(Attendee),
    /// Addresses already matched.
    Unchanged,
    /// The identity has no linked attendee.
    NoAttendee,
    /// The identity has no usable address; nothing to sync.
    NoAddress,
    /// Another attendee owns the new address; the sync was skipped.
    Conflict { attendee_id: AttendeeId },
}

/// Provisions the attendee for a freshly created identity.
///
/// Reuses the resolver, so an unlinked profile with the same address is
/// claimed and a taken address falls back to a synthesized one.
pub fn on_identity_created<A, I>(
    resolver: &ProfileResolver<A, I>,
    identity: &Identity,
) -> RepoResult<Attendee>
where
    A: AttendeeRepository,
    I: IdentityRepository,
{
    resolver.resolve_or_create_attendee(identity)
}

/// Copies a changed contact address onto the linked attendee.
///
/// Only the email is synchronized. Blank addresses are ignored.
pub fn on_identity_updated<A: AttendeeRepository>(
    attendees: &A,
    identity: &Identity,
) -> RepoResult<ContactSync> {
    let Some(email) = identity.contact_address() else {
        return Ok(ContactSync::NoAddress);
    };
    let Some(mut attendee) = attendees.find_by_identity(identity.id)? else {
        return Ok(ContactSync::NoAttendee);
    };
    if attendee.email == email {
        return Ok(ContactSync::Unchanged);
    }

    if let Some(owner) = attendees.find_by_email(email)? {
        warn!(
            "event=profile_conflict module=profile_sync status=skipped identity_id={} attendee_id={} owner_id={}",
            identity.id, attendee.id, owner.id
        );
        return Ok(ContactSync::Conflict {
            attendee_id: attendee.id,
        });
    }

    attendee.email = email.to_string();
    match attendees.update_attendee(&attendee) {
        Ok(()) => {
            info!(
                "event=contact_sync module=profile_sync status=ok identity_id={} attendee_id={}",
                identity.id, attendee.id
            );
            Ok(ContactSync::Updated(attendee))
        }
        Err(err) if err.is_unique_violation_on("attendees", "email") => {
            warn!(
                "event=profile_conflict module=profile_sync status=skipped identity_id={} attendee_id={}",
                identity.id, attendee.id
            );
            Ok(ContactSync::Conflict {
                attendee_id: attendee.id,
            })
        }
        Err(err) => Err(err),
    }
}
