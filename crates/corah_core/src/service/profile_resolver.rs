//! Attendee profile resolution for authenticated identities.
//!
//! # Responsibility
//! - Find or create exactly one attendee for an identity.
//! - Reconcile pre-existing profiles by linked identity, then by email.
//! - Synthesize collision-free fallback addresses when needed.
//!
//! # Invariants
//! - Never surfaces an email uniqueness violation to callers.
//! - The returned attendee is persisted and linked to the identity.
//! - Runs on whatever connection it is given, so callers control the
//!   transaction boundary.

use crate::model::attendee::Attendee;
use crate::model::identity::Identity;
use crate::repo::attendee_repo::AttendeeRepository;
use crate::repo::identity_repo::IdentityRepository;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use uuid::Uuid;

pub const DEFAULT_FALLBACK_DOMAIN: &str = "example.com";
const FALLBACK_SLUG: &str = "attendee";
const FALLBACK_TOKEN_CHARS: usize = 8;
const MAX_FALLBACK_ATTEMPTS: usize = 8;

/// Builds synthesized contact addresses: `<slug>+<token>@<domain>`.
///
/// `slug` keeps the lowercased ASCII alphanumerics of the identity's address
/// local-part, else of its handle; `token` is the first 8 hex digits of the
/// identity id. Retries append a random suffix: `<slug>+<token>-<random>@<domain>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEmailPolicy {
    domain: String,
}

impl FallbackEmailPolicy {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Deterministic first candidate for `identity`.
    pub fn primary_address(&self, identity: &Identity) -> String {
        format!(
            "{}+{}@{}",
            fallback_slug(identity),
            identity_token(identity),
            self.domain
        )
    }

    fn salted_address(&self, identity: &Identity) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        format!(
            "{}+{}-{}@{}",
            fallback_slug(identity),
            identity_token(identity),
            &salt[..FALLBACK_TOKEN_CHARS],
            self.domain
        )
    }
}

impl Default for FallbackEmailPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_DOMAIN)
    }
}

/// How a profile was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The identity already owned a profile.
    AlreadyLinked,
    /// An unlinked profile with the same email was claimed.
    LinkedByEmail,
    /// A new profile was created with the identity's own email.
    Created,
    /// A new profile was created with a synthesized address.
    CreatedWithFallback,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyLinked => "already_linked",
            Self::LinkedByEmail => "linked_by_email",
            Self::Created => "created",
            Self::CreatedWithFallback => "created_with_fallback",
        }
    }
}

/// Resolved profile plus the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttendee {
    pub attendee: Attendee,
    pub resolution: Resolution,
}

/// Finds or creates the attendee profile of an identity.
pub struct ProfileResolver<A: AttendeeRepository, I: IdentityRepository> {
    attendees: A,
    identities: I,
    fallback: FallbackEmailPolicy,
}

impl<A: AttendeeRepository, I: IdentityRepository> ProfileResolver<A, I> {
    pub fn new(attendees: A, identities: I, fallback: FallbackEmailPolicy) -> Self {
        Self {
            attendees,
            identities,
            fallback,
        }
    }

    /// Returns the identity's attendee, creating or linking one if needed.
    ///
    /// Fails with `RepoError::NotFound` when the identity is not persisted.
    pub fn resolve_or_create_attendee(&self, identity: &Identity) -> RepoResult<Attendee> {
        self.resolve(identity).map(|resolved| resolved.attendee)
    }

    /// Same as `resolve_or_create_attendee`, also reporting the path taken.
    pub fn resolve(&self, identity: &Identity) -> RepoResult<ResolvedAttendee> {
        if let Some(attendee) = self.attendees.find_by_identity(identity.id)? {
            return Ok(ResolvedAttendee {
                attendee,
                resolution: Resolution::AlreadyLinked,
            });
        }

        if self.identities.get_identity(identity.id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "identity",
                id: identity.id,
            });
        }

        let resolved = match identity.contact_address() {
            Some(email) => match self.attendees.find_by_email(email)? {
                Some(existing)
                    if existing.identity_id.is_none() || existing.is_linked_to(identity.id) =>
                {
                    self.link(existing, identity)?
                }
                Some(existing) => {
                    warn!(
                        "event=profile_conflict module=profile status=fallback identity_id={} attendee_id={}",
                        identity.id, existing.id
                    );
                    self.create_with_fallback(identity)?
                }
                None => self.create(identity, email)?,
            },
            None => self.create_with_fallback(identity)?,
        };

        info!(
            "event=attendee_resolve module=profile status=ok resolution={} identity_id={} attendee_id={}",
            resolved.resolution.as_str(),
            identity.id,
            resolved.attendee.id
        );
        Ok(resolved)
    }

    fn link(&self, mut attendee: Attendee, identity: &Identity) -> RepoResult<ResolvedAttendee> {
        attendee.identity_id = Some(identity.id);
        if attendee.name.trim().is_empty() {
            attendee.name = identity.display_name();
        }

        match self.attendees.update_attendee(&attendee) {
            Ok(()) => Ok(ResolvedAttendee {
                attendee,
                resolution: Resolution::LinkedByEmail,
            }),
            Err(err) => self.recover_linked(identity, err),
        }
    }

    fn create(&self, identity: &Identity, email: &str) -> RepoResult<ResolvedAttendee> {
        let attendee = Attendee::new(identity.display_name(), email).linked_to(identity.id);
        match self.attendees.create_attendee(&attendee) {
            Ok(()) => Ok(ResolvedAttendee {
                attendee,
                resolution: Resolution::Created,
            }),
            Err(err) if err.is_unique_violation_on("attendees", "email") => {
                self.create_with_fallback(identity)
            }
            Err(err) => self.recover_linked(identity, err),
        }
    }

    fn create_with_fallback(&self, identity: &Identity) -> RepoResult<ResolvedAttendee> {
        let mut last_error = None;
        for attempt in 0..MAX_FALLBACK_ATTEMPTS {
            let email = if attempt == 0 {
                self.fallback.primary_address(identity)
            } else {
                self.fallback.salted_address(identity)
            };
            if self.attendees.find_by_email(&email)?.is_some() {
                continue;
            }

            let attendee = Attendee::new(identity.display_name(), email).linked_to(identity.id);
            match self.attendees.create_attendee(&attendee) {
                Ok(()) => {
                    return Ok(ResolvedAttendee {
                        attendee,
                        resolution: Resolution::CreatedWithFallback,
                    });
                }
                Err(err) if err.is_unique_violation_on("attendees", "email") => {
                    last_error = Some(err);
                }
                Err(err) => return self.recover_linked(identity, err),
            }
        }

        Err(last_error.unwrap_or_else(|| RepoError::UniqueViolation {
            constraint: "attendees.email: fallback addresses exhausted".to_string(),
        }))
    }

    // Another writer linked a profile to this identity first; use theirs.
    fn recover_linked(&self, identity: &Identity, err: RepoError) -> RepoResult<ResolvedAttendee> {
        if !err.is_unique_violation_on("attendees", "identity_id") {
            return Err(err);
        }
        match self.attendees.find_by_identity(identity.id)? {
            Some(attendee) => Ok(ResolvedAttendee {
                attendee,
                resolution: Resolution::AlreadyLinked,
            }),
            None => Err(err),
        }
    }
}

fn fallback_slug(identity: &Identity) -> String {
    let local_part = identity
        .contact_address()
        .and_then(|email| email.split('@').next())
        .map(slugify)
        .filter(|slug| !slug.is_empty());

    local_part
        .or_else(|| Some(slugify(&identity.handle)).filter(|slug| !slug.is_empty()))
        .unwrap_or_else(|| FALLBACK_SLUG.to_string())
}

fn slugify(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

fn identity_token(identity: &Identity) -> String {
    identity.id.simple().to_string()[..FALLBACK_TOKEN_CHARS].to_string()
}

#[cfg(test)]
mod tests {
    use super::{fallback_slug, FallbackEmailPolicy};
    use crate::model::identity::Identity;
    use uuid::Uuid;

    #[test]
    fn primary_address_uses_local_part_and_identity_token() {
        let mut identity = Identity::new("jdoe").with_email("Jane.Doe@corp.example");
        identity.id = Uuid::parse_str("0a1b2c3d-0000-4000-8000-000000000000").unwrap();
        let address = FallbackEmailPolicy::new("attendees.test").primary_address(&identity);
        assert_eq!(address, "janedoe+0a1b2c3d@attendees.test");
    }

    #[test]
    fn slug_falls_back_to_handle_then_constant() {
        assert_eq!(fallback_slug(&Identity::new("J Doe!")), "jdoe");
        assert_eq!(fallback_slug(&Identity::new("***")), "attendee");
        assert_eq!(
            fallback_slug(&Identity::new("x").with_email("Jane.Doe_x-y@corp.example")),
            "janedoexy"
        );
        assert_eq!(
            fallback_slug(&Identity::new("jdoe").with_email("@nowhere")),
            "jdoe"
        );
    }

    #[test]
    fn salted_addresses_differ_but_share_the_prefix() {
        let identity = Identity::new("jdoe");
        let policy = FallbackEmailPolicy::default();
        let first = policy.salted_address(&identity);
        let second = policy.salted_address(&identity);
        assert_ne!(first, second);
        assert!(first.starts_with(&format!("jdoe+{}-", &identity.id.simple().to_string()[..8])));
        assert!(first.ends_with("@example.com"));
    }
}
