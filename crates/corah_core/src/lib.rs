//! Core domain logic for CORAH event registration.
//! This crate is the single source of truth for seat and profile invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod markup;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use markup::strip_markup;
pub use model::attendee::{Attendee, AttendeeId};
pub use model::event::{
    Capacity, Event, EventField, EventId, EventValidationError, Price, SeatCount,
};
pub use model::identity::{Identity, IdentityId};
pub use model::registration::{Registration, RegistrationId};
pub use repo::attendee_repo::{AttendeeRepository, SqliteAttendeeRepository};
pub use repo::event_repo::{EventRepository, SqliteEventRepository};
pub use repo::identity_repo::{IdentityRepository, SqliteIdentityRepository};
pub use repo::registration_repo::{RegistrationRepository, SqliteRegistrationRepository};
pub use repo::{RepoError, RepoResult};
pub use service::event_service::{EventService, ScheduleEventRequest};
pub use service::identity_service::{IdentityService, IdentityServiceError};
pub use service::profile_resolver::{FallbackEmailPolicy, ProfileResolver, Resolution};
pub use service::profile_sync::ContactSync;
pub use service::registration_service::{
    RegistrationError, RegistrationResult, RegistrationService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
