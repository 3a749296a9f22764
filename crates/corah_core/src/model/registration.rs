//! Registration join record.
//!
//! # Invariants
//! - At most one registration exists per `(attendee_id, event_id)` pair; the
//!   storage schema declares this as a unique constraint.

use crate::model::attendee::AttendeeId;
use crate::model::event::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RegistrationId = Uuid;

/// One attendee holding one seat at one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub attendee_id: AttendeeId,
    pub event_id: EventId,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// Creates a registration stamped with the current time.
    pub fn new(attendee_id: AttendeeId, event_id: EventId) -> Self {
        Self {
            id: Uuid::new_v4(),
            attendee_id,
            event_id,
            registered_at: Utc::now(),
        }
    }
}
