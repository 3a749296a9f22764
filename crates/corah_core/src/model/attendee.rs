//! Attendee profile owned by one identity.

use crate::model::identity::IdentityId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type AttendeeId = Uuid;

/// Registrant profile. `email` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    /// Owning identity. `None` for profiles imported before their account.
    pub identity_id: Option<IdentityId>,
    pub name: String,
    pub email: String,
}

impl Attendee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id: None,
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn linked_to(mut self, identity_id: IdentityId) -> Self {
        self.identity_id = Some(identity_id);
        self
    }

    pub fn is_linked(&self) -> bool {
        self.identity_id.is_some()
    }

    pub fn is_linked_to(&self, identity_id: IdentityId) -> bool {
        self.identity_id == Some(identity_id)
    }
}

impl Display for Attendee {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
