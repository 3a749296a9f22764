//! Authenticated principal supplied by the identity provider.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type IdentityId = Uuid;

/// Login account that owns at most one attendee profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    /// Unique login handle.
    pub handle: String,
    pub first_name: String,
    pub last_name: String,
    /// Contact address. Blank values count as absent.
    pub email: Option<String>,
}

impl Identity {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: handle.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Full name, or the handle when no name is set.
    pub fn display_name(&self) -> String {
        let full_name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full_name = full_name.trim();
        if full_name.is_empty() {
            self.handle.clone()
        } else {
            full_name.to_string()
        }
    }

    /// Trimmed contact address, `None` when absent or blank.
    pub fn contact_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
