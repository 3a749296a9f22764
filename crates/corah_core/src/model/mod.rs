//! Domain model for event registration.
//!
//! # Responsibility
//! - Define the records shared by repositories and services.
//! - Keep aggregate invariants (seat bounds, time ordering) next to the data.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Event and Attendee are independent aggregates; Registration only joins
//!   them.

pub mod attendee;
pub mod event;
pub mod identity;
pub mod registration;
