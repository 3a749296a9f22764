//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction boundaries; repositories never open transactions.

pub mod event_service;
pub mod identity_service;
pub mod profile_resolver;
pub mod profile_sync;
pub mod registration_service;
