//! Event administration use case.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for event administration.
//! - Delegate persistence and validation to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::event::{Capacity, Event, EventId, Price};
use crate::repo::event_repo::EventRepository;
use crate::repo::RepoResult;
use chrono::{NaiveDate, NaiveTime};
use log::info;

/// Use-case service wrapper for event CRUD operations.
pub struct EventService<R: EventRepository> {
    repo: R,
}

/// Request model for scheduling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEventRequest {
    /// Rich-text title; sanitized before storage.
    pub title: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    /// `None` uses the default capacity.
    pub capacity: Option<Capacity>,
    pub price: Price,
    pub description_html: String,
}

impl ScheduleEventRequest {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            start_time: None,
            end_time: None,
            location: None,
            capacity: None,
            price: Price::FREE,
            description_html: String::new(),
        }
    }
}

impl<R: EventRepository> EventService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and stores `event`, returning the sanitized form.
    pub fn create_event(&self, event: &Event) -> RepoResult<Event> {
        let stored = self.repo.create_event(event)?;
        info!(
            "event=event_create module=event status=ok event_id={} capacity={}",
            stored.id,
            stored.capacity.get()
        );
        Ok(stored)
    }

    /// Builds a fresh event with no seats taken and stores it.
    pub fn schedule_event(&self, request: &ScheduleEventRequest) -> RepoResult<Event> {
        let mut event = Event::new(request.title.clone(), request.date);
        event.start_time = request.start_time;
        event.end_time = request.end_time;
        event.location = request.location.clone();
        if let Some(capacity) = request.capacity {
            event.capacity = capacity;
        }
        event.price = request.price;
        event.description_html = request.description_html.clone();
        self.create_event(&event)
    }

    /// Saves the administrative fields. The stored `seats_taken` wins over
    /// the copy in `event`, so editing a stale copy never frees seats.
    ///
    /// Returns repository-level not-found or validation errors unchanged.
    pub fn update_event(&self, event: &Event) -> RepoResult<Event> {
        self.repo.update_event(event)
    }

    pub fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        self.repo.get_event(id)
    }

    /// Lists events ordered by date, then start time.
    pub fn list_events(&self) -> RepoResult<Vec<Event>> {
        self.repo.list_events()
    }

    /// Deletes an event and its registrations.
    pub fn delete_event(&self, id: EventId) -> RepoResult<()> {
        self.repo.delete_event(id)?;
        info!("event=event_delete module=event status=ok event_id={id}");
        Ok(())
    }
}
