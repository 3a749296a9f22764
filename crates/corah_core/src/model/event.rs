//! Event aggregate.
//!
//! # Responsibility
//! - Hold capacity and seat-usage state for one event.
//! - Derive availability and price display values.
//! - Sanitize rich-text fields and validate itself before persistence.
//!
//! # Invariants
//! - `seats_taken <= capacity`.
//! - `start_time < end_time` when both are set.
//! - `title` and `description_html` only contain allow-listed markup once
//!   cleaned.

use crate::markup::{strip_markup, DESCRIPTION_POLICY, TITLE_POLICY};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Stable event identifier.
pub type EventId = Uuid;

/// Seats offered when an administrator does not set a capacity.
pub const DEFAULT_CAPACITY: u32 = 50;
pub const TITLE_MAX_CHARS: usize = 200;
pub const LOCATION_MAX_CHARS: usize = 150;
const DISPLAY_TITLE_MAX_CHARS: usize = 60;

/// Total seats an event offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(u32);

impl Capacity {
    pub const fn new(seats: u32) -> Self {
        Self(seats)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self(DEFAULT_CAPACITY)
    }
}

/// Seats already claimed by registrations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SeatCount(u32);

impl SeatCount {
    pub const fn new(seats: u32) -> Self {
        Self(seats)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Ticket price in cents. Never negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const FREE: Self = Self(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Accepts a signed amount from untyped input, rejecting negatives.
    pub fn try_from_cents(cents: i64) -> Result<Self, EventValidationError> {
        u64::try_from(cents).map(Self).map_err(|_| {
            EventValidationError::single(EventField::Price, "price cannot be negative")
        })
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub const fn is_free(self) -> bool {
        self.0 == 0
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Price {
    type Err = EventValidationError;

    /// Parses decimal amounts such as `12`, `12.5` or `12.50`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || EventValidationError::single(EventField::Price, "invalid price amount");
        let trimmed = value.trim().trim_start_matches('$');
        if trimmed.starts_with('-') {
            return Err(EventValidationError::single(
                EventField::Price,
                "price cannot be negative",
            ));
        }

        let (units, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if units.is_empty() || fraction.len() > 2 {
            return Err(invalid());
        }
        if !units.chars().all(|ch| ch.is_ascii_digit())
            || !fraction.chars().all(|ch| ch.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: u64 = units.parse().map_err(|_| invalid())?;
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<u64>().map_err(|_| invalid())?,
        };
        units
            .checked_mul(100)
            .and_then(|value| value.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

/// Event field named by a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    Title,
    EndTime,
    Location,
    SeatsTaken,
    Price,
}

impl EventField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::EndTime => "end_time",
            Self::Location => "location",
            Self::SeatsTaken => "seats_taken",
            Self::Price => "price",
        }
    }
}

/// One violated event invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: EventField,
    pub message: String,
}

/// Structured validation failure listing every offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event validation failed: {}", describe(.violations))]
pub struct EventValidationError {
    violations: Vec<FieldViolation>,
}

impl EventValidationError {
    pub(crate) fn single(field: EventField, message: &str) -> Self {
        Self {
            violations: vec![FieldViolation {
                field,
                message: message.to_string(),
            }],
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn has_field(&self, field: EventField) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.field == field)
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{}: {}", violation.field.as_str(), violation.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A scheduled event with a flat pool of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Rich text limited to `TITLE_POLICY` markup.
    pub title: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    /// Must be later than `start_time` when both are set.
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub capacity: Capacity,
    pub seats_taken: SeatCount,
    pub price: Price,
    /// Rich text limited to `DESCRIPTION_POLICY` markup.
    pub description_html: String,
}

impl Event {
    /// Creates an event with default capacity, no seats taken and free entry.
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self::with_id(Uuid::new_v4(), title, date)
    }

    pub fn with_id(id: EventId, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            title: title.into(),
            date,
            start_time: None,
            end_time: None,
            location: None,
            capacity: Capacity::default(),
            seats_taken: SeatCount::default(),
            price: Price::FREE,
            description_html: String::new(),
        }
    }

    /// Seats still open. Saturates at zero.
    pub fn seats_available(&self) -> u32 {
        self.capacity.get().saturating_sub(self.seats_taken.get())
    }

    pub fn is_sold_out(&self) -> bool {
        self.seats_available() == 0
    }

    pub fn is_free(&self) -> bool {
        self.price.is_free()
    }

    /// `FREE` or a dollar amount such as `$12.50`.
    pub fn price_display(&self) -> String {
        if self.is_free() {
            "FREE".to_string()
        } else {
            self.price.to_string()
        }
    }

    /// Title with all markup removed, capped for list displays.
    pub fn display_title(&self) -> String {
        strip_markup(&self.title)
            .chars()
            .take(DISPLAY_TITLE_MAX_CHARS)
            .collect()
    }

    /// Checks every invariant and reports all offending fields at once.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        let mut violations = Vec::new();
        let mut violate = |field, message: &str| {
            violations.push(FieldViolation {
                field,
                message: message.to_string(),
            });
        };

        // Measured on visible text; escaping during sanitize must not count.
        let title_text = strip_markup(&self.title);
        if title_text.is_empty() {
            violate(EventField::Title, "title must not be blank");
        }
        if title_text.chars().count() > TITLE_MAX_CHARS {
            violate(EventField::Title, "title is too long");
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                violate(EventField::EndTime, "end time must be after start time");
            }
        }
        if self
            .location
            .as_ref()
            .is_some_and(|location| location.chars().count() > LOCATION_MAX_CHARS)
        {
            violate(EventField::Location, "location is too long");
        }
        if self.seats_taken.get() > self.capacity.get() {
            violate(EventField::SeatsTaken, "seats taken out of range");
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(EventValidationError { violations })
        }
    }

    /// Reduces `title` and `description_html` to their allow-listed markup.
    pub fn sanitize(&mut self) {
        self.title = TITLE_POLICY.sanitize(&self.title);
        self.description_html = DESCRIPTION_POLICY.sanitize(&self.description_html);
    }

    /// Returns a sanitized copy that passed validation, ready to persist.
    pub fn cleaned(&self) -> Result<Self, EventValidationError> {
        let mut event = self.clone();
        event.sanitize();
        event.validate()?;
        Ok(event)
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_title())
    }
}

#[cfg(test)]
mod tests {
    use super::{Capacity, Event, EventField, Price, SeatCount};
    use chrono::{NaiveDate, NaiveTime};

    fn sample_event() -> Event {
        Event::new(
            "<strong>Corah</strong> Orientation",
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        )
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn new_event_uses_defaults() {
        let event = sample_event();
        assert_eq!(event.capacity.get(), 50);
        assert_eq!(event.seats_taken.get(), 0);
        assert_eq!(event.seats_available(), 50);
        assert!(event.is_free());
        assert_eq!(event.price_display(), "FREE");
    }

    #[test]
    fn end_before_start_fails_and_reverse_passes() {
        let mut event = sample_event();
        event.start_time = Some(time(10));
        event.end_time = Some(time(9));
        let err = event.validate().unwrap_err();
        assert!(err.has_field(EventField::EndTime));

        event.start_time = Some(time(9));
        event.end_time = Some(time(10));
        event.validate().unwrap();
    }

    #[test]
    fn equal_start_and_end_is_rejected() {
        let mut event = sample_event();
        event.start_time = Some(time(9));
        event.end_time = Some(time(9));
        assert!(event.validate().is_err());
    }

    #[test]
    fn seats_taken_above_capacity_is_rejected() {
        let mut event = sample_event();
        event.capacity = Capacity::new(2);
        event.seats_taken = SeatCount::new(3);
        let err = event.validate().unwrap_err();
        assert!(err.has_field(EventField::SeatsTaken));
        assert_eq!(event.seats_available(), 0);
    }

    #[test]
    fn validation_reports_every_offending_field() {
        let mut event = sample_event();
        event.title = "<script>x</script>".to_string();
        event.start_time = Some(time(11));
        event.end_time = Some(time(10));
        event.capacity = Capacity::new(0);
        event.seats_taken = SeatCount::new(1);

        let err = event.validate().unwrap_err();
        assert!(err.has_field(EventField::Title));
        assert!(err.has_field(EventField::EndTime));
        assert!(err.has_field(EventField::SeatsTaken));
        assert!(err.to_string().contains("end_time"));
    }

    #[test]
    fn title_limit_counts_visible_characters() {
        let mut event = sample_event();
        event.title = "Q&A 1<2 ".repeat(25);
        let cleaned = event.cleaned().unwrap();
        assert!(cleaned.title.contains("&amp;"));
        assert!(cleaned.title.chars().count() > super::TITLE_MAX_CHARS);

        event.title = format!("<b>{}</b>", "x".repeat(super::TITLE_MAX_CHARS));
        event.cleaned().unwrap();

        event.title = "x".repeat(super::TITLE_MAX_CHARS + 1);
        let err = event.cleaned().unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, EventField::Title);
        assert_eq!(err.violations()[0].message, "title is too long");
    }

    #[test]
    fn cleaned_sanitizes_title_and_description() {
        let mut event = sample_event();
        event.title = "<a href=\"x\">Corah</a> <em>Day</em>".to_string();
        event.description_html = "<p onclick=\"x\">Hi</p><img src=x>".to_string();

        let cleaned = event.cleaned().unwrap();
        assert_eq!(cleaned.title, "Corah <em>Day</em>");
        assert_eq!(cleaned.description_html, "<p>Hi</p>");
        assert_eq!(cleaned.to_string(), "Corah Day");
    }

    #[test]
    fn display_title_is_truncated() {
        let mut event = sample_event();
        event.title = "x".repeat(80);
        assert_eq!(event.display_title().chars().count(), 60);
    }

    #[test]
    fn price_parses_decimal_amounts() {
        assert_eq!("12".parse::<Price>().unwrap().cents(), 1200);
        assert_eq!("12.5".parse::<Price>().unwrap().cents(), 1250);
        assert_eq!("$0.05".parse::<Price>().unwrap().cents(), 5);
        assert!("-1".parse::<Price>().unwrap_err().has_field(EventField::Price));
        assert!("1.234".parse::<Price>().is_err());
        assert!("abc".parse::<Price>().is_err());
        assert!(Price::try_from_cents(-5).is_err());
    }

    #[test]
    fn paid_event_displays_amount() {
        let mut event = sample_event();
        event.price = Price::from_cents(1250);
        assert!(!event.is_free());
        assert_eq!(event.price_display(), "$12.50");
    }
}
