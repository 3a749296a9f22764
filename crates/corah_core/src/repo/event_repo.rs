//! Event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `events` storage.
//! - Offer the explicit row-lock primitive used by registration.
//!
//! # Invariants
//! - Write paths persist the output of `Event::cleaned()`, never raw input.
//! - After creation `seats_taken` only moves through `claim_seat` and the
//!   release trigger on `registrations`.
//! - `lock_event_for_update` refuses to run outside a transaction.
//! - Deleting an event cascades to its registrations.

use crate::model::event::{
    Capacity, Event, EventField, EventId, EventValidationError, Price, SeatCount,
};
use crate::repo::{parse_count, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    event_date,
    start_time,
    end_time,
    location,
    capacity,
    seats_taken,
    price_cents,
    description_html
FROM events";

/// Repository interface for event persistence.
pub trait EventRepository {
    /// Sanitizes, validates and inserts; returns the stored form.
    fn create_event(&self, event: &Event) -> RepoResult<Event>;
    /// Sanitizes, validates and overwrites the administrative columns.
    ///
    /// `seats_taken` is never written from `event`; the stored count is kept
    /// and `capacity` may not drop below it. Returns the stored form.
    fn update_event(&self, event: &Event) -> RepoResult<Event>;
    /// Claims one seat if one is free; returns the new seat count, or `None`
    /// when the event is full or missing.
    fn claim_seat(&self, id: EventId) -> RepoResult<Option<SeatCount>>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    /// Lists events ordered by date, then start time.
    fn list_events(&self) -> RepoResult<Vec<Event>>;
    fn delete_event(&self, id: EventId) -> RepoResult<()>;
    /// Takes the exclusive write lock covering the event row and reads it.
    ///
    /// Must be called inside a transaction; the lock is held until that
    /// transaction commits or rolls back. Returns `None` when the event does
    /// not exist.
    fn lock_event_for_update(&self, id: EventId) -> RepoResult<Option<Event>>;
}

/// SQLite-backed event repository.
///
/// SQLite locks the whole database for writing, so "row lock" here means the
/// connection holds the single write lock; concurrent writers wait up to the
/// connection busy timeout.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self, event: &Event) -> RepoResult<Event> {
        let event = event.cleaned()?;

        self.conn.execute(
            "INSERT INTO events (
                id,
                title,
                event_date,
                start_time,
                end_time,
                location,
                capacity,
                seats_taken,
                price_cents,
                description_html
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                event.id.to_string(),
                event.title.as_str(),
                event.date,
                event.start_time,
                event.end_time,
                event.location.as_deref(),
                event.capacity.get(),
                event.seats_taken.get(),
                price_to_db(event.price)?,
                event.description_html.as_str(),
            ],
        )?;

        Ok(event)
    }

    fn update_event(&self, event: &Event) -> RepoResult<Event> {
        let event = event.cleaned()?;

        let changed = self.conn.execute(
            "UPDATE events
             SET
                title = ?1,
                event_date = ?2,
                start_time = ?3,
                end_time = ?4,
                location = ?5,
                capacity = ?6,
                price_cents = ?7,
                description_html = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?9 AND seats_taken <= ?6;",
            params![
                event.title.as_str(),
                event.date,
                event.start_time,
                event.end_time,
                event.location.as_deref(),
                event.capacity.get(),
                price_to_db(event.price)?,
                event.description_html.as_str(),
                event.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return match self.get_event(event.id)? {
                Some(_) => Err(RepoError::Validation(EventValidationError::single(
                    EventField::SeatsTaken,
                    "capacity is below seats already taken",
                ))),
                None => Err(RepoError::NotFound {
                    entity: "event",
                    id: event.id,
                }),
            };
        }

        self.get_event(event.id)?.ok_or(RepoError::NotFound {
            entity: "event",
            id: event.id,
        })
    }

    fn claim_seat(&self, id: EventId) -> RepoResult<Option<SeatCount>> {
        let claimed = self
            .conn
            .query_row(
                "UPDATE events
                 SET seats_taken = seats_taken + 1
                 WHERE id = ?1 AND seats_taken < capacity
                 RETURNING seats_taken;",
                [id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        claimed
            .map(|seats| parse_count(seats, "events.seats_taken").map(SeatCount::new))
            .transpose()
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }

        Ok(None)
    }

    fn list_events(&self) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL} ORDER BY event_date ASC, start_time ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }

        Ok(events)
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound { entity: "event", id });
        }

        Ok(())
    }

    fn lock_event_for_update(&self, id: EventId) -> RepoResult<Option<Event>> {
        if self.conn.is_autocommit() {
            return Err(RepoError::TransactionRequired("lock_event_for_update"));
        }

        // A no-op write forces the write lock even in a deferred transaction.
        let touched = self.conn.execute(
            "UPDATE events SET seats_taken = seats_taken WHERE id = ?1;",
            [id.to_string()],
        )?;
        if touched == 0 {
            return Ok(None);
        }

        self.get_event(id)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "events.id")?;

    let event = Event {
        id,
        title: row.get("title")?,
        date: row.get("event_date")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        location: row.get("location")?,
        capacity: Capacity::new(parse_count(row.get("capacity")?, "events.capacity")?),
        seats_taken: SeatCount::new(parse_count(
            row.get("seats_taken")?,
            "events.seats_taken",
        )?),
        price: Price::try_from_cents(row.get("price_cents")?)?,
        description_html: row.get("description_html")?,
    };
    event.validate()?;
    Ok(event)
}

fn price_to_db(price: Price) -> RepoResult<i64> {
    i64::try_from(price.cents())
        .map_err(|_| RepoError::InvalidData(format!("price {price} exceeds storage range")))
}
