use chrono::NaiveDate;
use corah_core::db::open_db;
use corah_core::{
    Capacity, Event, EventRepository, Identity, IdentityService, RegistrationError,
    RegistrationRepository, RegistrationResult, RegistrationService, SqliteEventRepository,
    SqliteRegistrationRepository,
};
use std::path::Path;
use std::sync::Barrier;
use std::thread;

const WORKERS: usize = 8;

fn seeded_event(path: &Path, seats: u32) -> Event {
    let conn = open_db(path).unwrap();
    let mut event = Event::new("Popular", NaiveDate::from_ymd_opt(2026, 7, 4).unwrap());
    event.capacity = Capacity::new(seats);
    SqliteEventRepository::new(&conn).create_event(&event).unwrap()
}

fn seeded_identities(path: &Path, count: usize) -> Vec<Identity> {
    let mut conn = open_db(path).unwrap();
    let mut service = IdentityService::new(&mut conn);
    (0..count)
        .map(|index| {
            let identity = Identity::new(format!("user{index}"))
                .with_email(format!("user{index}@corp.example"));
            service.create_identity(&identity).unwrap();
            identity
        })
        .collect()
}

// One connection per worker, all released at the same instant.
fn register_concurrently(
    path: &Path,
    identities: &[Identity],
    event: &Event,
) -> Vec<Result<RegistrationResult, RegistrationError>> {
    let barrier = Barrier::new(identities.len());
    thread::scope(|scope| {
        let handles: Vec<_> = identities
            .iter()
            .map(|identity| {
                let barrier = &barrier;
                scope.spawn(move || {
                    let mut conn = open_db(path).unwrap();
                    barrier.wait();
                    RegistrationService::new(&mut conn).register(identity, event.id)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
}

fn stored_counts(path: &Path, event: &Event) -> (u32, u32) {
    let conn = open_db(path).unwrap();
    let seats = SqliteEventRepository::new(&conn)
        .get_event(event.id)
        .unwrap()
        .unwrap()
        .seats_taken
        .get();
    let registrations = SqliteRegistrationRepository::new(&conn)
        .count_for_event(event.id)
        .unwrap();
    (seats, registrations)
}

#[test]
fn last_seat_goes_to_exactly_one_of_many_racers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.sqlite3");
    let event = seeded_event(&path, 1);
    let identities = seeded_identities(&path, WORKERS);

    let outcomes = register_concurrently(&path, &identities, &event);

    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let sold_out = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(RegistrationError::SoldOut { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(sold_out, WORKERS - 1);
    assert_eq!(stored_counts(&path, &event), (1, 1));
}

#[test]
fn same_identity_racing_registers_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("duplicate.sqlite3");
    let event = seeded_event(&path, 10);
    let identity = seeded_identities(&path, 1).remove(0);
    let identities = vec![identity; WORKERS];

    let outcomes = register_concurrently(&path, &identities, &event);

    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|outcome| {
            matches!(
                outcome,
                Err(RegistrationError::DuplicateRegistration { .. })
            )
        })
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, WORKERS - 1);
    assert_eq!(stored_counts(&path, &event), (1, 1));
}

#[test]
fn oversubscribed_event_fills_exactly_to_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oversubscribed.sqlite3");
    let event = seeded_event(&path, 5);
    let identities = seeded_identities(&path, 12);

    let outcomes = register_concurrently(&path, &identities, &event);

    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 5);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(err, RegistrationError::SoldOut { .. })));
    assert_eq!(stored_counts(&path, &event), (5, 5));
}
