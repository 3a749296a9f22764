use corah_core::db::open_db_in_memory;
use corah_core::{
    Attendee, AttendeeRepository, ContactSync, Identity, IdentityService, IdentityServiceError,
    SqliteAttendeeRepository,
};
use regex::Regex;

#[test]
fn creating_identity_provisions_linked_attendee() {
    let mut conn = open_db_in_memory().unwrap();
    let identity = Identity::new("jdoe")
        .with_name("Jane", "Doe")
        .with_email("jane@corp.example");

    let attendee = IdentityService::new(&mut conn)
        .create_identity(&identity)
        .unwrap();
    assert_eq!(attendee.name, "Jane Doe");
    assert_eq!(attendee.email, "jane@corp.example");

    let stored = SqliteAttendeeRepository::new(&conn)
        .find_by_identity(identity.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored, attendee);
}

#[test]
fn identity_without_address_gets_placeholder() {
    let mut conn = open_db_in_memory().unwrap();
    let identity = Identity::new("quiet");

    let attendee = IdentityService::new(&mut conn)
        .create_identity(&identity)
        .unwrap();
    let pattern = Regex::new(r"^quiet\+[0-9a-f]{8}@example\.com$").unwrap();
    assert!(pattern.is_match(&attendee.email), "{}", attendee.email);
}

#[test]
fn creation_reuses_unlinked_attendee_with_same_address() {
    let mut conn = open_db_in_memory().unwrap();
    let imported = Attendee::new("Imported", "jane@corp.example");
    SqliteAttendeeRepository::new(&conn)
        .create_attendee(&imported)
        .unwrap();

    let identity = Identity::new("jdoe").with_email("jane@corp.example");
    let attendee = IdentityService::new(&mut conn)
        .create_identity(&identity)
        .unwrap();
    assert_eq!(attendee.id, imported.id);
    assert!(attendee.is_linked_to(identity.id));
}

#[test]
fn taken_handle_is_rejected_without_side_effects() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = IdentityService::new(&mut conn);
    service
        .create_identity(&Identity::new("jdoe").with_email("first@corp.example"))
        .unwrap();

    let duplicate = Identity::new("jdoe").with_email("second@corp.example");
    let err = service.create_identity(&duplicate).unwrap_err();
    assert!(matches!(err, IdentityServiceError::HandleTaken(handle) if handle == "jdoe"));
    assert!(service.get_identity(duplicate.id).unwrap().is_none());
    drop(service);

    assert!(SqliteAttendeeRepository::new(&conn)
        .find_by_email("second@corp.example")
        .unwrap()
        .is_none());
}

#[test]
fn blank_handle_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let err = IdentityService::new(&mut conn)
        .create_identity(&Identity::new("  "))
        .unwrap_err();
    assert!(matches!(err, IdentityServiceError::BlankHandle));
}

#[test]
fn updating_address_syncs_attendee_email() {
    let mut conn = open_db_in_memory().unwrap();
    let mut identity = Identity::new("jdoe").with_email("old@corp.example");
    let mut service = IdentityService::new(&mut conn);
    let attendee = service.create_identity(&identity).unwrap();

    identity.email = Some("new@corp.example".to_string());
    match service.update_identity(&identity).unwrap() {
        ContactSync::Updated(updated) => {
            assert_eq!(updated.id, attendee.id);
            assert_eq!(updated.email, "new@corp.example");
        }
        other => panic!("unexpected sync outcome: {other:?}"),
    }
    assert_eq!(
        service.update_identity(&identity).unwrap(),
        ContactSync::Unchanged
    );
}

#[test]
fn only_the_address_is_synchronized() {
    let mut conn = open_db_in_memory().unwrap();
    let mut identity = Identity::new("jdoe")
        .with_name("Jane", "Doe")
        .with_email("jane@corp.example");
    let mut service = IdentityService::new(&mut conn);
    let attendee = service.create_identity(&identity).unwrap();

    identity.first_name = "Janet".to_string();
    assert_eq!(
        service.update_identity(&identity).unwrap(),
        ContactSync::Unchanged
    );
    drop(service);

    let stored = SqliteAttendeeRepository::new(&conn)
        .get_attendee(attendee.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Jane Doe");
}

#[test]
fn blank_address_is_not_synchronized() {
    let mut conn = open_db_in_memory().unwrap();
    let mut identity = Identity::new("jdoe").with_email("jane@corp.example");
    let mut service = IdentityService::new(&mut conn);
    let attendee = service.create_identity(&identity).unwrap();

    identity.email = Some("   ".to_string());
    assert_eq!(
        service.update_identity(&identity).unwrap(),
        ContactSync::NoAddress
    );
    drop(service);

    let stored = SqliteAttendeeRepository::new(&conn)
        .get_attendee(attendee.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.email, "jane@corp.example");
}

#[test]
fn address_owned_by_another_attendee_is_a_skipped_conflict() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = IdentityService::new(&mut conn);
    service
        .create_identity(&Identity::new("owner").with_email("taken@corp.example"))
        .unwrap();
    let mut identity = Identity::new("jdoe").with_email("jane@corp.example");
    let attendee = service.create_identity(&identity).unwrap();

    identity.email = Some("taken@corp.example".to_string());
    assert_eq!(
        service.update_identity(&identity).unwrap(),
        ContactSync::Conflict {
            attendee_id: attendee.id
        }
    );

    let stored = service.get_identity(identity.id).unwrap().unwrap();
    assert_eq!(stored.email.as_deref(), Some("taken@corp.example"));
}

#[test]
fn deleting_identity_cascades_to_attendee() {
    let mut conn = open_db_in_memory().unwrap();
    let identity = Identity::new("jdoe").with_email("jane@corp.example");
    let mut service = IdentityService::new(&mut conn);
    let attendee = service.create_identity(&identity).unwrap();

    service.delete_identity(identity.id).unwrap();
    assert!(matches!(
        service.delete_identity(identity.id).unwrap_err(),
        IdentityServiceError::NotFound(id) if id == identity.id
    ));
    drop(service);

    assert!(SqliteAttendeeRepository::new(&conn)
        .get_attendee(attendee.id)
        .unwrap()
        .is_none());
}
