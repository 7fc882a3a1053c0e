use carecentre_core::db::open_db_in_memory;
use carecentre_core::{
    BookingService, BookingServiceError, BookingStatus, CapacityConfig, HalfSession, Member,
    MemberId, MemberRepository, NewBooking, SessionKind, SqliteBookingRepository,
    SqliteMemberRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

type Service<'conn> = BookingService<SqliteBookingRepository<'conn>, SqliteMemberRepository<'conn>>;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service(conn: &Connection) -> Service<'_> {
    BookingService::new(
        SqliteBookingRepository::new(conn),
        SqliteMemberRepository::new(conn),
        CapacityConfig::default(),
    )
}

fn add_member(conn: &Connection, name: &str) -> MemberId {
    SqliteMemberRepository::new(conn)
        .create_member(&Member::new(name))
        .unwrap()
}

#[test]
fn requests_require_an_existing_active_member() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let date = ymd(2024, 6, 3);

    let missing = Uuid::new_v4();
    let err = service
        .request_booking(&NewBooking::pending(missing, date, SessionKind::Morning))
        .unwrap_err();
    assert!(matches!(err, BookingServiceError::MemberNotFound(id) if id == missing));

    let member = add_member(&conn, "Retired");
    SqliteMemberRepository::new(&conn)
        .set_member_active(member, false)
        .unwrap();
    let err = service
        .request_booking(&NewBooking::pending(member, date, SessionKind::Morning))
        .unwrap_err();
    assert!(matches!(err, BookingServiceError::MemberInactive(_)));
}

#[test]
fn pending_requests_are_accepted_even_when_full() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let member = add_member(&conn, "Chan");
    let date = ymd(2024, 6, 3);

    for _ in 0..4 {
        service
            .request_booking(&NewBooking::approved(member, date, SessionKind::Morning))
            .unwrap();
    }
    let pending = service
        .request_booking(&NewBooking::pending(member, date, SessionKind::Morning))
        .unwrap();
    assert_eq!(pending.status, BookingStatus::Pending);

    let err = service
        .request_booking(&NewBooking::approved(member, date, SessionKind::Morning))
        .unwrap_err();
    assert!(matches!(
        err,
        BookingServiceError::SessionFull { session: SessionKind::Morning, .. }
    ));

    let err = service.approve_booking(pending.uuid).unwrap_err();
    assert!(matches!(err, BookingServiceError::SessionFull { .. }));
    assert_eq!(
        service.get_booking(pending.uuid).unwrap().unwrap().status,
        BookingStatus::Pending
    );
}

#[test]
fn full_day_approval_needs_room_in_both_halves() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let member = add_member(&conn, "Lee");
    let date = ymd(2024, 6, 4);

    for _ in 0..4 {
        service
            .request_booking(&NewBooking::approved(member, date, SessionKind::Afternoon))
            .unwrap();
    }
    let full_day = service
        .request_booking(&NewBooking::pending(member, date, SessionKind::FullDay))
        .unwrap();
    assert!(matches!(
        service.approve_booking(full_day.uuid),
        Err(BookingServiceError::SessionFull { .. })
    ));

    let morning = service
        .request_booking(&NewBooking::pending(member, date, SessionKind::Morning))
        .unwrap();
    let approved = service.approve_booking(morning.uuid).unwrap();
    assert_eq!(approved.status, BookingStatus::Approved);
    assert_eq!(
        service
            .capacity()
            .remaining_slots(date, SessionKind::Morning)
            .unwrap(),
        3
    );
}

#[test]
fn approve_is_idempotent_and_reject_frees_the_slot() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let member = add_member(&conn, "Wong");
    let date = ymd(2024, 6, 5);

    let booking = service
        .request_booking(&NewBooking::pending(member, date, SessionKind::FullDay))
        .unwrap();
    service.approve_booking(booking.uuid).unwrap();
    service.approve_booking(booking.uuid).unwrap();
    let engine = service.capacity();
    assert_eq!(engine.remaining_slots(date, SessionKind::FullDay).unwrap(), 3);

    let rejected = service.reject_booking(booking.uuid).unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);
    assert_eq!(engine.remaining_slots(date, SessionKind::FullDay).unwrap(), 4);
}

#[test]
fn updating_an_approved_booking_does_not_count_itself() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let member = add_member(&conn, "Ho");
    let date = ymd(2024, 6, 6);

    let mut bookings = Vec::new();
    for _ in 0..4 {
        bookings.push(
            service
                .request_booking(&NewBooking::approved(member, date, SessionKind::Morning))
                .unwrap(),
        );
    }

    let mut edited = bookings[0].clone();
    edited.notes = "arrives 9:30".to_string();
    let stored = service.update_booking(&edited).unwrap();
    assert_eq!(stored.notes, "arrives 9:30");

    // Widening to full-day keeps its own morning slot and takes a free afternoon.
    edited.session = SessionKind::FullDay;
    service.update_booking(&edited).unwrap();

    // Moving another approved booking back onto a full morning is refused.
    let mut moved = bookings[1].clone();
    moved.date = ymd(2024, 6, 7);
    service.update_booking(&moved).unwrap();
    let mut back = moved.clone();
    back.date = date;
    service
        .request_booking(&NewBooking::approved(member, date, SessionKind::Morning))
        .unwrap();
    assert!(matches!(
        service.update_booking(&back),
        Err(BookingServiceError::SessionFull { .. })
    ));
}

#[test]
fn day_detail_splits_roster_by_status_for_one_half() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let chan = add_member(&conn, "Chan");
    let lee = add_member(&conn, "Lee");
    let date = ymd(2024, 6, 10);

    service
        .request_booking(&NewBooking::approved(chan, date, SessionKind::FullDay))
        .unwrap();
    service
        .request_booking(&NewBooking::pending(lee, date, SessionKind::Morning))
        .unwrap();
    let rejected = service
        .request_booking(&NewBooking::pending(lee, date, SessionKind::Morning))
        .unwrap();
    service.reject_booking(rejected.uuid).unwrap();
    service
        .request_booking(&NewBooking::approved(lee, date, SessionKind::Afternoon))
        .unwrap();

    let morning = service.day_detail(date, HalfSession::Morning).unwrap();
    assert_eq!(morning.approved.len(), 1);
    assert_eq!(morning.approved[0].member_name, "Chan");
    assert_eq!(morning.pending.len(), 1);
    assert_eq!(morning.pending[0].member_name, "Lee");
    assert_eq!(morning.remaining, 3);
    assert_eq!(morning.capacity, 4);

    let afternoon = service.day_detail(date, HalfSession::Afternoon).unwrap();
    assert_eq!(afternoon.approved.len(), 2);
    assert!(afternoon.pending.is_empty());
    assert_eq!(afternoon.remaining, 2);
}

#[test]
fn list_bookings_pages_and_filters_by_status() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let member = add_member(&conn, "Tam");

    for day in 1..=25 {
        service
            .request_booking(&NewBooking::pending(member, ymd(2024, 6, day), SessionKind::Morning))
            .unwrap();
    }
    let approved = service
        .request_booking(&NewBooking::approved(member, ymd(2024, 7, 1), SessionKind::Afternoon))
        .unwrap();

    let first = service.list_bookings(None, 1).unwrap();
    assert_eq!(first.total, 26);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items.len(), 20);
    assert_eq!(first.items[0].booking.uuid, approved.uuid);

    let second = service.list_bookings(None, 2).unwrap();
    assert_eq!(second.items.len(), 6);

    let only_approved = service
        .list_bookings(Some(BookingStatus::Approved), 1)
        .unwrap();
    assert_eq!(only_approved.total, 1);
    assert_eq!(only_approved.total_pages, 1);
}

#[test]
fn delete_missing_booking_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let missing = Uuid::new_v4();
    assert!(matches!(
        service.delete_booking(missing),
        Err(BookingServiceError::BookingNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.approve_booking(missing),
        Err(BookingServiceError::BookingNotFound(_))
    ));
}
