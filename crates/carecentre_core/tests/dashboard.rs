use carecentre_core::db::open_db_in_memory;
use carecentre_core::{
    Activity, ActivityRepository, ActivityStatus, ActivityType, BookingService, CapacityConfig,
    DashboardCounts, DashboardService, Member, MemberId, MemberRepository, NewBooking,
    SessionKind, SqliteActivityRepository, SqliteBookingRepository, SqliteMemberRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add_member(conn: &Connection, name: &str) -> MemberId {
    SqliteMemberRepository::new(conn)
        .create_member(&Member::new(name))
        .unwrap()
}

fn add_activity(conn: &Connection, date: NaiveDate, hour: u32, status: ActivityStatus) {
    let mut activity = Activity::new(
        "Morning exercise",
        ActivityType::InterestClass,
        date.and_hms_opt(hour, 0, 0).unwrap(),
    );
    activity.status = status;
    SqliteActivityRepository::new(conn)
        .create_activity(&activity)
        .unwrap();
}

#[test]
fn counts_cover_members_activities_and_respite() {
    let conn = open_db_in_memory().unwrap();
    let bookings = BookingService::new(
        SqliteBookingRepository::new(&conn),
        SqliteMemberRepository::new(&conn),
        CapacityConfig::default(),
    );
    let today = ymd(2024, 6, 12);

    let member = add_member(&conn, "Ng");
    add_member(&conn, "Wong");
    let retired = add_member(&conn, "Lau");
    SqliteMemberRepository::new(&conn)
        .set_member_active(retired, false)
        .unwrap();

    bookings
        .request_booking(&NewBooking::approved(member, today, SessionKind::FullDay))
        .unwrap();
    bookings
        .request_booking(&NewBooking::approved(member, ymd(2024, 6, 13), SessionKind::Morning))
        .unwrap();
    bookings
        .request_booking(&NewBooking::pending(member, ymd(2024, 6, 20), SessionKind::Morning))
        .unwrap();
    bookings
        .request_booking(&NewBooking::pending(member, ymd(2024, 5, 20), SessionKind::Afternoon))
        .unwrap();

    add_activity(&conn, today, 9, ActivityStatus::Upcoming);
    add_activity(&conn, today, 23, ActivityStatus::Cancelled);
    add_activity(&conn, ymd(2024, 6, 11), 23, ActivityStatus::Completed);
    add_activity(&conn, ymd(2024, 6, 13), 0, ActivityStatus::Upcoming);

    let dashboard = DashboardService::new(
        SqliteBookingRepository::new(&conn),
        SqliteMemberRepository::new(&conn),
        SqliteActivityRepository::new(&conn),
    );
    assert_eq!(
        dashboard.counts(today).unwrap(),
        DashboardCounts {
            active_members: 2,
            today_activities: 2,
            approved_today: 1,
            pending_total: 2,
        }
    );
}

#[test]
fn empty_database_counts_zero() {
    let conn = open_db_in_memory().unwrap();
    let dashboard = DashboardService::new(
        SqliteBookingRepository::new(&conn),
        SqliteMemberRepository::new(&conn),
        SqliteActivityRepository::new(&conn),
    );

    let counts = dashboard.counts(ymd(2024, 1, 1)).unwrap();
    assert_eq!(counts.active_members, 0);
    assert_eq!(counts.today_activities, 0);
    assert_eq!(counts.approved_today, 0);
    assert_eq!(counts.pending_total, 0);
}
