use carecentre_core::db::migrations::latest_version;
use carecentre_core::db::{open_db, open_db_in_memory, schema_version, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "members");
    assert_table_exists(&conn, "respite_bookings");
    assert_table_exists(&conn, "activities");
    assert_table_exists(&conn, "activity_registrations");
}

#[test]
fn respite_bookings_has_capacity_query_columns() {
    let conn = open_db_in_memory().unwrap();

    let mut stmt = conn.prepare("PRAGMA table_info(respite_bookings);").unwrap();
    let mut rows = stmt.query([]).unwrap();
    let mut columns = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        let column_name: String = row.get(1).unwrap();
        columns.push(column_name);
    }
    for expected in ["uuid", "member_uuid", "booking_date", "session", "status", "notes"] {
        assert!(columns.contains(&expected.to_string()), "missing column {expected}");
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("carecentre.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "respite_bookings");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_migration_keeps_previous_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half-upgraded.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE activities (legacy TEXT);
         PRAGMA user_version = 2;",
    )
    .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::MigrationFailed { version, .. } => assert_eq!(version, 3),
        other => panic!("unexpected error: {other}"),
    }
    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 2);
}

#[test]
fn open_registrations_are_unique_per_member_and_activity() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO members (uuid, name) VALUES ('m-1', 'Chan');
         INSERT INTO activities (uuid, name, activity_type, starts_at)
         VALUES ('a-1', 'Tai chi', 'interest_class', '2024-06-03 10:00:00');
         INSERT INTO activity_registrations (uuid, activity_uuid, member_uuid, registered_at, attendance)
         VALUES ('r-1', 'a-1', 'm-1', '2024-06-01 09:00:00', 'cancelled');
         INSERT INTO activity_registrations (uuid, activity_uuid, member_uuid, registered_at)
         VALUES ('r-2', 'a-1', 'm-1', '2024-06-01 09:05:00');",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO activity_registrations (uuid, activity_uuid, member_uuid, registered_at)
         VALUES ('r-3', 'a-1', 'm-1', '2024-06-01 09:10:00');",
        [],
    );
    assert!(duplicate.is_err());
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO respite_bookings (uuid, member_uuid, booking_date, session)
         VALUES ('b-1', 'no-such-member', '2024-06-01', 'morning');",
        [],
    );
    assert!(result.is_err());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
