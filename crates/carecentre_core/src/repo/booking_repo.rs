//! Respite booking repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `respite_bookings`.
//! - Expose the date-range/status filtered reads the capacity engine consumes.
//!
//! # Invariants
//! - Bookings always reference an existing member (FK, cascade on delete).
//! - List ordering is `booking_date DESC, created_at DESC, uuid ASC`.
//! - Reads never mutate booking rows.

use super::{date_to_db, parse_db_date, parse_db_uuid, RepoError, RepoResult};
use crate::model::booking::{Booking, BookingId, BookingStatus, SessionKind};
use crate::model::member::MemberId;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

const BOOKING_SELECT_SQL: &str = "SELECT
    b.uuid AS uuid,
    b.member_uuid AS member_uuid,
    b.booking_date AS booking_date,
    b.session AS session,
    b.status AS status,
    b.notes AS notes
FROM respite_bookings b";

const BOOKING_DETAIL_SELECT_SQL: &str = "SELECT
    b.uuid AS uuid,
    b.member_uuid AS member_uuid,
    b.booking_date AS booking_date,
    b.session AS session,
    b.status AS status,
    b.notes AS notes,
    m.name AS member_name,
    m.health_condition AS health_condition
FROM respite_bookings b
JOIN members m ON m.uuid = b.member_uuid";

/// Filter options for booking reads. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
    pub member_id: Option<MemberId>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl BookingQuery {
    /// Bookings on exactly one date, any status.
    pub fn on_date(date: NaiveDate) -> Self {
        Self::between(date, date)
    }

    /// Bookings within `from..=to`, any status.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            date_from: Some(from),
            date_to: Some(to),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Booking joined with the member fields shown on rosters and heatmaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingDetail {
    pub booking: Booking,
    pub member_name: String,
    pub health_condition: Option<String>,
}

/// Repository interface for respite booking operations.
pub trait BookingRepository {
    fn create_booking(&self, booking: &Booking) -> RepoResult<BookingId>;
    fn update_booking(&self, booking: &Booking) -> RepoResult<()>;
    fn get_booking(&self, id: BookingId) -> RepoResult<Option<Booking>>;
    fn delete_booking(&self, id: BookingId) -> RepoResult<()>;
    fn set_booking_status(&self, id: BookingId, status: BookingStatus) -> RepoResult<()>;
    fn list_bookings(&self, query: &BookingQuery) -> RepoResult<Vec<Booking>>;
    /// Counts rows matching `query`, ignoring limit and offset.
    fn count_bookings(&self, query: &BookingQuery) -> RepoResult<u64>;
    fn list_booking_details(&self, query: &BookingQuery) -> RepoResult<Vec<BookingDetail>>;
}

impl<R: BookingRepository + ?Sized> BookingRepository for &R {
    fn create_booking(&self, booking: &Booking) -> RepoResult<BookingId> {
        (**self).create_booking(booking)
    }

    fn update_booking(&self, booking: &Booking) -> RepoResult<()> {
        (**self).update_booking(booking)
    }

    fn get_booking(&self, id: BookingId) -> RepoResult<Option<Booking>> {
        (**self).get_booking(id)
    }

    fn delete_booking(&self, id: BookingId) -> RepoResult<()> {
        (**self).delete_booking(id)
    }

    fn set_booking_status(&self, id: BookingId, status: BookingStatus) -> RepoResult<()> {
        (**self).set_booking_status(id, status)
    }

    fn list_bookings(&self, query: &BookingQuery) -> RepoResult<Vec<Booking>> {
        (**self).list_bookings(query)
    }

    fn count_bookings(&self, query: &BookingQuery) -> RepoResult<u64> {
        (**self).count_bookings(query)
    }

    fn list_booking_details(&self, query: &BookingQuery) -> RepoResult<Vec<BookingDetail>> {
        (**self).list_booking_details(query)
    }
}

/// SQLite-backed booking repository.
#[derive(Clone, Copy)]
pub struct SqliteBookingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BookingRepository for SqliteBookingRepository<'_> {
    fn create_booking(&self, booking: &Booking) -> RepoResult<BookingId> {
        self.conn.execute(
            "INSERT INTO respite_bookings (
                uuid,
                member_uuid,
                booking_date,
                session,
                status,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                booking.uuid.to_string(),
                booking.member_id.to_string(),
                date_to_db(booking.date),
                booking.session.as_str(),
                booking.status.as_str(),
                booking.notes.as_str(),
            ],
        )?;
        Ok(booking.uuid)
    }

    fn update_booking(&self, booking: &Booking) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE respite_bookings
             SET
                member_uuid = ?1,
                booking_date = ?2,
                session = ?3,
                status = ?4,
                notes = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?6;",
            params![
                booking.member_id.to_string(),
                date_to_db(booking.date),
                booking.session.as_str(),
                booking.status.as_str(),
                booking.notes.as_str(),
                booking.uuid.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::BookingNotFound(booking.uuid));
        }
        Ok(())
    }

    fn get_booking(&self, id: BookingId) -> RepoResult<Option<Booking>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOKING_SELECT_SQL} WHERE b.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_booking_row(row)?));
        }
        Ok(None)
    }

    fn delete_booking(&self, id: BookingId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM respite_bookings WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::BookingNotFound(id));
        }
        Ok(())
    }

    fn set_booking_status(&self, id: BookingId, status: BookingStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE respite_bookings
             SET
                status = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![status.as_str(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::BookingNotFound(id));
        }
        Ok(())
    }

    fn list_bookings(&self, query: &BookingQuery) -> RepoResult<Vec<Booking>> {
        let (sql, bind_values) = paged_sql(BOOKING_SELECT_SQL, query);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut bookings = Vec::new();
        while let Some(row) = rows.next()? {
            bookings.push(parse_booking_row(row)?);
        }
        Ok(bookings)
    }

    fn count_bookings(&self, query: &BookingQuery) -> RepoResult<u64> {
        let (sql, bind_values) =
            booking_filter_sql("SELECT COUNT(*) FROM respite_bookings b", query);
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative booking count `{count}`")))
    }

    fn list_booking_details(&self, query: &BookingQuery) -> RepoResult<Vec<BookingDetail>> {
        let (sql, bind_values) = paged_sql(BOOKING_DETAIL_SELECT_SQL, query);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut details = Vec::new();
        while let Some(row) = rows.next()? {
            details.push(BookingDetail {
                booking: parse_booking_row(row)?,
                member_name: row.get("member_name")?,
                health_condition: row.get("health_condition")?,
            });
        }
        Ok(details)
    }
}

fn booking_filter_sql(select: &str, query: &BookingQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{select} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(from) = query.date_from {
        sql.push_str(" AND b.booking_date >= ?");
        bind_values.push(Value::Text(date_to_db(from)));
    }
    if let Some(to) = query.date_to {
        sql.push_str(" AND b.booking_date <= ?");
        bind_values.push(Value::Text(date_to_db(to)));
    }
    if let Some(status) = query.status {
        sql.push_str(" AND b.status = ?");
        bind_values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(member_id) = query.member_id {
        sql.push_str(" AND b.member_uuid = ?");
        bind_values.push(Value::Text(member_id.to_string()));
    }

    (sql, bind_values)
}

fn paged_sql(select: &str, query: &BookingQuery) -> (String, Vec<Value>) {
    let (mut sql, mut bind_values) = booking_filter_sql(select, query);
    sql.push_str(" ORDER BY b.booking_date DESC, b.created_at DESC, b.uuid ASC");

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }
    } else if query.offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.offset)));
    }

    (sql, bind_values)
}

fn parse_booking_row(row: &Row<'_>) -> RepoResult<Booking> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_db_uuid(&uuid_text, "respite_bookings.uuid")?;

    let member_text: String = row.get("member_uuid")?;
    let member_id = parse_db_uuid(&member_text, "respite_bookings.member_uuid")?;

    let date_text: String = row.get("booking_date")?;
    let date = parse_db_date(&date_text, "respite_bookings.booking_date")?;

    let session_text: String = row.get("session")?;
    let session = SessionKind::parse(&session_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid session `{session_text}` in respite_bookings.session"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = BookingStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in respite_bookings.status"
        ))
    })?;

    Ok(Booking {
        uuid,
        member_id,
        date,
        session,
        status,
        notes: row.get("notes")?,
    })
}
