//! Activity and registration repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `activities` and `activity_registrations`.
//! - Count seat-holding registrations for capacity display.
//!
//! # Invariants
//! - Write paths call `Activity::validate()` before SQL mutations.
//! - At most one non-cancelled registration per member and activity
//!   (partial unique index).
//! - Activity lists order by `starts_at`, then `uuid ASC`.
//! - Rosters order by `registered_at ASC, uuid ASC`.

use super::{
    date_to_db, datetime_to_db, parse_db_datetime, parse_db_uuid, RepoError, RepoResult,
};
use crate::model::activity::{
    Activity, ActivityId, ActivityStatus, ActivityType, AttendanceStatus, Registration,
    RegistrationId,
};
use crate::model::member::MemberId;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    a.uuid AS uuid,
    a.name AS name,
    a.activity_type AS activity_type,
    a.description AS description,
    a.starts_at AS starts_at,
    a.ends_at AS ends_at,
    a.location AS location,
    a.capacity AS capacity,
    a.fee_cents AS fee_cents,
    a.status AS status
FROM activities a";

const REGISTRATION_SELECT_SQL: &str = "SELECT
    r.uuid AS uuid,
    r.activity_uuid AS activity_uuid,
    r.member_uuid AS member_uuid,
    r.registered_at AS registered_at,
    r.attendance AS attendance,
    r.feedback AS feedback
FROM activity_registrations r";

const REGISTRATION_DETAIL_SELECT_SQL: &str = "SELECT
    r.uuid AS uuid,
    r.activity_uuid AS activity_uuid,
    r.member_uuid AS member_uuid,
    r.registered_at AS registered_at,
    r.attendance AS attendance,
    r.feedback AS feedback,
    m.name AS member_name
FROM activity_registrations r
JOIN members m ON m.uuid = r.member_uuid";

/// Filter options for activity reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    pub activity_type: Option<ActivityType>,
    pub status: Option<ActivityStatus>,
    /// Activities starting on this local date.
    pub starts_on: Option<NaiveDate>,
    /// Ascending start time when set; newest first otherwise.
    pub earliest_first: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ActivityQuery {
    /// Activities starting on `date`, in start order.
    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            starts_on: Some(date),
            earliest_first: true,
            ..Self::default()
        }
    }
}

/// Registration joined with the member name shown on rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationDetail {
    pub registration: Registration,
    pub member_name: String,
}

/// Repository interface for activity and sign-up operations.
pub trait ActivityRepository {
    fn create_activity(&self, activity: &Activity) -> RepoResult<ActivityId>;
    fn update_activity(&self, activity: &Activity) -> RepoResult<()>;
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    /// Removes the activity and all of its registrations.
    fn delete_activity(&self, id: ActivityId) -> RepoResult<()>;
    fn list_activities(&self, query: &ActivityQuery) -> RepoResult<Vec<Activity>>;
    /// Counts rows matching `query`, ignoring limit and offset.
    fn count_activities(&self, query: &ActivityQuery) -> RepoResult<u64>;

    fn create_registration(&self, registration: &Registration) -> RepoResult<RegistrationId>;
    fn get_registration(&self, id: RegistrationId) -> RepoResult<Option<Registration>>;
    /// Non-cancelled registration of `member_id` for `activity_id`, if any.
    fn find_open_registration(
        &self,
        activity_id: ActivityId,
        member_id: MemberId,
    ) -> RepoResult<Option<Registration>>;
    fn set_attendance(
        &self,
        id: RegistrationId,
        attendance: AttendanceStatus,
        feedback: &str,
    ) -> RepoResult<()>;
    fn list_registration_details(
        &self,
        activity_id: ActivityId,
    ) -> RepoResult<Vec<RegistrationDetail>>;
    /// Registrations of `activity_id` that still hold a seat.
    fn count_seated(&self, activity_id: ActivityId) -> RepoResult<u32>;
}

/// SQLite-backed activity repository.
#[derive(Clone, Copy)]
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn create_activity(&self, activity: &Activity) -> RepoResult<ActivityId> {
        activity.validate()?;

        self.conn.execute(
            "INSERT INTO activities (
                uuid,
                name,
                activity_type,
                description,
                starts_at,
                ends_at,
                location,
                capacity,
                fee_cents,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                activity.uuid.to_string(),
                activity.name.trim(),
                activity.activity_type.as_str(),
                activity.description.as_str(),
                datetime_to_db(activity.starts_at),
                activity.ends_at.map(datetime_to_db),
                activity.location.as_str(),
                activity.capacity,
                activity.fee_cents,
                activity.status.as_str(),
            ],
        )?;
        Ok(activity.uuid)
    }

    fn update_activity(&self, activity: &Activity) -> RepoResult<()> {
        activity.validate()?;

        let changed = self.conn.execute(
            "UPDATE activities
             SET
                name = ?1,
                activity_type = ?2,
                description = ?3,
                starts_at = ?4,
                ends_at = ?5,
                location = ?6,
                capacity = ?7,
                fee_cents = ?8,
                status = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10;",
            params![
                activity.name.trim(),
                activity.activity_type.as_str(),
                activity.description.as_str(),
                datetime_to_db(activity.starts_at),
                activity.ends_at.map(datetime_to_db),
                activity.location.as_str(),
                activity.capacity,
                activity.fee_cents,
                activity.status.as_str(),
                activity.uuid.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ActivityNotFound(activity.uuid));
        }
        Ok(())
    }

    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE a.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_activity_row(row)?));
        }
        Ok(None)
    }

    fn delete_activity(&self, id: ActivityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM activities WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ActivityNotFound(id));
        }
        Ok(())
    }

    fn list_activities(&self, query: &ActivityQuery) -> RepoResult<Vec<Activity>> {
        let (mut sql, mut bind_values) = activity_filter_sql(ACTIVITY_SELECT_SQL, query);
        if query.earliest_first {
            sql.push_str(" ORDER BY a.starts_at ASC, a.uuid ASC");
        } else {
            sql.push_str(" ORDER BY a.starts_at DESC, a.uuid ASC");
        }

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

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn count_activities(&self, query: &ActivityQuery) -> RepoResult<u64> {
        let (sql, bind_values) = activity_filter_sql("SELECT COUNT(*) FROM activities a", query);
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative activity count `{count}`")))
    }

    fn create_registration(&self, registration: &Registration) -> RepoResult<RegistrationId> {
        self.conn.execute(
            "INSERT INTO activity_registrations (
                uuid,
                activity_uuid,
                member_uuid,
                registered_at,
                attendance,
                feedback
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                registration.uuid.to_string(),
                registration.activity_id.to_string(),
                registration.member_id.to_string(),
                datetime_to_db(registration.registered_at),
                registration.attendance.as_str(),
                registration.feedback.as_str(),
            ],
        )?;
        Ok(registration.uuid)
    }

    fn get_registration(&self, id: RegistrationId) -> RepoResult<Option<Registration>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REGISTRATION_SELECT_SQL} WHERE r.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_registration_row(row)?));
        }
        Ok(None)
    }

    fn find_open_registration(
        &self,
        activity_id: ActivityId,
        member_id: MemberId,
    ) -> RepoResult<Option<Registration>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REGISTRATION_SELECT_SQL}
             WHERE r.activity_uuid = ?1
               AND r.member_uuid = ?2
               AND r.attendance <> 'cancelled'
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![activity_id.to_string(), member_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_registration_row(row)?));
        }
        Ok(None)
    }

    fn set_attendance(
        &self,
        id: RegistrationId,
        attendance: AttendanceStatus,
        feedback: &str,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE activity_registrations
             SET
                attendance = ?1,
                feedback = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3;",
            params![attendance.as_str(), feedback, id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::RegistrationNotFound(id));
        }
        Ok(())
    }

    fn list_registration_details(
        &self,
        activity_id: ActivityId,
    ) -> RepoResult<Vec<RegistrationDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REGISTRATION_DETAIL_SELECT_SQL}
             WHERE r.activity_uuid = ?1
             ORDER BY r.registered_at ASC, r.uuid ASC;"
        ))?;
        let mut rows = stmt.query([activity_id.to_string()])?;
        let mut details = Vec::new();
        while let Some(row) = rows.next()? {
            details.push(RegistrationDetail {
                registration: parse_registration_row(row)?,
                member_name: row.get("member_name")?,
            });
        }
        Ok(details)
    }

    fn count_seated(&self, activity_id: ActivityId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM activity_registrations
             WHERE activity_uuid = ?1 AND attendance <> 'cancelled';",
            [activity_id.to_string()],
            |row| row.get(0),
        )?;
        u32::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("invalid registration count `{count}`")))
    }
}

fn activity_filter_sql(select: &str, query: &ActivityQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{select} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(activity_type) = query.activity_type {
        sql.push_str(" AND a.activity_type = ?");
        bind_values.push(Value::Text(activity_type.as_str().to_string()));
    }
    if let Some(status) = query.status {
        sql.push_str(" AND a.status = ?");
        bind_values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(date) = query.starts_on {
        sql.push_str(" AND substr(a.starts_at, 1, 10) = ?");
        bind_values.push(Value::Text(date_to_db(date)));
    }

    (sql, bind_values)
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_db_uuid(&uuid_text, "activities.uuid")?;

    let type_text: String = row.get("activity_type")?;
    let activity_type = ActivityType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid activity type `{type_text}` in activities.activity_type"
        ))
    })?;

    let starts_text: String = row.get("starts_at")?;
    let starts_at = parse_db_datetime(&starts_text, "activities.starts_at")?;
    let ends_at = match row.get::<_, Option<String>>("ends_at")? {
        Some(value) => Some(parse_db_datetime(&value, "activities.ends_at")?),
        None => None,
    };

    let status_text: String = row.get("status")?;
    let status = ActivityStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in activities.status"
        ))
    })?;

    Ok(Activity {
        uuid,
        name: row.get("name")?,
        activity_type,
        description: row.get("description")?,
        starts_at,
        ends_at,
        location: row.get("location")?,
        capacity: row.get("capacity")?,
        fee_cents: row.get("fee_cents")?,
        status,
    })
}

fn parse_registration_row(row: &Row<'_>) -> RepoResult<Registration> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_db_uuid(&uuid_text, "activity_registrations.uuid")?;

    let activity_text: String = row.get("activity_uuid")?;
    let activity_id = parse_db_uuid(&activity_text, "activity_registrations.activity_uuid")?;

    let member_text: String = row.get("member_uuid")?;
    let member_id = parse_db_uuid(&member_text, "activity_registrations.member_uuid")?;

    let registered_text: String = row.get("registered_at")?;
    let registered_at =
        parse_db_datetime(&registered_text, "activity_registrations.registered_at")?;

    let attendance_text: String = row.get("attendance")?;
    let attendance = AttendanceStatus::parse(&attendance_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid attendance `{attendance_text}` in activity_registrations.attendance"
        ))
    })?;

    Ok(Registration {
        uuid,
        activity_id,
        member_id,
        registered_at,
        attendance,
        feedback: row.get("feedback")?,
    })
}
