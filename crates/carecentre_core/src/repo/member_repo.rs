//! Member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and search APIs over the `members` table.
//!
//! # Invariants
//! - Write paths call `Member::validate_on()` before SQL mutations.
//! - Deleting a member removes its bookings and registrations (FK cascade).
//! - List ordering is `name ASC, uuid ASC`.

use super::{bool_to_int, date_to_db, parse_db_date, parse_db_uuid, RepoError, RepoResult};
use crate::model::member::{Member, MemberId};
use chrono::Local;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MEMBER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    name_en,
    phone,
    date_of_birth,
    health_condition,
    special_needs,
    notes,
    is_active
FROM members";

/// Active-state filter for member listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemberStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl MemberStatusFilter {
    /// Parses `all|active|inactive`; anything else means `All`.
    pub fn parse_or_all(value: &str) -> Self {
        match value.trim() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::All,
        }
    }
}

/// Query options for listing members.
#[derive(Debug, Clone, Default)]
pub struct MemberListQuery {
    /// Substring match on name, English name or phone.
    pub text: Option<String>,
    pub status: MemberStatusFilter,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for member registry operations.
pub trait MemberRepository {
    fn create_member(&self, member: &Member) -> RepoResult<MemberId>;
    fn update_member(&self, member: &Member) -> RepoResult<()>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    fn list_members(&self, query: &MemberListQuery) -> RepoResult<Vec<Member>>;
    /// Counts rows matching `query`, ignoring limit and offset.
    fn count_members(&self, query: &MemberListQuery) -> RepoResult<u64>;
    fn set_member_active(&self, id: MemberId, is_active: bool) -> RepoResult<()>;
    fn delete_member(&self, id: MemberId) -> RepoResult<()>;
}

/// SQLite-backed member repository.
#[derive(Clone, Copy)]
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn create_member(&self, member: &Member) -> RepoResult<MemberId> {
        member.validate_on(Local::now().date_naive())?;

        self.conn.execute(
            "INSERT INTO members (
                uuid,
                name,
                name_en,
                phone,
                date_of_birth,
                health_condition,
                special_needs,
                notes,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                member.uuid.to_string(),
                member.name.trim(),
                member.name_en.as_deref(),
                member.phone.as_deref(),
                member.date_of_birth.map(date_to_db),
                member.health_condition.as_deref(),
                member.special_needs.as_deref(),
                member.notes.as_deref(),
                bool_to_int(member.is_active),
            ],
        )?;

        Ok(member.uuid)
    }

    fn update_member(&self, member: &Member) -> RepoResult<()> {
        member.validate_on(Local::now().date_naive())?;

        let changed = self.conn.execute(
            "UPDATE members
             SET
                name = ?1,
                name_en = ?2,
                phone = ?3,
                date_of_birth = ?4,
                health_condition = ?5,
                special_needs = ?6,
                notes = ?7,
                is_active = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?9;",
            params![
                member.name.trim(),
                member.name_en.as_deref(),
                member.phone.as_deref(),
                member.date_of_birth.map(date_to_db),
                member.health_condition.as_deref(),
                member.special_needs.as_deref(),
                member.notes.as_deref(),
                bool_to_int(member.is_active),
                member.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::MemberNotFound(member.uuid));
        }
        Ok(())
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_member_row(row)?));
        }
        Ok(None)
    }

    fn list_members(&self, query: &MemberListQuery) -> RepoResult<Vec<Member>> {
        let (mut sql, mut bind_values) = member_filter_sql(MEMBER_SELECT_SQL, query);
        sql.push_str(" ORDER BY name ASC, uuid ASC");

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
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn count_members(&self, query: &MemberListQuery) -> RepoResult<u64> {
        let (sql, bind_values) = member_filter_sql("SELECT COUNT(*) FROM members", query);
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative member count `{count}`")))
    }

    fn set_member_active(&self, id: MemberId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members
             SET
                is_active = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![bool_to_int(is_active), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::MemberNotFound(id));
        }
        Ok(())
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::MemberNotFound(id));
        }
        Ok(())
    }
}

fn member_filter_sql(select: &str, query: &MemberListQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{select} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    match query.status {
        MemberStatusFilter::All => {}
        MemberStatusFilter::Active => sql.push_str(" AND is_active = 1"),
        MemberStatusFilter::Inactive => sql.push_str(" AND is_active = 0"),
    }

    if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        sql.push_str(
            " AND (instr(name, ?) > 0 OR instr(COALESCE(name_en, ''), ?) > 0 OR instr(COALESCE(phone, ''), ?) > 0)",
        );
        for _ in 0..3 {
            bind_values.push(Value::Text(text.to_string()));
        }
    }

    (sql, bind_values)
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_db_uuid(&uuid_text, "members.uuid")?;

    let date_of_birth = match row.get::<_, Option<String>>("date_of_birth")? {
        Some(value) => Some(parse_db_date(&value, "members.date_of_birth")?),
        None => None,
    };

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in members.is_active"
            )));
        }
    };

    Ok(Member {
        uuid,
        name: row.get("name")?,
        name_en: row.get("name_en")?,
        phone: row.get("phone")?,
        date_of_birth,
        health_condition: row.get("health_condition")?,
        special_needs: row.get("special_needs")?,
        notes: row.get("notes")?,
        is_active,
    })
}
