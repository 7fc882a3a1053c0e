//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for members, bookings
//!   and activities.
//! - Isolate SQLite query details from service and capacity logic.
//!
//! # Invariants
//! - Member writes enforce `Member::validate_on()` before persistence.
//! - Activity writes enforce `Activity::validate()` before persistence.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`*NotFound`) in addition to DB
//!   transport errors.

use crate::db::DbError;
use crate::model::activity::{ActivityId, ActivityValidationError, RegistrationId};
use crate::model::booking::BookingId;
use crate::model::member::{MemberId, MemberValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity_repo;
pub mod booking_repo;
pub mod member_repo;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by member, booking and activity persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(MemberValidationError),
    InvalidActivity(ActivityValidationError),
    Db(DbError),
    MemberNotFound(MemberId),
    BookingNotFound(BookingId),
    ActivityNotFound(ActivityId),
    RegistrationNotFound(RegistrationId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidActivity(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            Self::ActivityNotFound(id) => write!(f, "activity not found: {id}"),
            Self::RegistrationNotFound(id) => write!(f, "registration not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidActivity(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::MemberNotFound(_)
            | Self::BookingNotFound(_)
            | Self::ActivityNotFound(_)
            | Self::RegistrationNotFound(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<MemberValidationError> for RepoError {
    fn from(value: MemberValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ActivityValidationError> for RepoError {
    fn from(value: ActivityValidationError) -> Self {
        Self::InvalidActivity(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_db_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn datetime_to_db(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_db_datetime(value: &str, column: &str) -> RepoResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid datetime `{value}` in {column}")))
}

pub(crate) fn parse_db_uuid(value: &str, column: &str) -> RepoResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
