//! Member registry domain model.
//!
//! # Responsibility
//! - Define the canonical centre member record.
//! - Validate member fields before persistence.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another member.
//! - `name` is never blank.
//! - `date_of_birth`, when set, is not after the join date of the record.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a centre member.
pub type MemberId = Uuid;

/// Validation failure for member records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    /// Primary display name is empty after trim.
    BlankName,
    /// Date of birth lies after `today`.
    BirthDateInFuture(NaiveDate),
}

impl Display for MemberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "member name must not be blank"),
            Self::BirthDateInFuture(date) => {
                write!(f, "member date of birth {date} is in the future")
            }
        }
    }
}

impl Error for MemberValidationError {}

/// Registered centre member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub uuid: MemberId,
    /// Primary display name as used by staff.
    pub name: String,
    pub name_en: Option<String>,
    /// Digits with an optional leading `+`.
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// Free-text condition used for care planning and heatmap buckets.
    pub health_condition: Option<String>,
    pub special_needs: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl Member {
    /// Creates an active member with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates an active member with a caller-provided stable ID.
    pub fn with_id(uuid: MemberId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            name_en: None,
            phone: None,
            date_of_birth: None,
            health_condition: None,
            special_needs: None,
            notes: None,
            is_active: true,
        }
    }

    /// Checks field-level invariants against the given calendar day.
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), MemberValidationError> {
        if self.name.trim().is_empty() {
            return Err(MemberValidationError::BlankName);
        }
        if let Some(dob) = self.date_of_birth {
            if dob > today {
                return Err(MemberValidationError::BirthDateInFuture(dob));
            }
        }
        Ok(())
    }

    /// Whole years of age on `today`, if a birth date is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{Member, MemberValidationError};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_years_only() {
        let mut member = Member::new("Chan Tai Man");
        member.date_of_birth = Some(ymd(1940, 6, 15));
        assert_eq!(member.age_on(ymd(2024, 6, 14)), Some(83));
        assert_eq!(member.age_on(ymd(2024, 6, 15)), Some(84));
        member.date_of_birth = None;
        assert_eq!(member.age_on(ymd(2024, 6, 15)), None);
    }

    #[test]
    fn validate_rejects_blank_name_and_future_birth() {
        let today = ymd(2024, 1, 1);
        let blank = Member::new("   ");
        assert_eq!(blank.validate_on(today), Err(MemberValidationError::BlankName));

        let mut future = Member::new("Lee");
        future.date_of_birth = Some(ymd(2030, 1, 1));
        assert!(matches!(
            future.validate_on(today),
            Err(MemberValidationError::BirthDateInFuture(_))
        ));
    }
}
