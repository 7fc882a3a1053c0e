//! Centre activity and sign-up domain model.
//!
//! # Responsibility
//! - Define scheduled activities (classes, talks, social events).
//! - Define member registrations and their attendance state.
//!
//! # Invariants
//! - Every registration references exactly one activity and one member.
//! - Cancelled registrations never hold a seat.
//! - `ends_at`, when set, is not earlier than `starts_at`.

use super::member::MemberId;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ActivityId = Uuid;
pub type RegistrationId = Uuid;

/// Seats offered when staff do not set a capacity.
pub const DEFAULT_ACTIVITY_CAPACITY: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    InterestClass,
    HealthTalk,
    SocialEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

/// Attendance state of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Signed up, not yet marked.
    Registered,
    Attended,
    Absent,
    /// Withdrawn. Frees the seat.
    Cancelled,
}

impl ActivityType {
    pub const ALL: [ActivityType; 3] = [Self::InterestClass, Self::HealthTalk, Self::SocialEvent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InterestClass => "interest_class",
            Self::HealthTalk => "health_talk",
            Self::SocialEvent => "social_event",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "interest_class" => Some(Self::InterestClass),
            "health_talk" => Some(Self::HealthTalk),
            "social_event" => Some(Self::SocialEvent),
            _ => None,
        }
    }
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upcoming" => Some(Self::Upcoming),
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether members may still sign up.
    pub fn accepts_registrations(self) -> bool {
        matches!(self, Self::Upcoming | Self::Ongoing)
    }
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        Self::Registered,
        Self::Attended,
        Self::Absent,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Attended => "attended",
            Self::Absent => "absent",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(Self::Registered),
            "attended" => Some(Self::Attended),
            "absent" => Some(Self::Absent),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether a registration in this state counts against capacity.
    pub fn holds_seat(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Validation failures for activity writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityValidationError {
    BlankName,
    EndsBeforeStart {
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    },
}

impl Display for ActivityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "activity name must not be blank"),
            Self::EndsBeforeStart { starts_at, ends_at } => {
                write!(f, "activity ends at {ends_at} before it starts at {starts_at}")
            }
        }
    }
}

impl Error for ActivityValidationError {}

/// Scheduled centre activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub uuid: ActivityId,
    pub name: String,
    pub activity_type: ActivityType,
    pub description: String,
    /// Local wall-clock start.
    pub starts_at: NaiveDateTime,
    pub ends_at: Option<NaiveDateTime>,
    pub location: String,
    /// Seats available to non-cancelled registrations.
    pub capacity: u32,
    /// Fee in cents; 0 for free events.
    pub fee_cents: u32,
    pub status: ActivityStatus,
}

impl Activity {
    /// Creates an upcoming activity with default capacity and no fee.
    pub fn new(
        name: impl Into<String>,
        activity_type: ActivityType,
        starts_at: NaiveDateTime,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            activity_type,
            description: String::new(),
            starts_at,
            ends_at: None,
            location: String::new(),
            capacity: DEFAULT_ACTIVITY_CAPACITY,
            fee_cents: 0,
            status: ActivityStatus::Upcoming,
        }
    }

    pub fn validate(&self) -> Result<(), ActivityValidationError> {
        if self.name.trim().is_empty() {
            return Err(ActivityValidationError::BlankName);
        }
        if let Some(ends_at) = self.ends_at {
            if ends_at < self.starts_at {
                return Err(ActivityValidationError::EndsBeforeStart {
                    starts_at: self.starts_at,
                    ends_at,
                });
            }
        }
        Ok(())
    }

    /// Seats left given the number of seat-holding registrations.
    pub fn remaining_slots(&self, seated: u32) -> u32 {
        self.capacity.saturating_sub(seated)
    }
}

/// A member's sign-up for one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub uuid: RegistrationId,
    pub activity_id: ActivityId,
    pub member_id: MemberId,
    pub registered_at: NaiveDateTime,
    pub attendance: AttendanceStatus,
    /// Staff feedback recorded with attendance. Empty when none.
    pub feedback: String,
}

impl Registration {
    /// New sign-up stamped with the local time, second precision.
    pub fn new(activity_id: ActivityId, member_id: MemberId) -> Self {
        let now = Local::now().naive_local();
        Self {
            uuid: Uuid::new_v4(),
            activity_id,
            member_id,
            registered_at: now.with_nanosecond(0).unwrap_or(now),
            attendance: AttendanceStatus::Registered,
            feedback: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Activity, ActivityStatus, ActivityType, ActivityValidationError, AttendanceStatus,
        DEFAULT_ACTIVITY_CAPACITY,
    };
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_activity_is_upcoming_with_default_capacity() {
        let activity = Activity::new("Tai chi", ActivityType::InterestClass, at(3, 10));
        assert_eq!(activity.status, ActivityStatus::Upcoming);
        assert_eq!(activity.capacity, DEFAULT_ACTIVITY_CAPACITY);
        assert_eq!(activity.remaining_slots(5), 15);
        assert_eq!(activity.remaining_slots(25), 0);
    }

    #[test]
    fn validation_rejects_blank_name_and_inverted_times() {
        let mut activity = Activity::new(" ", ActivityType::HealthTalk, at(3, 10));
        assert_eq!(activity.validate(), Err(ActivityValidationError::BlankName));

        activity.name = "Diabetes talk".to_string();
        activity.ends_at = Some(at(3, 9));
        assert!(matches!(
            activity.validate(),
            Err(ActivityValidationError::EndsBeforeStart { .. })
        ));

        activity.ends_at = Some(at(3, 11));
        assert!(activity.validate().is_ok());
    }

    #[test]
    fn only_cancelled_attendance_frees_a_seat() {
        for status in AttendanceStatus::ALL {
            assert_eq!(status.holds_seat(), status != AttendanceStatus::Cancelled);
            assert_eq!(AttendanceStatus::parse(status.as_str()), Some(status));
        }
        assert!(!ActivityStatus::Completed.accepts_registrations());
        assert!(ActivityStatus::Ongoing.accepts_registrations());
        assert_eq!(ActivityType::parse("bingo"), None);
    }
}
