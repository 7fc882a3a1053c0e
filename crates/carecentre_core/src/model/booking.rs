//! Respite booking domain model.
//!
//! # Responsibility
//! - Define the canonical respite booking record.
//! - Describe which half-sessions a booking occupies.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another booking.
//! - A full-day booking occupies exactly one morning and one afternoon slot.
//! - Only `BookingStatus::Approved` occupies physical capacity.

use super::member::MemberId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a respite booking.
pub type BookingId = Uuid;

/// Booking unit requested by a family or caseworker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Morning,
    Afternoon,
    /// Spans both halves of the day.
    FullDay,
}

/// One half of a care day. Capacity is accounted per half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalfSession {
    Morning,
    Afternoon,
}

/// Review state of a booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Awaiting staff review. Shown on calendars but holds no slot.
    Pending,
    /// Confirmed. Holds one slot per covered half.
    Approved,
    Rejected,
}

impl SessionKind {
    pub const ALL: [SessionKind; 3] = [Self::Morning, Self::Afternoon, Self::FullDay];

    /// Half-sessions occupied by a booking of this kind.
    pub fn halves(self) -> &'static [HalfSession] {
        match self {
            Self::Morning => &[HalfSession::Morning],
            Self::Afternoon => &[HalfSession::Afternoon],
            Self::FullDay => &[HalfSession::Morning, HalfSession::Afternoon],
        }
    }

    /// Returns whether this kind occupies the given half.
    pub fn covers(self, half: HalfSession) -> bool {
        self.halves().contains(&half)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::FullDay => "full_day",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "morning" => Some(Self::Morning),
            "afternoon" => Some(Self::Afternoon),
            "full_day" => Some(Self::FullDay),
            _ => None,
        }
    }
}

impl HalfSession {
    pub const BOTH: [HalfSession; 2] = [Self::Morning, Self::Afternoon];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
        }
    }

    /// Parses a half name, treating anything but `afternoon` as morning.
    pub fn parse_or_morning(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("afternoon") {
            Self::Afternoon
        } else {
            Self::Morning
        }
    }
}

impl From<HalfSession> for SessionKind {
    fn from(value: HalfSession) -> Self {
        match value {
            HalfSession::Morning => Self::Morning,
            HalfSession::Afternoon => Self::Afternoon,
        }
    }
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether a booking in this state holds physical capacity.
    pub fn holds_slot(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Canonical respite day-care booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub uuid: BookingId,
    pub member_id: MemberId,
    /// Care day, local calendar date.
    pub date: NaiveDate,
    pub session: SessionKind,
    pub status: BookingStatus,
    /// Free-text staff notes. Empty when none.
    pub notes: String,
}

impl Booking {
    /// Creates a pending booking with a generated stable ID.
    pub fn new(member_id: MemberId, date: NaiveDate, session: SessionKind) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            member_id,
            date,
            session,
            status: BookingStatus::Pending,
            notes: String::new(),
        }
    }

    /// Returns whether this booking currently holds a slot in `half`.
    pub fn occupies(&self, half: HalfSession) -> bool {
        self.status.holds_slot() && self.session.covers(half)
    }
}

#[cfg(test)]
mod tests {
    use super::{Booking, BookingStatus, HalfSession, SessionKind};
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn full_day_covers_both_halves() {
        assert!(SessionKind::FullDay.covers(HalfSession::Morning));
        assert!(SessionKind::FullDay.covers(HalfSession::Afternoon));
        assert!(!SessionKind::Morning.covers(HalfSession::Afternoon));
        assert!(!SessionKind::Afternoon.covers(HalfSession::Morning));
    }

    #[test]
    fn only_approved_bookings_occupy_slots() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut booking = Booking::new(Uuid::new_v4(), date, SessionKind::Morning);
        assert!(!booking.occupies(HalfSession::Morning));

        booking.status = BookingStatus::Approved;
        assert!(booking.occupies(HalfSession::Morning));
        assert!(!booking.occupies(HalfSession::Afternoon));

        booking.status = BookingStatus::Rejected;
        assert!(!booking.occupies(HalfSession::Morning));
    }

    #[test]
    fn db_names_parse_back() {
        for kind in SessionKind::ALL {
            assert_eq!(SessionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BookingStatus::parse("approved"), Some(BookingStatus::Approved));
        assert_eq!(BookingStatus::parse("APPROVED"), None);
    }

    #[test]
    fn half_parse_defaults_to_morning() {
        assert_eq!(HalfSession::parse_or_morning("Afternoon"), HalfSession::Afternoon);
        assert_eq!(HalfSession::parse_or_morning("evening"), HalfSession::Morning);
    }
}
