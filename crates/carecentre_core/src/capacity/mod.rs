//! Respite capacity accounting.
//!
//! # Responsibility
//! - Answer how many physical respite slots remain for a date and session.
//! - Aggregate slot usage into daily, date-set, monthly and heatmap views.
//!
//! # Invariants
//! - Only approved bookings consume capacity; pending is tallied for display.
//! - A full-day booking consumes one slot in each half of its date.
//! - `remaining` saturates at zero and never exceeds the configured capacity.
//! - Every operation is read-only over the booking store.
//! - Views are zero-filled for dates without bookings.

use crate::calendar::{month_days, week_dates, InvalidMonth};
use crate::model::booking::{BookingStatus, HalfSession, SessionKind};
use crate::repo::booking_repo::{BookingQuery, BookingRepository};
use crate::repo::RepoError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod heatmap;

pub use heatmap::{condition_label, HeatmapDay, HeatmapSession, MAX_HEATMAP_DAYS};

/// Physical slots per half-session when no deployment override is given.
pub const DEFAULT_SLOTS_PER_HALF: u32 = 4;
/// Heatmap bucket for members without a recorded health condition.
pub const DEFAULT_CONDITION_LABEL: &str = "General";

pub type CapacityResult<T> = Result<T, CapacityError>;

/// Errors from capacity queries.
#[derive(Debug)]
pub enum CapacityError {
    InvalidMonth(InvalidMonth),
    /// Requested week or heatmap window leaves the supported calendar range.
    DateOutOfRange,
    /// Heatmap window spans more days than a single view may hold.
    WindowTooLarge { requested: u64, max: u32 },
    Repo(RepoError),
}

impl Display for CapacityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMonth(err) => write!(f, "{err}"),
            Self::DateOutOfRange => write!(f, "requested date window is out of range"),
            Self::WindowTooLarge { requested, max } => write!(
                f,
                "heatmap window of {requested} days exceeds the limit of {max} days"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CapacityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidMonth(err) => Some(err),
            Self::DateOutOfRange | Self::WindowTooLarge { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<InvalidMonth> for CapacityError {
    fn from(value: InvalidMonth) -> Self {
        Self::InvalidMonth(value)
    }
}

impl From<RepoError> for CapacityError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Deployment-tunable capacity settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityConfig {
    /// Physical slots per half-session per day, same for both halves.
    pub slots_per_half: u32,
    pub default_condition_label: String,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            slots_per_half: DEFAULT_SLOTS_PER_HALF,
            default_condition_label: DEFAULT_CONDITION_LABEL.to_string(),
        }
    }
}

impl CapacityConfig {
    pub fn with_slots(slots_per_half: u32) -> Self {
        Self {
            slots_per_half,
            ..Self::default()
        }
    }
}

/// Approved-slot usage of one half-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotUsage {
    pub capacity: u32,
    pub used: u32,
    pub remaining: u32,
}

impl SlotUsage {
    fn new(capacity: u32, used: u32) -> Self {
        Self {
            capacity,
            used,
            remaining: capacity.saturating_sub(used),
        }
    }
}

/// Morning and afternoon usage for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub morning: SlotUsage,
    pub afternoon: SlotUsage,
}

impl DailySummary {
    pub fn half(&self, half: HalfSession) -> &SlotUsage {
        match half {
            HalfSession::Morning => &self.morning,
            HalfSession::Afternoon => &self.afternoon,
        }
    }
}

/// Approved and pending tallies of one half-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotCounts {
    pub approved_count: u32,
    pub pending_count: u32,
    /// Capacity minus approved; pending never reduces it.
    pub remaining: u32,
    pub capacity: u32,
}

/// Morning and afternoon tallies for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    pub morning: SlotCounts,
    pub afternoon: SlotCounts,
}

impl DayCounts {
    pub fn half(&self, half: HalfSession) -> &SlotCounts {
        match half {
            HalfSession::Morning => &self.morning,
            HalfSession::Afternoon => &self.afternoon,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HalfTally {
    approved: u32,
    pending: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct DayTally {
    morning: HalfTally,
    afternoon: HalfTally,
}

impl DayTally {
    fn record(&mut self, session: SessionKind, status: BookingStatus) {
        for half in session.halves() {
            let tally = match half {
                HalfSession::Morning => &mut self.morning,
                HalfSession::Afternoon => &mut self.afternoon,
            };
            match status {
                BookingStatus::Approved => tally.approved += 1,
                BookingStatus::Pending => tally.pending += 1,
                BookingStatus::Rejected => {}
            }
        }
    }

    fn counts(&self, capacity: u32) -> DayCounts {
        let leaf = |tally: HalfTally| SlotCounts {
            approved_count: tally.approved,
            pending_count: tally.pending,
            remaining: capacity.saturating_sub(tally.approved),
            capacity,
        };
        DayCounts {
            morning: leaf(self.morning),
            afternoon: leaf(self.afternoon),
        }
    }
}

/// Read-only capacity engine over a booking store.
pub struct CapacityEngine<R: BookingRepository> {
    repo: R,
    config: CapacityConfig,
}

impl<R: BookingRepository> CapacityEngine<R> {
    pub fn new(repo: R, config: CapacityConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &CapacityConfig {
        &self.config
    }

    /// Slots still free for a new booking of `session` on `date`.
    ///
    /// Full-day needs room in both halves, so it reports the smaller half.
    pub fn remaining_slots(&self, date: NaiveDate, session: SessionKind) -> CapacityResult<u32> {
        let summary = self.daily_summary(date)?;
        let remaining = session
            .halves()
            .iter()
            .map(|half| summary.half(*half).remaining)
            .min()
            .unwrap_or(0);
        Ok(remaining)
    }

    /// Approved usage for both halves of `date`.
    pub fn daily_summary(&self, date: NaiveDate) -> CapacityResult<DailySummary> {
        let query = BookingQuery::on_date(date).with_status(BookingStatus::Approved);
        let mut tally = DayTally::default();
        for booking in self.repo.list_bookings(&query)? {
            tally.record(booking.session, booking.status);
        }

        let capacity = self.config.slots_per_half;
        Ok(DailySummary {
            morning: SlotUsage::new(capacity, tally.morning.approved),
            afternoon: SlotUsage::new(capacity, tally.afternoon.approved),
        })
    }

    /// Approved/pending tallies for an arbitrary set of dates.
    ///
    /// Dates between the extremes that are not in the set are left out.
    pub fn range_summary(
        &self,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> CapacityResult<BTreeMap<NaiveDate, DayCounts>> {
        let wanted: BTreeSet<NaiveDate> = dates.into_iter().collect();
        let (Some(first), Some(last)) = (wanted.first(), wanted.last()) else {
            return Ok(BTreeMap::new());
        };

        let mut tallies: BTreeMap<NaiveDate, DayTally> = wanted
            .iter()
            .map(|date| (*date, DayTally::default()))
            .collect();
        for booking in self
            .repo
            .list_bookings(&BookingQuery::between(*first, *last))?
        {
            if let Some(tally) = tallies.get_mut(&booking.date) {
                tally.record(booking.session, booking.status);
            }
        }

        let capacity = self.config.slots_per_half;
        Ok(tallies
            .into_iter()
            .map(|(date, tally)| (date, tally.counts(capacity)))
            .collect())
    }

    /// Tallies for Monday..Sunday of the week `week_offset` weeks from `today`.
    pub fn week_summary(
        &self,
        today: NaiveDate,
        week_offset: i64,
    ) -> CapacityResult<BTreeMap<NaiveDate, DayCounts>> {
        let dates = week_dates(today, week_offset).ok_or(CapacityError::DateOutOfRange)?;
        self.range_summary(dates)
    }

    /// Tallies for every calendar day of `year`-`month`.
    pub fn month_summary(
        &self,
        year: i32,
        month: u32,
    ) -> CapacityResult<BTreeMap<NaiveDate, DayCounts>> {
        self.range_summary(month_days(year, month)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{DayTally, SlotUsage};
    use crate::model::booking::{BookingStatus, SessionKind};

    #[test]
    fn slot_usage_saturates_when_over_booked() {
        let usage = SlotUsage::new(4, 6);
        assert_eq!(usage.remaining, 0);
        assert_eq!(usage.used, 6);
    }

    #[test]
    fn tally_spreads_full_day_and_ignores_rejected() {
        let mut tally = DayTally::default();
        tally.record(SessionKind::FullDay, BookingStatus::Approved);
        tally.record(SessionKind::Morning, BookingStatus::Pending);
        tally.record(SessionKind::Afternoon, BookingStatus::Rejected);

        let counts = tally.counts(4);
        assert_eq!(counts.morning.approved_count, 1);
        assert_eq!(counts.morning.pending_count, 1);
        assert_eq!(counts.morning.remaining, 3);
        assert_eq!(counts.afternoon.approved_count, 1);
        assert_eq!(counts.afternoon.pending_count, 0);
        assert_eq!(counts.afternoon.remaining, 3);
    }
}
