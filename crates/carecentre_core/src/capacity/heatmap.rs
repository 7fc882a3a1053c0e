//! Rolling utilization heatmap around a reference day.
//!
//! # Invariants
//! - One entry per calendar day in `today - past ..= today + future`.
//! - A window never holds more than `MAX_HEATMAP_DAYS` entries.
//! - Condition buckets count approved bookings only.
//! - Utilization is not clamped, so over-booked halves report above 100.

use super::{CapacityEngine, CapacityError, CapacityResult};
use crate::model::booking::{BookingStatus, HalfSession};
use crate::repo::booking_repo::{BookingQuery, BookingRepository};
use chrono::{Days, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Upper bound on days in one heatmap, today included.
pub const MAX_HEATMAP_DAYS: u32 = 731;

const CONDITION_LABEL_MAX_CHARS: usize = 15;
const CONDITION_LABEL_KEEP_CHARS: usize = 12;

/// Utilization of one half-session in the heatmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapSession {
    pub capacity: u32,
    pub used: u32,
    /// Rounded percentage of capacity in use.
    pub utilization: u32,
    /// Approved bookings per health-condition label.
    pub conditions: BTreeMap<String, u32>,
}

impl HeatmapSession {
    fn empty(capacity: u32) -> Self {
        Self {
            capacity,
            used: 0,
            utilization: 0,
            conditions: BTreeMap::new(),
        }
    }

    fn add(&mut self, label: &str) {
        self.used += 1;
        self.utilization = utilization_percent(self.used, self.capacity);
        *self.conditions.entry(label.to_string()).or_insert(0) += 1;
    }
}

/// One heatmap column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    /// `YYYY-MM-DD`.
    pub date_str: String,
    /// `MM/DD`.
    pub display: String,
    pub is_today: bool,
    pub morning: HeatmapSession,
    pub afternoon: HeatmapSession,
}

impl HeatmapDay {
    pub fn half(&self, half: HalfSession) -> &HeatmapSession {
        match half {
            HalfSession::Morning => &self.morning,
            HalfSession::Afternoon => &self.afternoon,
        }
    }

    fn half_mut(&mut self, half: HalfSession) -> &mut HeatmapSession {
        match half {
            HalfSession::Morning => &mut self.morning,
            HalfSession::Afternoon => &mut self.afternoon,
        }
    }
}

impl<R: BookingRepository> CapacityEngine<R> {
    /// Heatmap centred on the local current date.
    pub fn heatmap(&self, past_days: u32, future_days: u32) -> CapacityResult<Vec<HeatmapDay>> {
        self.heatmap_around(Local::now().date_naive(), past_days, future_days)
    }

    /// Heatmap over `today - past_days ..= today + future_days`.
    pub fn heatmap_around(
        &self,
        today: NaiveDate,
        past_days: u32,
        future_days: u32,
    ) -> CapacityResult<Vec<HeatmapDay>> {
        let requested = u64::from(past_days) + u64::from(future_days) + 1;
        if requested > u64::from(MAX_HEATMAP_DAYS) {
            return Err(CapacityError::WindowTooLarge {
                requested,
                max: MAX_HEATMAP_DAYS,
            });
        }
        let start = today
            .checked_sub_days(Days::new(u64::from(past_days)))
            .ok_or(CapacityError::DateOutOfRange)?;
        let end = today
            .checked_add_days(Days::new(u64::from(future_days)))
            .ok_or(CapacityError::DateOutOfRange)?;

        let capacity = self.config.slots_per_half;
        let mut days: BTreeMap<NaiveDate, HeatmapDay> = start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| {
                let day = HeatmapDay {
                    date,
                    date_str: date.format("%Y-%m-%d").to_string(),
                    display: date.format("%m/%d").to_string(),
                    is_today: date == today,
                    morning: HeatmapSession::empty(capacity),
                    afternoon: HeatmapSession::empty(capacity),
                };
                (date, day)
            })
            .collect();

        let query = BookingQuery::between(start, end).with_status(BookingStatus::Approved);
        for detail in self.repo.list_booking_details(&query)? {
            let Some(day) = days.get_mut(&detail.booking.date) else {
                continue;
            };
            let label = condition_label(
                detail.health_condition.as_deref(),
                &self.config.default_condition_label,
            );
            for half in detail.booking.session.halves() {
                day.half_mut(*half).add(&label);
            }
        }

        Ok(days.into_values().collect())
    }
}

/// Normalizes a free-text health condition into a heatmap bucket label.
///
/// Blank or missing values use `default_label`; values longer than 15
/// characters keep their first 12 followed by `...`.
pub fn condition_label(raw: Option<&str>, default_label: &str) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return default_label.to_string();
    }
    if trimmed.chars().count() > CONDITION_LABEL_MAX_CHARS {
        let mut label: String = trimmed.chars().take(CONDITION_LABEL_KEEP_CHARS).collect();
        label.push_str("...");
        return label;
    }
    trimmed.to_string()
}

fn utilization_percent(used: u32, capacity: u32) -> u32 {
    if capacity == 0 {
        return 0;
    }
    let used = u64::from(used);
    let capacity = u64::from(capacity);
    // Half-up rounding of used / capacity * 100.
    let percent = (used * 200 + capacity) / (capacity * 2);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{condition_label, utilization_percent};

    #[test]
    fn blank_conditions_use_default_label() {
        assert_eq!(condition_label(None, "General"), "General");
        assert_eq!(condition_label(Some("   "), "General"), "General");
        assert_eq!(condition_label(Some(" Dementia "), "General"), "Dementia");
    }

    #[test]
    fn long_conditions_are_truncated_by_character() {
        assert_eq!(
            condition_label(Some("Parkinson's disease"), "General"),
            "Parkinson's ..."
        );
        // Exactly 15 characters stays intact.
        assert_eq!(
            condition_label(Some("Hypertension II"), "General"),
            "Hypertension II"
        );
        let cjk = "高血壓及糖尿病併發症需定時服藥及監察";
        let label = condition_label(Some(cjk), "General");
        assert_eq!(label.chars().count(), 15);
        assert!(label.starts_with("高血壓及糖尿病併發症需定"));
        assert!(label.ends_with("..."));
    }

    #[test]
    fn utilization_rounds_and_handles_zero_capacity() {
        assert_eq!(utilization_percent(0, 4), 0);
        assert_eq!(utilization_percent(1, 4), 25);
        assert_eq!(utilization_percent(1, 3), 33);
        assert_eq!(utilization_percent(2, 3), 67);
        assert_eq!(utilization_percent(5, 4), 125);
        assert_eq!(utilization_percent(3, 0), 0);
    }
}
