//! Calendar helpers shared by booking views.
//!
//! # Responsibility
//! - Resolve caller-supplied date strings with a silent "today" fallback.
//! - Enumerate weeks and months for weekly/monthly respite views.
//! - Lay out Monday-first month grids for calendar rendering.
//!
//! # Invariants
//! - Weeks always run Monday..Sunday.
//! - Month grids contain whole 7-cell rows, padded with `None`.

use crate::capacity::DayCounts;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DAYS_PER_WEEK: usize = 7;

/// Rejected year/month pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMonth {
    pub year: i32,
    pub month: u32,
}

impl Display for InvalidMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid calendar month {}-{:02}", self.year, self.month)
    }
}

impl Error for InvalidMonth {}

/// Parses `YYYY-MM-DD`; blank or malformed input resolves to `today`.
pub fn parse_date_or_today(input: &str, today: NaiveDate) -> NaiveDate {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").unwrap_or(today)
}

/// Monday..Sunday of the week containing `today`, shifted by `week_offset`.
///
/// Returns `None` when the shifted week leaves chrono's date range.
pub fn week_dates(today: NaiveDate, week_offset: i64) -> Option<Vec<NaiveDate>> {
    let days_from_monday = u64::from(today.weekday().num_days_from_monday());
    let this_monday = today.checked_sub_days(Days::new(days_from_monday))?;
    let shift = Days::new(week_offset.unsigned_abs().checked_mul(DAYS_PER_WEEK as u64)?);
    let monday = if week_offset >= 0 {
        this_monday.checked_add_days(shift)?
    } else {
        this_monday.checked_sub_days(shift)?
    };
    monday.checked_add_days(Days::new(DAYS_PER_WEEK as u64 - 1))?;
    Some(monday.iter_days().take(DAYS_PER_WEEK).collect())
}

/// Every date of the given month, in order.
pub fn month_days(year: i32, month: u32) -> Result<Vec<NaiveDate>, InvalidMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(InvalidMonth { year, month })?;
    Ok(first
        .iter_days()
        .take_while(|date| date.month() == month)
        .collect())
}

/// Previous and next `(year, month)` pairs, rolling over year ends.
pub fn adjacent_months(year: i32, month: u32) -> ((i32, u32), (i32, u32)) {
    let prev = if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };
    let next = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    (prev, next)
}

/// One populated cell of a month grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: u32,
    pub is_today: bool,
    /// `None` when the summary has no entry for this date.
    pub counts: Option<DayCounts>,
}

pub type CalendarWeek = [Option<CalendarCell>; DAYS_PER_WEEK];

/// Builds Monday-first week rows for a month, attaching per-day counts.
pub fn calendar_weeks(
    year: i32,
    month: u32,
    today: NaiveDate,
    summary: &BTreeMap<NaiveDate, DayCounts>,
) -> Result<Vec<CalendarWeek>, InvalidMonth> {
    let days = month_days(year, month)?;
    let lead = days
        .first()
        .map_or(0, |first| first.weekday().num_days_from_monday() as usize);

    let mut cells: Vec<Option<CalendarCell>> = vec![None; lead];
    cells.extend(days.into_iter().map(|date| {
        Some(CalendarCell {
            date,
            day: date.day(),
            is_today: date == today,
            counts: summary.get(&date).copied(),
        })
    }));
    while cells.len() % DAYS_PER_WEEK != 0 {
        cells.push(None);
    }

    Ok(cells
        .chunks(DAYS_PER_WEEK)
        .map(|chunk| std::array::from_fn(|idx| chunk[idx].clone()))
        .collect())
}
