//! Front-page KPIs across members, respite bookings and activities.
//!
//! # Invariants
//! - "Today" counts always use the caller-supplied date.
//! - Pending respite requests are counted regardless of date.

use crate::model::booking::BookingStatus;
use crate::repo::activity_repo::{ActivityQuery, ActivityRepository};
use crate::repo::booking_repo::{BookingQuery, BookingRepository};
use crate::repo::member_repo::{MemberListQuery, MemberRepository, MemberStatusFilter};
use crate::repo::RepoResult;
use chrono::NaiveDate;
use serde::Serialize;

/// Dashboard KPI tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub active_members: u64,
    pub today_activities: u64,
    pub approved_today: u64,
    pub pending_total: u64,
}

/// Read-only dashboard facade over the three stores.
pub struct DashboardService<B, M, A>
where
    B: BookingRepository,
    M: MemberRepository,
    A: ActivityRepository,
{
    bookings: B,
    members: M,
    activities: A,
}

impl<B, M, A> DashboardService<B, M, A>
where
    B: BookingRepository,
    M: MemberRepository,
    A: ActivityRepository,
{
    pub fn new(bookings: B, members: M, activities: A) -> Self {
        Self {
            bookings,
            members,
            activities,
        }
    }

    pub fn counts(&self, today: NaiveDate) -> RepoResult<DashboardCounts> {
        let active_members = self.members.count_members(&MemberListQuery {
            status: MemberStatusFilter::Active,
            ..MemberListQuery::default()
        })?;
        let today_activities = self
            .activities
            .count_activities(&ActivityQuery::on_date(today))?;
        let approved_today = self
            .bookings
            .count_bookings(&BookingQuery::on_date(today).with_status(BookingStatus::Approved))?;
        let pending_total = self.bookings.count_bookings(&BookingQuery {
            status: Some(BookingStatus::Pending),
            ..BookingQuery::default()
        })?;

        Ok(DashboardCounts {
            active_members,
            today_activities,
            approved_today,
            pending_total,
        })
    }
}
