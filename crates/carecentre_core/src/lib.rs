//! Core domain logic for the care centre registry, activities and respite scheduling.
//! This crate is the single source of truth for booking and capacity invariants.

pub mod calendar;
pub mod capacity;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use calendar::{
    adjacent_months, calendar_weeks, month_days, parse_date_or_today, week_dates, CalendarCell,
    CalendarWeek, InvalidMonth,
};
pub use capacity::{
    condition_label, CapacityConfig, CapacityEngine, CapacityError, CapacityResult, DailySummary,
    DayCounts, HeatmapDay, HeatmapSession, SlotCounts, SlotUsage, DEFAULT_CONDITION_LABEL,
    DEFAULT_SLOTS_PER_HALF, MAX_HEATMAP_DAYS,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::activity::{
    Activity, ActivityId, ActivityStatus, ActivityType, ActivityValidationError,
    AttendanceStatus, Registration, RegistrationId, DEFAULT_ACTIVITY_CAPACITY,
};
pub use model::booking::{Booking, BookingId, BookingStatus, HalfSession, SessionKind};
pub use model::member::{Member, MemberId, MemberValidationError};
pub use repo::activity_repo::{
    ActivityQuery, ActivityRepository, RegistrationDetail, SqliteActivityRepository,
};
pub use repo::booking_repo::{
    BookingDetail, BookingQuery, BookingRepository, SqliteBookingRepository,
};
pub use repo::member_repo::{
    MemberListQuery, MemberRepository, MemberStatusFilter, SqliteMemberRepository,
};
pub use repo::{RepoError, RepoResult};
pub use service::activity_service::{
    ActivityPage, ActivityService, ActivityServiceError, ActivitySummary, AttendanceRoster,
};
pub use service::booking_service::{
    BookingPage, BookingService, BookingServiceError, DayDetail, NewBooking,
};
pub use service::dashboard_service::{DashboardCounts, DashboardService};
pub use service::member_service::{normalize_phone, MemberPage, MemberService, MemberServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
