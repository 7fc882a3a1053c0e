//! Respite booking use-case service.
//!
//! # Responsibility
//! - Create, review and edit respite bookings for registered members.
//! - Gate approvals behind the capacity engine.
//! - Assemble paged lists and half-session rosters.
//!
//! # Invariants
//! - New bookings require an existing, active member.
//! - A booking only becomes approved while every covered half has room.
//! - The capacity check and the write are not atomic; two concurrent
//!   approvals can both observe the last free slot.

use crate::capacity::{CapacityConfig, CapacityEngine, CapacityError};
use crate::model::booking::{Booking, BookingId, BookingStatus, HalfSession, SessionKind};
use crate::model::member::MemberId;
use crate::repo::booking_repo::{BookingDetail, BookingQuery, BookingRepository};
use crate::repo::member_repo::MemberRepository;
use crate::repo::RepoError;
use crate::service::member_service::total_pages;
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const BOOKING_PAGE_SIZE: u32 = 20;

/// Service error for booking use-cases.
#[derive(Debug)]
pub enum BookingServiceError {
    MemberNotFound(MemberId),
    MemberInactive(MemberId),
    BookingNotFound(BookingId),
    /// A covered half-session has no approved slot left.
    SessionFull {
        date: NaiveDate,
        session: SessionKind,
    },
    Capacity(CapacityError),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for BookingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::MemberInactive(id) => write!(f, "member is inactive: {id}"),
            Self::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            Self::SessionFull { date, session } => write!(
                f,
                "no respite capacity left on {date} for session `{}`",
                session.as_str()
            ),
            Self::Capacity(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent booking state: {details}"),
        }
    }
}

impl Error for BookingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Capacity(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BookingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::BookingNotFound(id) => Self::BookingNotFound(id),
            RepoError::MemberNotFound(id) => Self::MemberNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<CapacityError> for BookingServiceError {
    fn from(value: CapacityError) -> Self {
        match value {
            CapacityError::Repo(err) => err.into(),
            other => Self::Capacity(other),
        }
    }
}

/// Booking request as submitted by staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub member_id: MemberId,
    pub date: NaiveDate,
    pub session: SessionKind,
    /// Usually `Pending`; staff may record a pre-approved booking directly.
    pub status: BookingStatus,
    pub notes: String,
}

impl NewBooking {
    pub fn pending(member_id: MemberId, date: NaiveDate, session: SessionKind) -> Self {
        Self {
            member_id,
            date,
            session,
            status: BookingStatus::Pending,
            notes: String::new(),
        }
    }

    pub fn approved(member_id: MemberId, date: NaiveDate, session: SessionKind) -> Self {
        Self {
            status: BookingStatus::Approved,
            ..Self::pending(member_id, date, session)
        }
    }
}

/// One page of the booking list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingPage {
    pub items: Vec<BookingDetail>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Roster of one half-session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayDetail {
    pub date: NaiveDate,
    pub half: HalfSession,
    pub approved: Vec<BookingDetail>,
    pub pending: Vec<BookingDetail>,
    pub remaining: u32,
    pub capacity: u32,
}

/// Booking service facade over booking and member repositories.
pub struct BookingService<B: BookingRepository, M: MemberRepository> {
    bookings: B,
    members: M,
    capacity: CapacityConfig,
}

impl<B: BookingRepository, M: MemberRepository> BookingService<B, M> {
    pub fn new(bookings: B, members: M, capacity: CapacityConfig) -> Self {
        Self {
            bookings,
            members,
            capacity,
        }
    }

    /// Capacity engine sharing this service's booking store.
    pub fn capacity(&self) -> CapacityEngine<&B> {
        CapacityEngine::new(&self.bookings, self.capacity.clone())
    }

    /// Records a booking request for an active member.
    ///
    /// Pending requests are always accepted. Pre-approved requests must fit.
    pub fn request_booking(&self, request: &NewBooking) -> Result<Booking, BookingServiceError> {
        self.ensure_active_member(request.member_id)?;
        if request.status.holds_slot() {
            self.ensure_room(request.date, request.session, None)?;
        }

        let booking = Booking {
            uuid: Uuid::new_v4(),
            member_id: request.member_id,
            date: request.date,
            session: request.session,
            status: request.status,
            notes: request.notes.trim().to_string(),
        };
        self.bookings.create_booking(&booking)?;
        info!(
            "event=booking_create module=booking status=ok booking_id={} date={} session={} booking_status={}",
            booking.uuid,
            booking.date,
            booking.session.as_str(),
            booking.status.as_str()
        );
        Ok(booking)
    }

    /// Approves a booking when its halves still have room.
    ///
    /// Approving an approved booking is a no-op.
    pub fn approve_booking(&self, id: BookingId) -> Result<Booking, BookingServiceError> {
        let booking = self.require_booking(id)?;
        if booking.status == BookingStatus::Approved {
            return Ok(booking);
        }
        self.ensure_room(booking.date, booking.session, None)?;
        self.set_status(id, BookingStatus::Approved)
    }

    pub fn reject_booking(&self, id: BookingId) -> Result<Booking, BookingServiceError> {
        self.set_status(id, BookingStatus::Rejected)
    }

    /// Replaces an existing booking, re-checking capacity when it ends up approved.
    pub fn update_booking(&self, booking: &Booking) -> Result<Booking, BookingServiceError> {
        let existing = self.require_booking(booking.uuid)?;
        if existing.member_id != booking.member_id {
            self.ensure_active_member(booking.member_id)?;
        }
        if booking.status.holds_slot() {
            self.ensure_room(booking.date, booking.session, Some(&existing))?;
        }

        self.bookings.update_booking(booking)?;
        info!(
            "event=booking_update module=booking status=ok booking_id={} booking_status={}",
            booking.uuid,
            booking.status.as_str()
        );
        self.bookings
            .get_booking(booking.uuid)?
            .ok_or(BookingServiceError::InconsistentState(
                "updated booking not found in read-back",
            ))
    }

    pub fn delete_booking(&self, id: BookingId) -> Result<(), BookingServiceError> {
        self.bookings.delete_booking(id)?;
        info!("event=booking_delete module=booking status=ok booking_id={id}");
        Ok(())
    }

    pub fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, BookingServiceError> {
        Ok(self.bookings.get_booking(id)?)
    }

    /// Lists bookings newest date first, 20 per page.
    pub fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        page: u32,
    ) -> Result<BookingPage, BookingServiceError> {
        let page = page.max(1);
        let mut query = BookingQuery {
            status,
            ..BookingQuery::default()
        };
        let total = self.bookings.count_bookings(&query)?;
        query.limit = Some(BOOKING_PAGE_SIZE);
        query.offset = (page - 1).saturating_mul(BOOKING_PAGE_SIZE);
        let items = self.bookings.list_booking_details(&query)?;

        Ok(BookingPage {
            items,
            total,
            page,
            total_pages: total_pages(total, BOOKING_PAGE_SIZE),
        })
    }

    /// Approved and pending roster for one half of `date`.
    pub fn day_detail(
        &self,
        date: NaiveDate,
        half: HalfSession,
    ) -> Result<DayDetail, BookingServiceError> {
        let (approved, pending): (Vec<_>, Vec<_>) = self
            .bookings
            .list_booking_details(&BookingQuery::on_date(date))?
            .into_iter()
            .filter(|detail| detail.booking.session.covers(half))
            .filter(|detail| detail.booking.status != BookingStatus::Rejected)
            .partition(|detail| detail.booking.status == BookingStatus::Approved);

        let capacity = self.capacity.slots_per_half;
        let used = u32::try_from(approved.len()).unwrap_or(u32::MAX);
        Ok(DayDetail {
            date,
            half,
            approved,
            pending,
            remaining: capacity.saturating_sub(used),
            capacity,
        })
    }

    fn set_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, BookingServiceError> {
        self.bookings.set_booking_status(id, status)?;
        info!(
            "event=booking_review module=booking status=ok booking_id={id} booking_status={}",
            status.as_str()
        );
        self.require_booking(id)
    }

    fn require_booking(&self, id: BookingId) -> Result<Booking, BookingServiceError> {
        self.bookings
            .get_booking(id)?
            .ok_or(BookingServiceError::BookingNotFound(id))
    }

    fn ensure_active_member(&self, id: MemberId) -> Result<(), BookingServiceError> {
        let member = self
            .members
            .get_member(id)?
            .ok_or(BookingServiceError::MemberNotFound(id))?;
        if !member.is_active {
            return Err(BookingServiceError::MemberInactive(id));
        }
        Ok(())
    }

    /// Checks every half covered by `session`, not counting `replacing`'s own slot.
    fn ensure_room(
        &self,
        date: NaiveDate,
        session: SessionKind,
        replacing: Option<&Booking>,
    ) -> Result<(), BookingServiceError> {
        let summary = self.capacity().daily_summary(date)?;
        for half in session.halves() {
            let usage = summary.half(*half);
            let own_slot = replacing
                .filter(|existing| existing.date == date && existing.occupies(*half))
                .map_or(0, |_| 1);
            if usage.used.saturating_sub(own_slot) >= usage.capacity {
                warn!(
                    "event=capacity_check module=booking status=rejected date={date} half={} used={} capacity={}",
                    half.as_str(),
                    usage.used,
                    usage.capacity
                );
                return Err(BookingServiceError::SessionFull { date, session });
            }
        }
        Ok(())
    }
}
