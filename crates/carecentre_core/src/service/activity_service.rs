//! Activity sign-up and attendance use-case service.
//!
//! # Responsibility
//! - Schedule, edit and remove centre activities.
//! - Register active members and record their attendance.
//! - Assemble seat counts and attendance rosters.
//!
//! # Invariants
//! - A member holds at most one non-cancelled registration per activity.
//! - New sign-ups need an open activity with a free seat.
//! - Seat counts exclude cancelled registrations.

use crate::model::activity::{
    Activity, ActivityId, ActivityStatus, ActivityType, AttendanceStatus, Registration,
    RegistrationId,
};
use crate::model::member::MemberId;
use crate::repo::activity_repo::{ActivityQuery, ActivityRepository, RegistrationDetail};
use crate::repo::member_repo::MemberRepository;
use crate::repo::RepoError;
use crate::service::member_service::total_pages;
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ACTIVITY_PAGE_SIZE: u32 = 20;

/// Service error for activity use-cases.
#[derive(Debug)]
pub enum ActivityServiceError {
    ActivityNotFound(ActivityId),
    RegistrationNotFound(RegistrationId),
    MemberNotFound(MemberId),
    MemberInactive(MemberId),
    /// Completed or cancelled activities take no new sign-ups.
    RegistrationClosed {
        activity_id: ActivityId,
        status: ActivityStatus,
    },
    ActivityFull(ActivityId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for ActivityServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActivityNotFound(id) => write!(f, "activity not found: {id}"),
            Self::RegistrationNotFound(id) => write!(f, "registration not found: {id}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::MemberInactive(id) => write!(f, "member is inactive: {id}"),
            Self::RegistrationClosed {
                activity_id,
                status,
            } => write!(
                f,
                "activity {activity_id} is `{}` and takes no registrations",
                status.as_str()
            ),
            Self::ActivityFull(id) => write!(f, "activity has no seats left: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent activity state: {details}"),
        }
    }
}

impl Error for ActivityServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ActivityServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ActivityNotFound(id) => Self::ActivityNotFound(id),
            RepoError::RegistrationNotFound(id) => Self::RegistrationNotFound(id),
            RepoError::MemberNotFound(id) => Self::MemberNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Activity with its current seat usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    pub activity: Activity,
    pub registered_count: u32,
    pub remaining_slots: u32,
}

/// One page of the activity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityPage {
    pub items: Vec<ActivitySummary>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Registrations of one activity grouped by attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRoster {
    pub activity: Activity,
    pub registered: Vec<RegistrationDetail>,
    pub attended: Vec<RegistrationDetail>,
    pub absent: Vec<RegistrationDetail>,
    pub cancelled: Vec<RegistrationDetail>,
    pub remaining_slots: u32,
}

/// Activity service facade over activity and member repositories.
pub struct ActivityService<A: ActivityRepository, M: MemberRepository> {
    activities: A,
    members: M,
}

impl<A: ActivityRepository, M: MemberRepository> ActivityService<A, M> {
    pub fn new(activities: A, members: M) -> Self {
        Self {
            activities,
            members,
        }
    }

    pub fn create_activity(&self, activity: Activity) -> Result<Activity, ActivityServiceError> {
        let activity = normalize_activity(activity);
        let id = self.activities.create_activity(&activity)?;
        info!(
            "event=activity_create module=activity status=ok activity_id={id} activity_type={}",
            activity.activity_type.as_str()
        );
        self.activities
            .get_activity(id)?
            .ok_or(ActivityServiceError::InconsistentState(
                "created activity not found in read-back",
            ))
    }

    /// Replaces all editable fields of an existing activity.
    pub fn update_activity(&self, activity: Activity) -> Result<Activity, ActivityServiceError> {
        let activity = normalize_activity(activity);
        self.activities.update_activity(&activity)?;
        info!(
            "event=activity_update module=activity status=ok activity_id={} activity_status={}",
            activity.uuid,
            activity.status.as_str()
        );
        self.activities
            .get_activity(activity.uuid)?
            .ok_or(ActivityServiceError::InconsistentState(
                "updated activity not found in read-back",
            ))
    }

    pub fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>, ActivityServiceError> {
        Ok(self.activities.get_activity(id)?)
    }

    pub fn delete_activity(&self, id: ActivityId) -> Result<(), ActivityServiceError> {
        self.activities.delete_activity(id)?;
        info!("event=activity_delete module=activity status=ok activity_id={id}");
        Ok(())
    }

    /// Lists activities newest start first, 20 per page. `None` filters match all.
    pub fn list_activities(
        &self,
        activity_type: Option<ActivityType>,
        status: Option<ActivityStatus>,
        page: u32,
    ) -> Result<ActivityPage, ActivityServiceError> {
        let page = page.max(1);
        let mut query = ActivityQuery {
            activity_type,
            status,
            ..ActivityQuery::default()
        };
        let total = self.activities.count_activities(&query)?;
        query.limit = Some(ACTIVITY_PAGE_SIZE);
        query.offset = (page - 1).saturating_mul(ACTIVITY_PAGE_SIZE);
        let items = self.summarize(self.activities.list_activities(&query)?)?;

        Ok(ActivityPage {
            items,
            total,
            page,
            total_pages: total_pages(total, ACTIVITY_PAGE_SIZE),
        })
    }

    /// Activities starting on `date`, earliest first.
    pub fn activities_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<ActivitySummary>, ActivityServiceError> {
        self.summarize(self.activities.list_activities(&ActivityQuery::on_date(date))?)
    }

    /// Seats still free on an activity.
    pub fn remaining_slots(&self, id: ActivityId) -> Result<u32, ActivityServiceError> {
        let activity = self.require_activity(id)?;
        let seated = self.activities.count_seated(id)?;
        Ok(activity.remaining_slots(seated))
    }

    /// Signs a member up for an activity.
    ///
    /// Registering an already-registered member returns the open registration.
    pub fn register_member(
        &self,
        activity_id: ActivityId,
        member_id: MemberId,
    ) -> Result<Registration, ActivityServiceError> {
        let activity = self.require_activity(activity_id)?;
        self.ensure_active_member(member_id)?;

        if let Some(existing) = self
            .activities
            .find_open_registration(activity_id, member_id)?
        {
            return Ok(existing);
        }
        if !activity.status.accepts_registrations() {
            return Err(ActivityServiceError::RegistrationClosed {
                activity_id,
                status: activity.status,
            });
        }
        self.ensure_seat(&activity)?;

        let registration = Registration::new(activity_id, member_id);
        self.activities.create_registration(&registration)?;
        info!(
            "event=activity_register module=activity status=ok activity_id={activity_id} registration_id={}",
            registration.uuid
        );
        Ok(registration)
    }

    /// Records attendance and staff feedback for one registration.
    ///
    /// Reviving a cancelled registration needs a free seat.
    pub fn mark_attendance(
        &self,
        id: RegistrationId,
        attendance: AttendanceStatus,
        feedback: &str,
    ) -> Result<Registration, ActivityServiceError> {
        let existing = self.require_registration(id)?;
        if !existing.attendance.holds_seat() && attendance.holds_seat() {
            let activity = self.require_activity(existing.activity_id)?;
            self.ensure_seat(&activity)?;
        }

        self.activities
            .set_attendance(id, attendance, feedback.trim())?;
        info!(
            "event=activity_attendance module=activity status=ok registration_id={id} attendance={}",
            attendance.as_str()
        );
        self.require_registration(id)
    }

    /// Registrations grouped by attendance, in sign-up order.
    pub fn attendance_roster(
        &self,
        id: ActivityId,
    ) -> Result<AttendanceRoster, ActivityServiceError> {
        let activity = self.require_activity(id)?;
        let mut roster = AttendanceRoster {
            remaining_slots: activity.capacity,
            activity,
            registered: Vec::new(),
            attended: Vec::new(),
            absent: Vec::new(),
            cancelled: Vec::new(),
        };

        let mut seated = 0u32;
        for detail in self.activities.list_registration_details(id)? {
            if detail.registration.attendance.holds_seat() {
                seated = seated.saturating_add(1);
            }
            match detail.registration.attendance {
                AttendanceStatus::Registered => roster.registered.push(detail),
                AttendanceStatus::Attended => roster.attended.push(detail),
                AttendanceStatus::Absent => roster.absent.push(detail),
                AttendanceStatus::Cancelled => roster.cancelled.push(detail),
            }
        }
        roster.remaining_slots = roster.activity.remaining_slots(seated);
        Ok(roster)
    }

    fn summarize(
        &self,
        activities: Vec<Activity>,
    ) -> Result<Vec<ActivitySummary>, ActivityServiceError> {
        activities
            .into_iter()
            .map(|activity| -> Result<ActivitySummary, ActivityServiceError> {
                let registered_count = self.activities.count_seated(activity.uuid)?;
                Ok(ActivitySummary {
                    remaining_slots: activity.remaining_slots(registered_count),
                    registered_count,
                    activity,
                })
            })
            .collect()
    }

    fn ensure_seat(&self, activity: &Activity) -> Result<(), ActivityServiceError> {
        let seated = self.activities.count_seated(activity.uuid)?;
        if activity.remaining_slots(seated) == 0 {
            warn!(
                "event=activity_capacity_check module=activity status=rejected activity_id={} seated={seated} capacity={}",
                activity.uuid, activity.capacity
            );
            return Err(ActivityServiceError::ActivityFull(activity.uuid));
        }
        Ok(())
    }

    fn require_activity(&self, id: ActivityId) -> Result<Activity, ActivityServiceError> {
        self.activities
            .get_activity(id)?
            .ok_or(ActivityServiceError::ActivityNotFound(id))
    }

    fn require_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Registration, ActivityServiceError> {
        self.activities
            .get_registration(id)?
            .ok_or(ActivityServiceError::RegistrationNotFound(id))
    }

    fn ensure_active_member(&self, id: MemberId) -> Result<(), ActivityServiceError> {
        let member = self
            .members
            .get_member(id)?
            .ok_or(ActivityServiceError::MemberNotFound(id))?;
        if !member.is_active {
            return Err(ActivityServiceError::MemberInactive(id));
        }
        Ok(())
    }
}

fn normalize_activity(mut activity: Activity) -> Activity {
    activity.name = activity.name.trim().to_string();
    activity.description = activity.description.trim().to_string();
    activity.location = activity.location.trim().to_string();
    activity
}
