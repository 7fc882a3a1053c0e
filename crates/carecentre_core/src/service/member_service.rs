//! Member registry use-case service.
//!
//! # Responsibility
//! - Normalize member input (phone digits, blank optional text).
//! - Provide paged search with `all|active|inactive` filtering.
//!
//! # Invariants
//! - Stored phones contain only digits with an optional leading `+`.
//! - Blank optional text fields are stored as `None`.
//! - Page numbers start at 1; `total_pages` is never 0.

use crate::model::member::{Member, MemberId};
use crate::repo::member_repo::{MemberListQuery, MemberRepository, MemberStatusFilter};
use crate::repo::{RepoError, RepoResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MEMBER_PAGE_SIZE: u32 = 20;

static PHONE_NOISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]+").expect("valid phone noise regex"));

/// Service error for member use-cases.
#[derive(Debug)]
pub enum MemberServiceError {
    MemberNotFound(MemberId),
    Repo(RepoError),
    /// Write succeeded but read-back did not return the row.
    InconsistentState(&'static str),
}

impl Display for MemberServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent member state: {details}"),
        }
    }
}

impl Error for MemberServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MemberServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::MemberNotFound(id) => Self::MemberNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// One page of member search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPage {
    pub items: Vec<Member>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Member service facade over repository implementations.
pub struct MemberService<R: MemberRepository> {
    repo: R,
}

impl<R: MemberRepository> MemberService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a member after normalizing input fields.
    pub fn create_member(&self, member: Member) -> Result<Member, MemberServiceError> {
        let member = normalize_member(member);
        let id = self.repo.create_member(&member)?;
        info!("event=member_create module=member status=ok member_id={id}");
        self.repo
            .get_member(id)?
            .ok_or(MemberServiceError::InconsistentState(
                "created member not found in read-back",
            ))
    }

    /// Replaces all editable fields of an existing member.
    pub fn update_member(&self, member: Member) -> Result<Member, MemberServiceError> {
        let member = normalize_member(member);
        self.repo.update_member(&member)?;
        self.repo
            .get_member(member.uuid)?
            .ok_or(MemberServiceError::InconsistentState(
                "updated member not found in read-back",
            ))
    }

    pub fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        self.repo.get_member(id)
    }

    /// Searches names and phone numbers, 20 members per page.
    pub fn search_members(
        &self,
        text: &str,
        status: MemberStatusFilter,
        page: u32,
    ) -> Result<MemberPage, MemberServiceError> {
        let page = page.max(1);
        let text = text.trim();
        let mut query = MemberListQuery {
            text: (!text.is_empty()).then(|| search_text(text)),
            status,
            limit: None,
            offset: 0,
        };

        let total = self.repo.count_members(&query)?;
        query.limit = Some(MEMBER_PAGE_SIZE);
        query.offset = (page - 1).saturating_mul(MEMBER_PAGE_SIZE);
        let items = self.repo.list_members(&query)?;

        Ok(MemberPage {
            items,
            total,
            page,
            total_pages: total_pages(total, MEMBER_PAGE_SIZE),
        })
    }

    /// Lists active members by name, for booking pick lists.
    pub fn active_members(&self) -> RepoResult<Vec<Member>> {
        self.repo.list_members(&MemberListQuery {
            status: MemberStatusFilter::Active,
            ..MemberListQuery::default()
        })
    }

    pub fn set_member_active(&self, id: MemberId, is_active: bool) -> Result<(), MemberServiceError> {
        self.repo.set_member_active(id, is_active)?;
        info!("event=member_set_active module=member status=ok member_id={id} is_active={is_active}");
        Ok(())
    }

    /// Removes a member together with their bookings and registrations.
    pub fn delete_member(&self, id: MemberId) -> Result<(), MemberServiceError> {
        self.repo.delete_member(id)?;
        info!("event=member_delete module=member status=ok member_id={id}");
        Ok(())
    }
}

/// Keeps digits and a leading `+`; returns `None` when no digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = PHONE_NOISE_RE.replace_all(trimmed, "");
    if digits.is_empty() {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{digits}"))
    } else {
        Some(digits.into_owned())
    }
}

pub(crate) fn total_pages(total: u64, page_size: u32) -> u32 {
    let pages = total.div_ceil(u64::from(page_size)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

// Phone-looking queries match stored digits regardless of typed separators.
fn search_text(text: &str) -> String {
    match normalize_phone(text) {
        Some(digits) if text.chars().all(|c| c.is_ascii_digit() || " -+()".contains(c)) => digits,
        _ => text.to_string(),
    }
}

fn normalize_member(mut member: Member) -> Member {
    member.name = member.name.trim().to_string();
    member.name_en = blank_to_none(member.name_en);
    member.phone = member.phone.as_deref().and_then(normalize_phone);
    member.health_condition = blank_to_none(member.health_condition);
    member.special_needs = blank_to_none(member.special_needs);
    member.notes = blank_to_none(member.notes);
    member
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{normalize_phone, search_text, total_pages};

    #[test]
    fn phone_keeps_digits_and_leading_plus() {
        assert_eq!(normalize_phone(" 9123-4567 ").as_deref(), Some("91234567"));
        assert_eq!(normalize_phone("+852 9123 4567").as_deref(), Some("+85291234567"));
        assert_eq!(normalize_phone("n/a"), None);
    }

    #[test]
    fn phone_like_search_is_normalized_but_names_are_not() {
        assert_eq!(search_text("9123 4567"), "91234567");
        assert_eq!(search_text("Chan 2"), "Chan 2");
    }

    #[test]
    fn total_pages_is_at_least_one() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }
}
