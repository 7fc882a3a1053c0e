use carecentre_core::db::open_db_in_memory;
use carecentre_core::{
    Member, MemberListQuery, MemberRepository, MemberService, MemberServiceError,
    MemberStatusFilter, RepoError, SqliteMemberRepository,
};
use chrono::NaiveDate;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::new(&conn);

    let mut member = Member::new("Chan Tai Man");
    member.date_of_birth = NaiveDate::from_ymd_opt(1942, 3, 9);
    member.health_condition = Some("Diabetes".to_string());
    let id = repo.create_member(&member).unwrap();

    let loaded = repo.get_member(id).unwrap().unwrap();
    assert_eq!(loaded, member);
}

#[test]
fn blank_name_is_rejected_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::new(&conn);

    let err = repo.create_member(&Member::new("  ")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.count_members(&MemberListQuery::default()).unwrap(), 0);
}

#[test]
fn update_missing_member_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::new(&conn);

    let member = Member::new("Ghost");
    let err = repo.update_member(&member).unwrap_err();
    assert!(matches!(err, RepoError::MemberNotFound(id) if id == member.uuid));
    assert!(matches!(
        repo.set_member_active(Uuid::new_v4(), false),
        Err(RepoError::MemberNotFound(_))
    ));
}

#[test]
fn service_normalizes_phone_and_blank_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = MemberService::new(SqliteMemberRepository::new(&conn));

    let mut member = Member::new("  Lee Siu Ying ");
    member.phone = Some("9123-4567".to_string());
    member.name_en = Some("   ".to_string());
    member.health_condition = Some(" Hypertension ".to_string());
    let stored = service.create_member(member).unwrap();

    assert_eq!(stored.name, "Lee Siu Ying");
    assert_eq!(stored.phone.as_deref(), Some("91234567"));
    assert_eq!(stored.name_en, None);
    assert_eq!(stored.health_condition.as_deref(), Some("Hypertension"));
}

#[test]
fn search_filters_by_text_and_status_with_paging() {
    let conn = open_db_in_memory().unwrap();
    let service = MemberService::new(SqliteMemberRepository::new(&conn));

    for idx in 0..25 {
        let mut member = Member::new(format!("Member {idx:02}"));
        member.phone = Some(format!("6000 00{idx:02}"));
        service.create_member(member).unwrap();
    }
    let mut wong = Member::new("Wong Ka Yan");
    wong.name_en = Some("Karen Wong".to_string());
    let wong = service.create_member(wong).unwrap();
    service.set_member_active(wong.uuid, false).unwrap();

    let first_page = service
        .search_members("", MemberStatusFilter::All, 1)
        .unwrap();
    assert_eq!(first_page.total, 26);
    assert_eq!(first_page.items.len(), 20);
    assert_eq!(first_page.total_pages, 2);
    assert_eq!(first_page.items[0].name, "Member 00");

    let second_page = service
        .search_members("", MemberStatusFilter::All, 2)
        .unwrap();
    assert_eq!(second_page.items.len(), 6);

    let by_english = service
        .search_members("Karen", MemberStatusFilter::All, 1)
        .unwrap();
    assert_eq!(by_english.total, 1);
    assert!(service
        .search_members("Karen", MemberStatusFilter::Active, 1)
        .unwrap()
        .items
        .is_empty());
    assert_eq!(
        service
            .search_members("", MemberStatusFilter::Inactive, 1)
            .unwrap()
            .total,
        1
    );

    let by_phone = service
        .search_members("6000-0007", MemberStatusFilter::All, 0)
        .unwrap();
    assert_eq!(by_phone.page, 1);
    assert_eq!(by_phone.total, 1);
    assert_eq!(by_phone.items[0].name, "Member 07");

    let empty = service
        .search_members("nobody", MemberStatusFilter::All, 1)
        .unwrap();
    assert_eq!(empty.total_pages, 1);
}

#[test]
fn active_members_excludes_deactivated() {
    let conn = open_db_in_memory().unwrap();
    let service = MemberService::new(SqliteMemberRepository::new(&conn));

    let kept = service.create_member(Member::new("Active")).unwrap();
    let gone = service.create_member(Member::new("Leaving")).unwrap();
    service.set_member_active(gone.uuid, false).unwrap();

    let active = service.active_members().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].uuid, kept.uuid);
}

#[test]
fn update_missing_member_maps_to_service_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = MemberService::new(SqliteMemberRepository::new(&conn));

    let err = service.update_member(Member::new("Nobody")).unwrap_err();
    assert!(matches!(err, MemberServiceError::MemberNotFound(_)));
}

#[test]
fn delete_member_removes_row_and_reports_missing() {
    let conn = open_db_in_memory().unwrap();
    let service = MemberService::new(SqliteMemberRepository::new(&conn));

    let member = service.create_member(Member::new("Leaving Soon")).unwrap();
    service.delete_member(member.uuid).unwrap();
    assert!(service.get_member(member.uuid).unwrap().is_none());

    let err = service.delete_member(member.uuid).unwrap_err();
    assert!(matches!(err, MemberServiceError::MemberNotFound(id) if id == member.uuid));
}
