//! Regression coverage for the in-memory repository and delete policy.

use super::*;
use crate::domain::{
    Comment, Direction, Duty, DutyAssignee, DutyField, DutyPriority, OneTimeCode, Project,
    ProjectField, Team, Tracking,
};
use crate::test_support::{MutableClock, sample_now};
use rstest::{fixture, rstest};

struct Harness {
    clock: Arc<MutableClock>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn repo<E: Entity>(&self) -> MemoryRepository<E> {
        MemoryRepository::new(Arc::clone(&self.store))
    }
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(MutableClock::new(sample_now()));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    Harness { clock, store }
}

async fn seeded_duty(harness: &Harness) -> Duty {
    harness
        .repo::<Duty>()
        .add(Duty::new(EntityId::random(), "ship"), None)
        .await
        .expect("add duty")
}

#[rstest]
#[tokio::test]
async fn add_assigns_identity_and_creation_audit(harness: Harness) {
    let actor = EntityId::random();
    let duty = harness
        .repo::<Duty>()
        .add(Duty::new(EntityId::random(), "write docs"), Some(actor))
        .await
        .expect("add");

    assert!(duty.id.is_assigned());
    assert_eq!(duty.audit.created_at, sample_now());
    assert_eq!(duty.audit.created_by, Some(actor));
    assert!(!duty.audit.is_deleted);
}

#[rstest]
#[tokio::test]
async fn add_rejects_duplicate_identity(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let stored = seeded_duty(&harness).await;

    let err = duties.add(stored, None).await.expect_err("duplicate");

    assert!(matches!(err, RepositoryError::Conflict { .. }));
}

#[rstest]
#[tokio::test]
async fn add_range_is_all_or_nothing(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let stored = seeded_duty(&harness).await;
    let project = EntityId::random();

    let err = duties
        .add_range(vec![Duty::new(project, "fresh"), stored], None)
        .await
        .expect_err("batch with duplicate");

    assert!(matches!(err, RepositoryError::Conflict { .. }));
    let count = duties
        .count(&Filter::all().equals(DutyField::ProjectId, project))
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[rstest]
#[tokio::test]
async fn update_keeps_creation_columns_and_stamps_update(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let mut duty = seeded_duty(&harness).await;
    let editor = EntityId::random();
    harness.clock.advance_seconds(60);

    duty.title = "ship it".to_owned();
    duty.audit.created_by = Some(editor);
    let updated = duties.update(duty, Some(editor)).await.expect("update");

    assert_eq!(updated.title, "ship it");
    assert_eq!(updated.audit.created_by, None);
    assert_eq!(updated.audit.created_at, sample_now());
    assert_eq!(updated.audit.updated_by, Some(editor));
    assert_eq!(
        updated.audit.updated_at,
        Some(sample_now() + chrono::TimeDelta::seconds(60))
    );
}

#[rstest]
#[tokio::test]
async fn soft_deleted_rows_hide_from_default_reads(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let duty = seeded_duty(&harness).await;

    duties.soft_delete(duty.id, None).await.expect("soft delete");

    assert_eq!(duties.get_by_id(duty.id).await.expect("get"), None);
    assert_eq!(duties.count(&Filter::all()).await.expect("count"), 0);
    let deleted = duties
        .get_all(&Filter::all().only_deleted(), &QueryOptions::default())
        .await
        .expect("deleted rows");
    assert_eq!(deleted.len(), 1);
    assert!(deleted.iter().all(|row| row.audit.deleted_at == Some(sample_now())));
}

#[rstest]
#[tokio::test]
async fn soft_deleted_rows_reject_update_and_second_soft_delete(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let duty = seeded_duty(&harness).await;
    duties.soft_delete(duty.id, None).await.expect("soft delete");

    let update = duties.update(duty.clone(), None).await;
    let again = duties.soft_delete(duty.id, None).await;

    assert!(matches!(update, Err(RepositoryError::NotFound { .. })));
    assert!(matches!(again, Err(RepositoryError::NotFound { .. })));
}

#[rstest]
#[tokio::test]
async fn ordering_and_pagination_shape_reads(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let project = EntityId::random();
    for (title, priority) in [
        ("c", DutyPriority::Low),
        ("a", DutyPriority::High),
        ("b", DutyPriority::High),
    ] {
        let mut duty = Duty::new(project, title);
        duty.priority = priority;
        duties.add(duty, None).await.expect("add");
    }

    let page = duties
        .find(Filter::all().equals(DutyField::ProjectId, project), Tracking::Disabled)
        .order_by(DutyField::Priority, Direction::Descending)
        .order_by(DutyField::Title, Direction::Ascending)
        .page(PageRequest::new(1, Some(2)).expect("page request"))
        .await
        .expect("page");

    let titles: Vec<_> = page.items.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, ["a", "b"]);
    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
}

#[rstest]
#[tokio::test]
async fn page_past_the_end_is_empty(harness: Harness) {
    let duties = harness.repo::<Duty>();
    seeded_duty(&harness).await;

    let page = duties
        .get_all_paginated(
            &Filter::all(),
            &QueryOptions::default(),
            PageRequest::new(5, Some(10)).expect("page request"),
        )
        .await
        .expect("page");

    assert!(page.items.is_empty());
    assert_eq!(page.total_items, 1);
}

#[rstest]
#[tokio::test]
async fn undeclared_include_is_rejected(harness: Harness) {
    let projects = harness.repo::<Project>();

    let declared = projects
        .get_all(&Filter::all(), &QueryOptions::new().include(ProjectField::TeamId))
        .await;
    let undeclared = projects
        .get_all(&Filter::all(), &QueryOptions::new().include(ProjectField::Name))
        .await;

    assert!(declared.is_ok());
    assert!(matches!(
        undeclared,
        Err(RepositoryError::InvalidInclude { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn hard_delete_cascades_to_join_rows(harness: Harness) {
    let assignees = harness.repo::<DutyAssignee>();
    let duty = seeded_duty(&harness).await;
    assignees
        .add(DutyAssignee::new(duty.id, EntityId::random()), None)
        .await
        .expect("assign");

    harness.repo::<Duty>().hard_delete(duty.id).await.expect("hard delete");

    let remaining = assignees
        .count(&Filter::all().include_deleted())
        .await
        .expect("count");
    assert_eq!(remaining, 0);
}

#[rstest]
#[tokio::test]
async fn hard_delete_restricted_by_comments_changes_nothing(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let assignees = harness.repo::<DutyAssignee>();
    let comments = harness.repo::<Comment>();
    let duty = seeded_duty(&harness).await;
    assignees
        .add(DutyAssignee::new(duty.id, EntityId::random()), None)
        .await
        .expect("assign");
    let comment = comments
        .add(Comment::new(duty.id, EntityId::random(), "looks good"), None)
        .await
        .expect("comment");
    comments.soft_delete(comment.id, None).await.expect("soft delete");

    let err = duties.hard_delete(duty.id).await.expect_err("restricted");

    assert_eq!(
        err,
        RepositoryError::restricted(Duty::KIND, duty.id, Comment::KIND)
    );
    assert!(duties.get_by_id(duty.id).await.expect("get").is_some());
    assert_eq!(assignees.count(&Filter::all()).await.expect("count"), 1);
}

#[rstest]
#[tokio::test]
async fn hard_delete_restricted_through_a_cascade(harness: Harness) {
    let teams = harness.repo::<Team>();
    let projects = harness.repo::<Project>();
    let duties = harness.repo::<Duty>();
    let comments = harness.repo::<Comment>();
    let team = teams
        .add(Team::new("core", EntityId::random()), None)
        .await
        .expect("team");
    let project = projects
        .add(Project::new(team.id, "alpha", ""), None)
        .await
        .expect("project");
    let duty = duties
        .add(Duty::new(project.id, "ship"), None)
        .await
        .expect("duty");
    comments
        .add(Comment::new(duty.id, EntityId::random(), "blocked"), None)
        .await
        .expect("comment");

    let err = teams.hard_delete(team.id).await.expect_err("restricted");

    assert!(matches!(err, RepositoryError::Restricted { .. }));
    assert!(projects.get_by_id(project.id).await.expect("get").is_some());
}

#[rstest]
#[tokio::test]
async fn hard_deleting_parent_and_sub_duty_together_succeeds(harness: Harness) {
    let duties = harness.repo::<Duty>();
    let parent = seeded_duty(&harness).await;
    let mut child = Duty::new(parent.project_id, "sub");
    child.parent_duty_id = Some(parent.id);
    let child = duties.add(child, None).await.expect("child");

    let alone = duties.hard_delete(parent.id).await;
    let removed = duties
        .hard_delete_matching(&[parent.id, child.id])
        .await
        .expect("batch delete");

    assert!(matches!(alone, Err(RepositoryError::Restricted { .. })));
    assert_eq!(removed, 2);
}

#[rstest]
#[tokio::test]
async fn hard_delete_detaches_replies(harness: Harness) {
    let comments = harness.repo::<Comment>();
    let duty = seeded_duty(&harness).await;
    let parent = comments
        .add(Comment::new(duty.id, EntityId::random(), "question"), None)
        .await
        .expect("parent");
    let mut reply = Comment::new(duty.id, EntityId::random(), "answer");
    reply.parent_comment_id = Some(parent.id);
    let reply = comments.add(reply, None).await.expect("reply");

    comments.hard_delete(parent.id).await.expect("hard delete");

    let kept = comments
        .get_by_id(reply.id)
        .await
        .expect("get")
        .expect("reply survives");
    assert_eq!(kept.parent_comment_id, None);
}

#[rstest]
#[tokio::test]
async fn hard_delete_of_missing_row_is_not_found(harness: Harness) {
    let err = harness
        .repo::<Duty>()
        .hard_delete(EntityId::random())
        .await
        .expect_err("missing");
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[rstest]
#[tokio::test]
async fn consume_code_redeems_exactly_once(harness: Harness) {
    let users = harness.repo::<UserAccount>();
    let mut account = UserAccount::new("ada", "ada@example.com", "hash", "salt");
    account.mfa_code = Some(OneTimeCode {
        value: "123456".to_owned(),
        expires_at: sample_now() + chrono::TimeDelta::minutes(1),
    });
    let account = users.add(account, None).await.expect("add");

    let wrong = users
        .consume_code(account.id, CodePurpose::Mfa, "000000", sample_now())
        .await
        .expect("consume");
    let first = users
        .consume_code(account.id, CodePurpose::Mfa, "123456", sample_now())
        .await
        .expect("consume");
    let second = users
        .consume_code(account.id, CodePurpose::Mfa, "123456", sample_now())
        .await
        .expect("consume");

    assert!(!wrong);
    assert!(first);
    assert!(!second);
}

#[rstest]
#[tokio::test]
async fn consume_code_rejects_expired_codes(harness: Harness) {
    let users = harness.repo::<UserAccount>();
    let mut account = UserAccount::new("ada", "ada@example.com", "hash", "salt");
    account.reset_code = Some(OneTimeCode {
        value: "654321".to_owned(),
        expires_at: sample_now(),
    });
    let account = users.add(account, None).await.expect("add");

    let later = sample_now() + chrono::TimeDelta::seconds(1);
    let redeemed = users
        .consume_code(account.id, CodePurpose::PasswordReset, "654321", later)
        .await
        .expect("consume");

    assert!(!redeemed);
}

#[rstest]
#[tokio::test]
async fn apply_changes_keeps_columns_written_since_the_read(harness: Harness) {
    let users = harness.repo::<UserAccount>();
    let account = users
        .add(UserAccount::new("ada", "ada@example.com", "hash", "salt"), None)
        .await
        .expect("add");
    let reset = OneTimeCode {
        value: "654321".to_owned(),
        expires_at: sample_now() + chrono::TimeDelta::minutes(15),
    };
    users
        .apply_changes(
            account.id,
            &AccountChanges::default().issue_code(CodePurpose::PasswordReset, reset.clone()),
            None,
        )
        .await
        .expect("issue reset code");

    let updated = users
        .apply_changes(
            account.id,
            &AccountChanges::default().start_session("token-1"),
            Some(account.id),
        )
        .await
        .expect("start session");

    assert_eq!(updated.active_token.as_deref(), Some("token-1"));
    assert_eq!(updated.reset_code, Some(reset));
    assert_eq!(updated.audit.updated_by, Some(account.id));
    assert_eq!(updated.audit.updated_at, Some(sample_now()));
}

#[rstest]
#[tokio::test]
async fn apply_changes_to_a_soft_deleted_account_is_not_found(harness: Harness) {
    let users = harness.repo::<UserAccount>();
    let account = users
        .add(UserAccount::new("ada", "ada@example.com", "hash", "salt"), None)
        .await
        .expect("add");
    users.soft_delete(account.id, None).await.expect("soft delete");

    let err = users
        .apply_changes(account.id, &AccountChanges::default().end_session(), None)
        .await
        .expect_err("deleted account");

    assert!(matches!(err, RepositoryError::NotFound { .. }));
}
