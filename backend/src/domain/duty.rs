//! Duties and their join rows: assignees, labels, access grants and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Audit, EntityId, define_entity};
use super::query::FieldValue;

/// Workflow state of a duty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    /// Not started.
    #[default]
    Todo,
    /// Being worked on.
    InProgress,
    /// Waiting on something else.
    Blocked,
    /// Finished.
    Done,
}

impl DutyStatus {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }
}

impl From<DutyStatus> for FieldValue {
    fn from(value: DutyStatus) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

/// Urgency of a duty; orders by rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DutyPriority {
    /// Whenever.
    Low,
    /// Normal.
    #[default]
    Medium,
    /// Soon.
    High,
    /// Now.
    Critical,
}

impl DutyPriority {
    /// Numeric rank, higher is more urgent.
    pub const fn rank(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

impl From<DutyPriority> for FieldValue {
    fn from(value: DutyPriority) -> Self {
        Self::Int(value.rank())
    }
}

/// A unit of work tracked in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duty {
    /// Identity.
    pub id: EntityId,
    /// Owning project.
    pub project_id: EntityId,
    /// Parent duty when this is a sub-duty.
    pub parent_duty_id: Option<EntityId>,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Workflow state.
    pub status: DutyStatus,
    /// Urgency.
    pub priority: DutyPriority,
    /// Optional deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Audit columns.
    pub audit: Audit,
}

impl Duty {
    /// Unsaved top-level duty in `project_id`.
    pub fn new(project_id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id: EntityId::unassigned(),
            project_id,
            parent_duty_id: None,
            title: title.into(),
            description: String::new(),
            status: DutyStatus::default(),
            priority: DutyPriority::default(),
            due_at: None,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    Duty as "duties",
    /// Filterable columns of [`Duty`].
    fields DutyField {
        Id => "id": |row| row.id,
        ProjectId => "project_id": |row| row.project_id,
        ParentDutyId => "parent_duty_id": |row| row.parent_duty_id,
        Title => "title": |row| row.title.as_str(),
        Description => "description": |row| row.description.as_str(),
        Status => "status": |row| row.status,
        Priority => "priority": |row| row.priority,
        DueAt => "due_at": |row| row.due_at,
    }
}

/// Assignment of a user to a duty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyAssignee {
    /// Identity.
    pub id: EntityId,
    /// Duty.
    pub duty_id: EntityId,
    /// Assigned user.
    pub user_id: EntityId,
    /// Audit columns.
    pub audit: Audit,
}

impl DutyAssignee {
    /// Unsaved assignment.
    pub fn new(duty_id: EntityId, user_id: EntityId) -> Self {
        Self {
            id: EntityId::unassigned(),
            duty_id,
            user_id,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    DutyAssignee as "duty_assignees",
    fields DutyAssigneeField {
        Id => "id": |row| row.id,
        DutyId => "duty_id": |row| row.duty_id,
        UserId => "user_id": |row| row.user_id,
    }
}

/// A label attached to a duty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyLabel {
    /// Identity.
    pub id: EntityId,
    /// Duty.
    pub duty_id: EntityId,
    /// Label.
    pub label_id: EntityId,
    /// Audit columns.
    pub audit: Audit,
}

impl DutyLabel {
    /// Unsaved label attachment.
    pub fn new(duty_id: EntityId, label_id: EntityId) -> Self {
        Self {
            id: EntityId::unassigned(),
            duty_id,
            label_id,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    DutyLabel as "duty_labels",
    fields DutyLabelField {
        Id => "id": |row| row.id,
        DutyId => "duty_id": |row| row.duty_id,
        LabelId => "label_id": |row| row.label_id,
    }
}

/// Access level granted on a single duty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// May view.
    #[default]
    Read,
    /// May view and edit.
    Write,
}

impl AccessLevel {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl From<AccessLevel> for FieldValue {
    fn from(value: AccessLevel) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

/// Per-duty access grant for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyAccess {
    /// Identity.
    pub id: EntityId,
    /// Duty.
    pub duty_id: EntityId,
    /// Grantee.
    pub user_id: EntityId,
    /// Granted level.
    pub level: AccessLevel,
    /// Audit columns.
    pub audit: Audit,
}

impl DutyAccess {
    /// Unsaved grant.
    pub fn new(duty_id: EntityId, user_id: EntityId, level: AccessLevel) -> Self {
        Self {
            id: EntityId::unassigned(),
            duty_id,
            user_id,
            level,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    DutyAccess as "duty_access",
    fields DutyAccessField {
        Id => "id": |row| row.id,
        DutyId => "duty_id": |row| row.duty_id,
        UserId => "user_id": |row| row.user_id,
        Level => "level": |row| row.level,
    }
}

/// Directed link between two duties of any project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyLink {
    /// Identity.
    pub id: EntityId,
    /// Source duty.
    pub duty_id: EntityId,
    /// Target duty.
    pub linked_duty_id: EntityId,
    /// Audit columns.
    pub audit: Audit,
}

impl DutyLink {
    /// Unsaved link.
    pub fn new(duty_id: EntityId, linked_duty_id: EntityId) -> Self {
        Self {
            id: EntityId::unassigned(),
            duty_id,
            linked_duty_id,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    DutyLink as "duty_links",
    fields DutyLinkField {
        Id => "id": |row| row.id,
        DutyId => "duty_id": |row| row.duty_id,
        LinkedDutyId => "linked_duty_id": |row| row.linked_duty_id,
    }
}
