//! Outward shapes of persisted entities.
//!
//! Mapping is lossy: credentials, one-time codes, session tokens and most
//! audit columns never appear in a view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AccessLevel, Comment, Duty, DutyPriority, DutyStatus, EntityId, Project, Role, Team,
    UserAccount,
};

/// Public view of a [`UserAccount`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub mfa_enabled: bool,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserView {
    fn from(value: &UserAccount) -> Self {
        Self {
            id: value.id,
            username: value.username.clone(),
            email: value.email.clone(),
            role: value.role,
            mfa_enabled: value.mfa_enabled,
            email_confirmed: value.email_confirmed,
            created_at: value.audit.created_at,
        }
    }
}

/// Public view of a [`Team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub id: EntityId,
    pub name: String,
    pub owner_id: EntityId,
}

impl From<&Team> for TeamView {
    fn from(value: &Team) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            owner_id: value.owner_id,
        }
    }
}

/// Public view of a [`Project`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: EntityId,
    pub team_id: EntityId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectView {
    fn from(value: &Project) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            name: value.name.clone(),
            description: value.description.clone(),
            created_at: value.audit.created_at,
        }
    }
}

/// Public view of a [`Duty`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DutyView {
    pub id: EntityId,
    pub project_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_duty_id: Option<EntityId>,
    pub title: String,
    pub description: String,
    pub status: DutyStatus,
    pub priority: DutyPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Duty> for DutyView {
    fn from(value: &Duty) -> Self {
        Self {
            id: value.id,
            project_id: value.project_id,
            parent_duty_id: value.parent_duty_id,
            title: value.title.clone(),
            description: value.description.clone(),
            status: value.status,
            priority: value.priority,
            due_at: value.due_at,
            created_at: value.audit.created_at,
        }
    }
}

/// Public view of a [`Comment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: EntityId,
    pub duty_id: EntityId,
    pub author_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<EntityId>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentView {
    fn from(value: &Comment) -> Self {
        Self {
            id: value.id,
            duty_id: value.duty_id,
            author_id: value.author_id,
            parent_comment_id: value.parent_comment_id,
            body: value.body.clone(),
            created_at: value.audit.created_at,
        }
    }
}

/// Access grant as reported back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrantView {
    pub duty_id: EntityId,
    pub user_id: EntityId,
    pub level: AccessLevel,
}
