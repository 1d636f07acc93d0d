//! Duty tracking: sub-duties, assignment, labels, access grants, links and
//! comment threads.
//!
//! Hard deletes go through the repository's relationship policy. A duty with
//! sub-duties or comments cannot be purged (`DUT-00006`); deleting a comment
//! detaches its replies instead of removing them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pagination::Paginated;
use tracing::info;

use crate::domain::message_codes::{duty, project};
use crate::domain::ports::{Repository, RepositoryError};
use crate::domain::rules::{self, BusinessRules};
use crate::domain::{
    AccessGrantView, AccessLevel, AuditField, Comment, CommentField, CommentView, Direction, Duty,
    DutyAccess, DutyAccessField, DutyAssignee, DutyAssigneeField, DutyField, DutyLabel,
    DutyLabelField, DutyLink, DutyLinkField, DutyPriority, DutyStatus, DutyView, EntityId, Filter,
    Label, LabelField, Outcome, Project, QueryOptions, ServiceError, ServiceResult, UserAccount,
    settle,
};

const MAX_TITLE_LENGTH: usize = 200;

/// Repositories the duty service reads and writes.
#[derive(Clone)]
pub struct DutyRepositories {
    /// Accounts named as creators, assignees and grantees.
    pub users: Arc<dyn Repository<UserAccount>>,
    /// Owning projects; only read here.
    pub projects: Arc<dyn Repository<Project>>,
    /// Project-scoped labels.
    pub labels: Arc<dyn Repository<Label>>,
    pub duties: Arc<dyn Repository<Duty>>,
    /// Duty to user assignment rows.
    pub assignees: Arc<dyn Repository<DutyAssignee>>,
    /// Duty to label join rows.
    pub duty_labels: Arc<dyn Repository<DutyLabel>>,
    /// Per-user access grants.
    pub access: Arc<dyn Repository<DutyAccess>>,
    /// Directed links between duties.
    pub links: Arc<dyn Repository<DutyLink>>,
    pub comments: Arc<dyn Repository<Comment>>,
}

/// Input for [`DutyService::create_duty`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDuty {
    /// Project the duty is filed under.
    pub project_id: EntityId,
    /// Parent duty in the same project.
    pub parent_duty_id: Option<EntityId>,
    /// Required; blank titles are rejected.
    pub title: String,
    /// Free text, may be empty.
    pub description: String,
    pub priority: DutyPriority,
    /// Deadline, if any.
    pub due_at: Option<DateTime<Utc>>,
}

impl NewDuty {
    /// Top-level duty with default priority and no deadline.
    pub fn new(project_id: EntityId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            parent_duty_id: None,
            title: title.into(),
            description: String::new(),
            priority: DutyPriority::default(),
            due_at: None,
        }
    }

    /// Make this a sub-duty of `parent`.
    pub fn under(mut self, parent: EntityId) -> Self {
        self.parent_duty_id = Some(parent);
        self
    }

    /// Replace the empty description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Override [`DutyPriority::default`].
    pub fn with_priority(mut self, priority: DutyPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set a deadline.
    pub fn due(mut self, at: DateTime<Utc>) -> Self {
        self.due_at = Some(at);
        self
    }
}

/// Duty and comment operations.
#[derive(Clone)]
pub struct DutyService {
    repos: DutyRepositories,
}

impl DutyService {
    /// Create the service.
    pub fn new(repos: DutyRepositories) -> Self {
        Self { repos }
    }

    /// Create a duty, optionally as a sub-duty of a live duty in the same
    /// project.
    pub async fn create_duty(&self, new: NewDuty, actor: EntityId) -> ServiceResult<DutyView> {
        settle("create_duty", self.try_create_duty(new, actor).await)
    }

    /// Fetch a live duty.
    pub async fn get_duty(&self, id: EntityId) -> ServiceResult<DutyView> {
        settle(
            "get_duty",
            self.require_duty(id)
                .await
                .map(|found| Outcome::done(DutyView::from(&found))),
        )
    }

    /// One page of a project's live duties, most urgent first and then by
    /// title.
    pub async fn list_duties(
        &self,
        project_id: EntityId,
        status: Option<DutyStatus>,
        page: u32,
        page_size: Option<u32>,
    ) -> ServiceResult<Paginated<DutyView>> {
        settle(
            "list_duties",
            self.try_list_duties(project_id, status, page, page_size)
                .await,
        )
    }

    /// Move a duty to `status`.
    pub async fn update_status(
        &self,
        id: EntityId,
        status: DutyStatus,
        actor: EntityId,
    ) -> ServiceResult<DutyView> {
        settle("update_status", self.try_update_status(id, status, actor).await)
    }

    /// Assign a user to a duty.
    pub async fn assign_user(
        &self,
        duty_id: EntityId,
        user_id: EntityId,
        actor: EntityId,
    ) -> ServiceResult<()> {
        settle(
            "assign_user",
            self.try_assign_user(duty_id, user_id, actor).await,
        )
    }

    /// Attach the project label called `name`, creating it on first use.
    pub async fn label_duty(
        &self,
        duty_id: EntityId,
        name: &str,
        actor: EntityId,
    ) -> ServiceResult<()> {
        settle("label_duty", self.try_label_duty(duty_id, name, actor).await)
    }

    /// Grant a user access to a duty. Granting a different level replaces
    /// the existing grant.
    pub async fn grant_access(
        &self,
        duty_id: EntityId,
        user_id: EntityId,
        level: AccessLevel,
        actor: EntityId,
    ) -> ServiceResult<AccessGrantView> {
        settle(
            "grant_access",
            self.try_grant_access(duty_id, user_id, level, actor).await,
        )
    }

    /// Link `duty_id` to `linked_duty_id`.
    pub async fn link_duties(
        &self,
        duty_id: EntityId,
        linked_duty_id: EntityId,
        actor: EntityId,
    ) -> ServiceResult<()> {
        settle(
            "link_duties",
            self.try_link_duties(duty_id, linked_duty_id, actor).await,
        )
    }

    /// Comment on a duty, optionally replying to a comment on the same duty.
    pub async fn add_comment(
        &self,
        duty_id: EntityId,
        author_id: EntityId,
        body: &str,
        reply_to: Option<EntityId>,
    ) -> ServiceResult<CommentView> {
        settle(
            "add_comment",
            self.try_add_comment(duty_id, author_id, body, reply_to)
                .await,
        )
    }

    /// Comments on a live duty, oldest first.
    pub async fn list_comments(&self, duty_id: EntityId) -> ServiceResult<Vec<CommentView>> {
        settle("list_comments", self.try_list_comments(duty_id).await)
    }

    /// Soft delete a duty.
    pub async fn archive_duty(&self, id: EntityId, actor: EntityId) -> ServiceResult<()> {
        settle("archive_duty", self.try_archive_duty(id, actor).await)
    }

    /// Hard delete a duty and its join rows.
    pub async fn purge_duty(&self, id: EntityId) -> ServiceResult<()> {
        settle("purge_duty", self.try_purge_duty(id).await)
    }

    /// Hard delete a comment; its replies stay with the reference cleared.
    pub async fn delete_comment(&self, id: EntityId) -> ServiceResult<()> {
        settle("delete_comment", self.try_delete_comment(id).await)
    }

    async fn try_create_duty(
        &self,
        new: NewDuty,
        actor: EntityId,
    ) -> Result<Outcome<DutyView>, ServiceError> {
        let title = new.title.trim();
        BusinessRules::new()
            .rule(duty::TITLE_REQUIRED, || rules::required(title, "title"))
            .rule(duty::TITLE_TOO_LONG, || {
                rules::max_length(title, MAX_TITLE_LENGTH, "title")
            })
            .run()?;

        if self.repos.projects.get_by_id(new.project_id).await?.is_none() {
            return Err(ServiceError::not_found(
                project::PROJECT_NOT_FOUND,
                format!("project {} not found", new.project_id),
            ));
        }
        if let Some(parent_id) = new.parent_duty_id {
            let parent = self.require_duty(parent_id).await?;
            if parent.project_id != new.project_id {
                return Err(ServiceError::conflict(
                    duty::PARENT_OUTSIDE_PROJECT,
                    format!("duty {parent_id} belongs to another project"),
                ));
            }
        }

        let mut draft = Duty::new(new.project_id, title);
        draft.parent_duty_id = new.parent_duty_id;
        draft.description = new.description.trim().to_owned();
        draft.priority = new.priority;
        draft.due_at = new.due_at;
        let created = self.repos.duties.add(draft, Some(actor)).await?;
        info!(duty_id = %created.id, project_id = %created.project_id, "duty created");
        Ok(Outcome::done(DutyView::from(&created)))
    }

    async fn try_list_duties(
        &self,
        project_id: EntityId,
        status: Option<DutyStatus>,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<Outcome<Paginated<DutyView>>, ServiceError> {
        let request = rules::page_request(page, page_size)?;
        let mut filter = Filter::all().equals(DutyField::ProjectId, project_id);
        if let Some(status) = status {
            filter = filter.equals(DutyField::Status, status);
        }
        let options = QueryOptions::new()
            .order_by(DutyField::Priority, Direction::Descending)
            .order_by(DutyField::Title, Direction::Ascending)
            .order_by(DutyField::Id, Direction::Ascending);

        let found = self
            .repos
            .duties
            .get_all_paginated(&filter, &options, request)
            .await?;
        Ok(Outcome::done(found.map(|row| DutyView::from(&row))))
    }

    async fn try_update_status(
        &self,
        id: EntityId,
        status: DutyStatus,
        actor: EntityId,
    ) -> Result<Outcome<DutyView>, ServiceError> {
        let mut found = self.require_duty(id).await?;
        if found.status == status {
            return Ok(Outcome::done(DutyView::from(&found)));
        }
        let from = found.status;
        found.status = status;
        let updated = self.repos.duties.update(found, Some(actor)).await?;
        info!(duty_id = %id, from = from.as_str(), to = status.as_str(), "duty status changed");
        Ok(Outcome::done(DutyView::from(&updated)))
    }

    async fn try_assign_user(
        &self,
        duty_id: EntityId,
        user_id: EntityId,
        actor: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        self.require_duty(duty_id).await?;
        self.require_user(user_id).await?;
        let existing = Filter::all()
            .equals(DutyAssigneeField::DutyId, duty_id)
            .equals(DutyAssigneeField::UserId, user_id);
        if self.repos.assignees.count(&existing).await? > 0 {
            return Err(ServiceError::conflict(
                duty::ALREADY_ASSIGNED,
                format!("user {user_id} is already assigned to duty {duty_id}"),
            ));
        }

        self.repos
            .assignees
            .add(DutyAssignee::new(duty_id, user_id), Some(actor))
            .await?;
        info!(duty_id = %duty_id, user_id = %user_id, "user assigned");
        Ok(Outcome::done(()))
    }

    async fn try_label_duty(
        &self,
        duty_id: EntityId,
        name: &str,
        actor: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        let name = name.trim();
        BusinessRules::new()
            .rule(duty::LABEL_REQUIRED, || rules::required(name, "label"))
            .run()?;
        let found = self.require_duty(duty_id).await?;

        let label = self.label_named(found.project_id, name, actor).await?;
        let existing = Filter::all()
            .equals(DutyLabelField::DutyId, duty_id)
            .equals(DutyLabelField::LabelId, label.id);
        if self.repos.duty_labels.count(&existing).await? > 0 {
            return Err(ServiceError::conflict(
                duty::ALREADY_LABELLED,
                format!("duty {duty_id} is already labelled {name:?}"),
            ));
        }

        self.repos
            .duty_labels
            .add(DutyLabel::new(duty_id, label.id), Some(actor))
            .await?;
        info!(duty_id = %duty_id, label_id = %label.id, "duty labelled");
        Ok(Outcome::done(()))
    }

    async fn try_grant_access(
        &self,
        duty_id: EntityId,
        user_id: EntityId,
        level: AccessLevel,
        actor: EntityId,
    ) -> Result<Outcome<AccessGrantView>, ServiceError> {
        self.require_duty(duty_id).await?;
        self.require_user(user_id).await?;
        let filter = Filter::all()
            .equals(DutyAccessField::DutyId, duty_id)
            .equals(DutyAccessField::UserId, user_id);
        let view = AccessGrantView {
            duty_id,
            user_id,
            level,
        };

        match self
            .repos
            .access
            .get(&filter, &QueryOptions::default())
            .await?
        {
            Some(grant) if grant.level == level => Err(ServiceError::conflict(
                duty::ACCESS_ALREADY_GRANTED,
                format!("user {user_id} already has {} access", level.as_str()),
            )),
            Some(mut grant) => {
                grant.level = level;
                self.repos.access.update(grant, Some(actor)).await?;
                info!(duty_id = %duty_id, user_id = %user_id, level = level.as_str(), "access changed");
                Ok(Outcome::done(view))
            }
            None => {
                self.repos
                    .access
                    .add(DutyAccess::new(duty_id, user_id, level), Some(actor))
                    .await?;
                info!(duty_id = %duty_id, user_id = %user_id, level = level.as_str(), "access granted");
                Ok(Outcome::done(view))
            }
        }
    }

    async fn try_link_duties(
        &self,
        duty_id: EntityId,
        linked_duty_id: EntityId,
        actor: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        if duty_id == linked_duty_id {
            return Err(ServiceError::conflict(
                duty::SELF_LINK,
                "a duty cannot be linked to itself",
            ));
        }
        self.require_duty(duty_id).await?;
        self.require_duty(linked_duty_id).await?;

        let forward = Filter::all()
            .equals(DutyLinkField::DutyId, duty_id)
            .equals(DutyLinkField::LinkedDutyId, linked_duty_id);
        let backward = Filter::all()
            .equals(DutyLinkField::DutyId, linked_duty_id)
            .equals(DutyLinkField::LinkedDutyId, duty_id);
        if self.repos.links.count(&forward).await? + self.repos.links.count(&backward).await? > 0
        {
            return Err(ServiceError::conflict(
                duty::ALREADY_LINKED,
                format!("duties {duty_id} and {linked_duty_id} are already linked"),
            ));
        }

        self.repos
            .links
            .add(DutyLink::new(duty_id, linked_duty_id), Some(actor))
            .await?;
        info!(duty_id = %duty_id, linked_duty_id = %linked_duty_id, "duties linked");
        Ok(Outcome::done(()))
    }

    async fn try_add_comment(
        &self,
        duty_id: EntityId,
        author_id: EntityId,
        body: &str,
        reply_to: Option<EntityId>,
    ) -> Result<Outcome<CommentView>, ServiceError> {
        let body = body.trim();
        BusinessRules::new()
            .rule(duty::COMMENT_REQUIRED, || rules::required(body, "comment"))
            .run()?;
        self.require_duty(duty_id).await?;
        self.require_user(author_id).await?;
        if let Some(parent_id) = reply_to {
            let parent = self.repos.comments.get_by_id(parent_id).await?.ok_or_else(|| {
                ServiceError::not_found(
                    duty::COMMENT_NOT_FOUND,
                    format!("comment {parent_id} not found"),
                )
            })?;
            if parent.duty_id != duty_id {
                return Err(ServiceError::conflict(
                    duty::REPLY_OUTSIDE_DUTY,
                    format!("comment {parent_id} belongs to another duty"),
                ));
            }
        }

        let mut draft = Comment::new(duty_id, author_id, body);
        draft.parent_comment_id = reply_to;
        let created = self.repos.comments.add(draft, Some(author_id)).await?;
        info!(comment_id = %created.id, duty_id = %duty_id, "comment added");
        Ok(Outcome::done(CommentView::from(&created)))
    }

    async fn try_list_comments(
        &self,
        duty_id: EntityId,
    ) -> Result<Outcome<Vec<CommentView>>, ServiceError> {
        self.require_duty(duty_id).await?;
        let filter = Filter::all().equals(CommentField::DutyId, duty_id);
        let options = QueryOptions::new()
            .order_by(
                CommentField::Audit(AuditField::CreatedAt),
                Direction::Ascending,
            )
            .order_by(CommentField::Id, Direction::Ascending);
        let found = self.repos.comments.get_all(&filter, &options).await?;
        Ok(Outcome::done(found.iter().map(CommentView::from).collect()))
    }

    async fn try_archive_duty(
        &self,
        id: EntityId,
        actor: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        match self.repos.duties.soft_delete(id, Some(actor)).await {
            Ok(()) => {
                info!(duty_id = %id, "duty archived");
                Ok(Outcome::done(()))
            }
            Err(RepositoryError::NotFound { .. }) => Err(Self::duty_missing(id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn try_purge_duty(&self, id: EntityId) -> Result<Outcome<()>, ServiceError> {
        match self.repos.duties.hard_delete(id).await {
            Ok(()) => {
                info!(duty_id = %id, "duty purged");
                Ok(Outcome::done(()))
            }
            Err(RepositoryError::NotFound { .. }) => Err(Self::duty_missing(id)),
            Err(RepositoryError::Restricted { dependent, .. }) => Err(ServiceError::conflict(
                duty::DUTY_HAS_DEPENDENTS,
                format!("duty {id} is still referenced by {dependent}"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    async fn try_delete_comment(&self, id: EntityId) -> Result<Outcome<()>, ServiceError> {
        match self.repos.comments.hard_delete(id).await {
            Ok(()) => {
                info!(comment_id = %id, "comment deleted");
                Ok(Outcome::done(()))
            }
            Err(RepositoryError::NotFound { .. }) => Err(ServiceError::not_found(
                duty::COMMENT_NOT_FOUND,
                format!("comment {id} not found"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Live label `name` in the project, created when absent.
    async fn label_named(
        &self,
        project_id: EntityId,
        name: &str,
        actor: EntityId,
    ) -> Result<Label, ServiceError> {
        let filter = Filter::all()
            .equals(LabelField::ProjectId, project_id)
            .equals(LabelField::Name, name);
        if let Some(label) = self
            .repos
            .labels
            .get(&filter, &QueryOptions::default())
            .await?
        {
            return Ok(label);
        }
        Ok(self
            .repos
            .labels
            .add(Label::new(project_id, name), Some(actor))
            .await?)
    }

    async fn require_duty(&self, id: EntityId) -> Result<Duty, ServiceError> {
        self.repos
            .duties
            .get_by_id(id)
            .await?
            .ok_or_else(|| Self::duty_missing(id))
    }

    async fn require_user(&self, id: EntityId) -> Result<UserAccount, ServiceError> {
        self.repos.users.get_by_id(id).await?.ok_or_else(|| {
            ServiceError::not_found(duty::USER_NOT_FOUND, format!("user {id} not found"))
        })
    }

    fn duty_missing(id: EntityId) -> ServiceError {
        ServiceError::not_found(duty::DUTY_NOT_FOUND, format!("duty {id} not found"))
    }
}

#[cfg(test)]
#[path = "duty_service_tests.rs"]
mod tests;
