//! Team membership and project management.

use std::sync::Arc;

use pagination::Paginated;
use tracing::info;

use crate::domain::message_codes::project;
use crate::domain::ports::{Repository, RepositoryError};
use crate::domain::rules::{self, BusinessRules};
use crate::domain::{
    Direction, EntityId, Filter, Outcome, Project, ProjectField, ProjectView, QueryOptions,
    ServiceError, ServiceResult, Team, TeamMember, TeamMemberField, TeamView, UserAccount,
    settle,
};

const MAX_NAME_LENGTH: usize = 100;

/// Repositories the project service reads and writes.
#[derive(Clone)]
pub struct ProjectRepositories {
    /// Accounts that may own teams or join them.
    pub users: Arc<dyn Repository<UserAccount>>,
    pub teams: Arc<dyn Repository<Team>>,
    /// Team membership rows.
    pub members: Arc<dyn Repository<TeamMember>>,
    /// Projects, each owned by a team.
    pub projects: Arc<dyn Repository<Project>>,
}

/// Teams, their members and the projects they own.
#[derive(Clone)]
pub struct ProjectService {
    repos: ProjectRepositories,
}

impl ProjectService {
    /// Create the service.
    pub fn new(repos: ProjectRepositories) -> Self {
        Self { repos }
    }

    /// Create a team owned by `owner_id`, who becomes its first member.
    pub async fn create_team(&self, owner_id: EntityId, name: &str) -> ServiceResult<TeamView> {
        settle("create_team", self.try_create_team(owner_id, name).await)
    }

    /// Add `user_id` to a team.
    pub async fn add_team_member(
        &self,
        team_id: EntityId,
        user_id: EntityId,
        actor: EntityId,
    ) -> ServiceResult<()> {
        settle(
            "add_team_member",
            self.try_add_team_member(team_id, user_id, actor).await,
        )
    }

    /// Remove `user_id` from a team. The owner cannot be removed.
    pub async fn remove_team_member(
        &self,
        team_id: EntityId,
        user_id: EntityId,
    ) -> ServiceResult<()> {
        settle(
            "remove_team_member",
            self.try_remove_team_member(team_id, user_id).await,
        )
    }

    /// Create a project in a team.
    pub async fn create_project(
        &self,
        team_id: EntityId,
        name: &str,
        description: &str,
        actor: EntityId,
    ) -> ServiceResult<ProjectView> {
        settle(
            "create_project",
            self.try_create_project(team_id, name, description, actor)
                .await,
        )
    }

    /// Fetch a live project.
    pub async fn get_project(&self, id: EntityId) -> ServiceResult<ProjectView> {
        settle(
            "get_project",
            self.require_project(id)
                .await
                .map(|found| Outcome::done(ProjectView::from(&found))),
        )
    }

    /// One page of a team's live projects ordered by name, optionally
    /// narrowed to names containing `search`.
    pub async fn list_projects(
        &self,
        team_id: EntityId,
        search: Option<&str>,
        page: u32,
        page_size: Option<u32>,
    ) -> ServiceResult<Paginated<ProjectView>> {
        settle(
            "list_projects",
            self.try_list_projects(team_id, search, page, page_size)
                .await,
        )
    }

    /// Rename a live project.
    pub async fn rename_project(
        &self,
        id: EntityId,
        name: &str,
        actor: EntityId,
    ) -> ServiceResult<ProjectView> {
        settle("rename_project", self.try_rename_project(id, name, actor).await)
    }

    /// Soft delete a project. Its duties stay in storage untouched.
    pub async fn archive_project(&self, id: EntityId, actor: EntityId) -> ServiceResult<()> {
        settle("archive_project", self.try_archive_project(id, actor).await)
    }

    /// Hard delete a project, live or archived, with its duties and labels.
    pub async fn purge_project(&self, id: EntityId) -> ServiceResult<()> {
        settle("purge_project", self.try_purge_project(id).await)
    }

    async fn try_create_team(
        &self,
        owner_id: EntityId,
        name: &str,
    ) -> Result<Outcome<TeamView>, ServiceError> {
        let name = name.trim();
        Self::name_rules(name)?;
        self.require_user(owner_id).await?;

        let team = self
            .repos
            .teams
            .add(Team::new(name, owner_id), Some(owner_id))
            .await?;
        self.repos
            .members
            .add(TeamMember::new(team.id, owner_id), Some(owner_id))
            .await?;
        info!(team_id = %team.id, owner_id = %owner_id, "team created");
        Ok(Outcome::done(TeamView::from(&team)))
    }

    async fn try_add_team_member(
        &self,
        team_id: EntityId,
        user_id: EntityId,
        actor: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        self.require_team(team_id).await?;
        self.require_user(user_id).await?;
        if self.membership(team_id, user_id).await?.is_some() {
            return Err(ServiceError::conflict(
                project::ALREADY_MEMBER,
                format!("user {user_id} already belongs to team {team_id}"),
            ));
        }

        self.repos
            .members
            .add(TeamMember::new(team_id, user_id), Some(actor))
            .await?;
        info!(team_id = %team_id, user_id = %user_id, "team member added");
        Ok(Outcome::done(()))
    }

    async fn try_remove_team_member(
        &self,
        team_id: EntityId,
        user_id: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        let team = self.require_team(team_id).await?;
        if team.owner_id == user_id {
            return Err(ServiceError::conflict(
                project::OWNER_REMOVAL,
                "the team owner cannot be removed from the team",
            ));
        }
        let Some(member) = self.membership(team_id, user_id).await? else {
            return Err(ServiceError::not_found(
                project::NOT_MEMBER,
                format!("user {user_id} does not belong to team {team_id}"),
            ));
        };

        self.repos.members.hard_delete(member.id).await?;
        info!(team_id = %team_id, user_id = %user_id, "team member removed");
        Ok(Outcome::done(()))
    }

    async fn try_create_project(
        &self,
        team_id: EntityId,
        name: &str,
        description: &str,
        actor: EntityId,
    ) -> Result<Outcome<ProjectView>, ServiceError> {
        let name = name.trim();
        Self::name_rules(name)?;
        self.require_team(team_id).await?;
        self.ensure_name_free(team_id, name, None).await?;

        let created = self
            .repos
            .projects
            .add(Project::new(team_id, name, description.trim()), Some(actor))
            .await?;
        info!(project_id = %created.id, team_id = %team_id, "project created");
        Ok(Outcome::done(ProjectView::from(&created)))
    }

    async fn try_list_projects(
        &self,
        team_id: EntityId,
        search: Option<&str>,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<Outcome<Paginated<ProjectView>>, ServiceError> {
        let request = rules::page_request(page, page_size)?;
        let mut filter = Filter::all().equals(ProjectField::TeamId, team_id);
        if let Some(needle) = search.map(str::trim).filter(|needle| !needle.is_empty()) {
            filter = filter.contains(ProjectField::Name, needle);
        }
        let options = QueryOptions::new()
            .order_by(ProjectField::Name, Direction::Ascending)
            .order_by(ProjectField::Id, Direction::Ascending);

        let found = self
            .repos
            .projects
            .get_all_paginated(&filter, &options, request)
            .await?;
        Ok(Outcome::done(found.map(|row| ProjectView::from(&row))))
    }

    async fn try_rename_project(
        &self,
        id: EntityId,
        name: &str,
        actor: EntityId,
    ) -> Result<Outcome<ProjectView>, ServiceError> {
        let name = name.trim();
        Self::name_rules(name)?;
        let mut found = self.require_project(id).await?;
        if found.name == name {
            return Ok(Outcome::done(ProjectView::from(&found)));
        }
        self.ensure_name_free(found.team_id, name, Some(id)).await?;

        found.name = name.to_owned();
        let updated = self.repos.projects.update(found, Some(actor)).await?;
        info!(project_id = %id, "project renamed");
        Ok(Outcome::done(ProjectView::from(&updated)))
    }

    async fn try_archive_project(
        &self,
        id: EntityId,
        actor: EntityId,
    ) -> Result<Outcome<()>, ServiceError> {
        match self.repos.projects.soft_delete(id, Some(actor)).await {
            Ok(()) => {
                info!(project_id = %id, "project archived");
                Ok(Outcome::done(()))
            }
            Err(RepositoryError::NotFound { .. }) => Err(Self::project_missing(id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn try_purge_project(&self, id: EntityId) -> Result<Outcome<()>, ServiceError> {
        match self.repos.projects.hard_delete(id).await {
            Ok(()) => {
                info!(project_id = %id, "project purged");
                Ok(Outcome::done(()))
            }
            Err(RepositoryError::NotFound { .. }) => Err(Self::project_missing(id)),
            Err(RepositoryError::Restricted { dependent, .. }) => Err(ServiceError::conflict(
                project::PROJECT_HAS_DEPENDENTS,
                format!("project {id} cannot be purged while {dependent} reference its duties"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn name_rules(name: &str) -> Result<(), ServiceError> {
        BusinessRules::new()
            .rule(project::NAME_REQUIRED, || rules::required(name, "name"))
            .rule(project::NAME_TOO_LONG, || {
                rules::max_length(name, MAX_NAME_LENGTH, "name")
            })
            .run()?;
        Ok(())
    }

    async fn ensure_name_free(
        &self,
        team_id: EntityId,
        name: &str,
        except: Option<EntityId>,
    ) -> Result<(), ServiceError> {
        let mut filter = Filter::all()
            .equals(ProjectField::TeamId, team_id)
            .equals(ProjectField::Name, name);
        if let Some(id) = except {
            filter = filter.not_equals(ProjectField::Id, id);
        }
        if self.repos.projects.count(&filter).await? > 0 {
            return Err(ServiceError::conflict(
                project::NAME_TAKEN,
                format!("team {team_id} already has a project named {name:?}"),
            ));
        }
        Ok(())
    }

    async fn membership(
        &self,
        team_id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<TeamMember>, ServiceError> {
        let filter = Filter::all()
            .equals(TeamMemberField::TeamId, team_id)
            .equals(TeamMemberField::UserId, user_id);
        Ok(self
            .repos
            .members
            .get(&filter, &QueryOptions::default())
            .await?)
    }

    async fn require_user(&self, id: EntityId) -> Result<UserAccount, ServiceError> {
        self.repos.users.get_by_id(id).await?.ok_or_else(|| {
            ServiceError::not_found(project::USER_NOT_FOUND, format!("user {id} not found"))
        })
    }

    async fn require_team(&self, id: EntityId) -> Result<Team, ServiceError> {
        self.repos.teams.get_by_id(id).await?.ok_or_else(|| {
            ServiceError::not_found(project::TEAM_NOT_FOUND, format!("team {id} not found"))
        })
    }

    async fn require_project(&self, id: EntityId) -> Result<Project, ServiceError> {
        self.repos
            .projects
            .get_by_id(id)
            .await?
            .ok_or_else(|| Self::project_missing(id))
    }

    fn project_missing(id: EntityId) -> ServiceError {
        ServiceError::not_found(project::PROJECT_NOT_FOUND, format!("project {id} not found"))
    }
}

#[cfg(test)]
#[path = "project_service_tests.rs"]
mod tests;
