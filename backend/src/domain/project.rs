//! Projects and the labels scoped to them.

use super::entity::{Audit, EntityId, define_entity};

/// A body of work owned by a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Identity.
    pub id: EntityId,
    /// Owning team.
    pub team_id: EntityId,
    /// Name, unique among the team's live projects.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Audit columns.
    pub audit: Audit,
}

impl Project {
    /// Unsaved project.
    pub fn new(team_id: EntityId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: EntityId::unassigned(),
            team_id,
            name: name.into(),
            description: description.into(),
            audit: Audit::default(),
        }
    }
}

define_entity! {
    Project as "projects",
    /// Filterable columns of [`Project`].
    fields ProjectField {
        Id => "id": |row| row.id,
        TeamId => "team_id": |row| row.team_id,
        Name => "name": |row| row.name.as_str(),
        Description => "description": |row| row.description.as_str(),
    }
}

/// A tag duties in a project can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Identity.
    pub id: EntityId,
    /// Owning project.
    pub project_id: EntityId,
    /// Name, unique within the project.
    pub name: String,
    /// Audit columns.
    pub audit: Audit,
}

impl Label {
    /// Unsaved label.
    pub fn new(project_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::unassigned(),
            project_id,
            name: name.into(),
            audit: Audit::default(),
        }
    }
}

define_entity! {
    Label as "labels",
    fields LabelField {
        Id => "id": |row| row.id,
        ProjectId => "project_id": |row| row.project_id,
        Name => "name": |row| row.name.as_str(),
    }
}
