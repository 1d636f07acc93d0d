//! Teams and their membership join rows.

use super::entity::{Audit, EntityId, define_entity};

/// A group of users owning projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Owning user; the owner cannot be hard deleted while the team exists.
    pub owner_id: EntityId,
    /// Audit columns.
    pub audit: Audit,
}

impl Team {
    /// Unsaved team.
    pub fn new(name: impl Into<String>, owner_id: EntityId) -> Self {
        Self {
            id: EntityId::unassigned(),
            name: name.into(),
            owner_id,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    Team as "teams",
    /// Filterable columns of [`Team`].
    fields TeamField {
        Id => "id": |row| row.id,
        Name => "name": |row| row.name.as_str(),
        OwnerId => "owner_id": |row| row.owner_id,
    }
}

/// Membership of a user in a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    /// Identity.
    pub id: EntityId,
    /// Team.
    pub team_id: EntityId,
    /// Member.
    pub user_id: EntityId,
    /// Audit columns.
    pub audit: Audit,
}

impl TeamMember {
    /// Unsaved membership row.
    pub fn new(team_id: EntityId, user_id: EntityId) -> Self {
        Self {
            id: EntityId::unassigned(),
            team_id,
            user_id,
            audit: Audit::default(),
        }
    }
}

define_entity! {
    TeamMember as "team_members",
    fields TeamMemberField {
        Id => "id": |row| row.id,
        TeamId => "team_id": |row| row.team_id,
        UserId => "user_id": |row| row.user_id,
    }
}
