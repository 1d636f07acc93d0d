//! Declared foreign-key relationships and their hard-delete policy.

use super::entity::{Entity, EntityField};
use super::{
    Comment, CommentField, Duty, DutyAccess, DutyAccessField, DutyAssignee, DutyAssigneeField,
    DutyField, DutyLabel, DutyLabelField, DutyLink, DutyLinkField, Label, LabelField, Project,
    ProjectField, Team, TeamField, TeamMember, TeamMemberField, UserAccount,
};

/// What a hard delete of the parent does to referencing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDelete {
    /// Remove referencing rows too.
    Cascade,
    /// Refuse while referencing rows exist.
    Restrict,
    /// Clear the reference column on referencing rows.
    Detach,
}

/// A reference column on `child` pointing at `parent` identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relationship {
    /// Storage name of the referenced entity.
    pub parent: &'static str,
    /// Storage name of the referencing entity.
    pub child: &'static str,
    /// Reference column on the child.
    pub column: &'static str,
    /// Hard-delete policy.
    pub on_delete: OnDelete,
}

impl Relationship {
    /// Declare `C.column -> P.id`.
    pub fn new<P: Entity, C: Entity>(column: C::Field, on_delete: OnDelete) -> Self {
        Self {
            parent: P::KIND,
            child: C::KIND,
            column: column.name(),
            on_delete,
        }
    }

    /// Whether `field` of `E` is declared as a reference column.
    pub fn declares<E: Entity>(relationships: &[Self], field: E::Field) -> bool {
        relationships
            .iter()
            .any(|rel| rel.child == E::KIND && rel.column == field.name())
    }
}

/// Relationship policy of the duty management schema.
///
/// Duty to sub-duty and duty to comment edges restrict; join rows and
/// ownership edges cascade; reply chains detach.
pub fn duty_schema() -> Vec<Relationship> {
    use OnDelete::{Cascade, Detach, Restrict};

    vec![
        Relationship::new::<UserAccount, Team>(TeamField::OwnerId, Restrict),
        Relationship::new::<Team, TeamMember>(TeamMemberField::TeamId, Cascade),
        Relationship::new::<UserAccount, TeamMember>(TeamMemberField::UserId, Cascade),
        Relationship::new::<Team, Project>(ProjectField::TeamId, Cascade),
        Relationship::new::<Project, Duty>(DutyField::ProjectId, Cascade),
        Relationship::new::<Duty, Duty>(DutyField::ParentDutyId, Restrict),
        Relationship::new::<Project, Label>(LabelField::ProjectId, Cascade),
        Relationship::new::<Duty, DutyAssignee>(DutyAssigneeField::DutyId, Cascade),
        Relationship::new::<UserAccount, DutyAssignee>(DutyAssigneeField::UserId, Cascade),
        Relationship::new::<Duty, DutyLabel>(DutyLabelField::DutyId, Cascade),
        Relationship::new::<Label, DutyLabel>(DutyLabelField::LabelId, Cascade),
        Relationship::new::<Duty, DutyAccess>(DutyAccessField::DutyId, Cascade),
        Relationship::new::<UserAccount, DutyAccess>(DutyAccessField::UserId, Cascade),
        Relationship::new::<Duty, DutyLink>(DutyLinkField::DutyId, Cascade),
        Relationship::new::<Duty, DutyLink>(DutyLinkField::LinkedDutyId, Cascade),
        Relationship::new::<Duty, Comment>(CommentField::DutyId, Restrict),
        Relationship::new::<UserAccount, Comment>(CommentField::AuthorId, Cascade),
        Relationship::new::<Comment, Comment>(CommentField::ParentCommentId, Detach),
    ]
}
