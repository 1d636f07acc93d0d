//! Discussion comments on duties, optionally threaded as replies.

use super::entity::{Audit, EntityId, define_entity};

/// A comment on a duty.
///
/// Replies point at their parent through `parent_comment_id`. Hard deleting
/// a parent clears that reference; the reply itself survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Identity.
    pub id: EntityId,
    /// Duty under discussion.
    pub duty_id: EntityId,
    /// Author.
    pub author_id: EntityId,
    /// Comment this one replies to.
    pub parent_comment_id: Option<EntityId>,
    /// Text.
    pub body: String,
    /// Audit columns.
    pub audit: Audit,
}

impl Comment {
    /// Unsaved top-level comment.
    pub fn new(duty_id: EntityId, author_id: EntityId, body: impl Into<String>) -> Self {
        Self {
            id: EntityId::unassigned(),
            duty_id,
            author_id,
            parent_comment_id: None,
            body: body.into(),
            audit: Audit::default(),
        }
    }
}

define_entity! {
    Comment as "comments",
    /// Filterable columns of [`Comment`].
    fields CommentField {
        Id => "id": |row| row.id,
        DutyId => "duty_id": |row| row.duty_id,
        AuthorId => "author_id": |row| row.author_id,
        ParentCommentId => "parent_comment_id": |row| row.parent_comment_id,
        Body => "body": |row| row.body.as_str(),
    }
    detach {
        ParentCommentId => |row| row.parent_comment_id = None,
    }
}
