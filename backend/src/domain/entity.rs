//! Capability contract shared by every persisted record.
//!
//! An entity has a stable identity, an audit block, and an enumerable set of
//! columns that queries may filter and order on. The generic repository port
//! is bounded by [`Entity`] rather than by any concrete record type.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::FieldValue;

/// Error returned when parsing an [`EntityId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("entity id must be a valid UUID: {value}")]
pub struct EntityIdError {
    value: String,
}

/// Stable identifier for any entity.
///
/// A nil UUID marks an entity that has not been persisted yet; repositories
/// assign a random v4 identifier when such an entity is added.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identifier for an entity that has not been persisted yet.
    pub const fn unassigned() -> Self {
        Self(Uuid::nil())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether a repository has assigned this identifier.
    pub fn is_assigned(&self) -> bool {
        !self.0.is_nil()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| EntityIdError {
                value: value.to_owned(),
            })
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Creation, modification and deletion audit columns.
///
/// ## Invariants
/// - `is_deleted` is `true` exactly when `deleted_at` is set.
/// - `created_at` / `created_by` never change after the first write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    /// When the record was first persisted.
    pub created_at: DateTime<Utc>,
    /// Who persisted the record, when known.
    pub created_by: Option<EntityId>,
    /// When the record was last updated.
    pub updated_at: Option<DateTime<Utc>>,
    /// Who last updated the record.
    pub updated_by: Option<EntityId>,
    /// When the record was soft deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Who soft deleted the record.
    pub deleted_by: Option<EntityId>,
    /// Soft-delete flag.
    pub is_deleted: bool,
}

impl Audit {
    /// Stamp creation fields on a freshly persisted record.
    pub fn mark_created(&mut self, at: DateTime<Utc>, by: Option<EntityId>) {
        self.created_at = at;
        self.created_by = by;
        self.updated_at = None;
        self.updated_by = None;
        self.deleted_at = None;
        self.deleted_by = None;
        self.is_deleted = false;
    }

    /// Stamp the update fields.
    pub fn mark_updated(&mut self, at: DateTime<Utc>, by: Option<EntityId>) {
        self.updated_at = Some(at);
        self.updated_by = by;
    }

    /// Flag the record as soft deleted.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>, by: Option<EntityId>) {
        self.deleted_at = Some(at);
        self.deleted_by = by;
        self.is_deleted = true;
    }

    /// Read an audit column as a query value.
    pub fn value(&self, field: AuditField) -> FieldValue {
        match field {
            AuditField::CreatedAt => FieldValue::from(self.created_at),
            AuditField::CreatedBy => FieldValue::from(self.created_by),
            AuditField::UpdatedAt => FieldValue::from(self.updated_at),
            AuditField::UpdatedBy => FieldValue::from(self.updated_by),
            AuditField::DeletedAt => FieldValue::from(self.deleted_at),
            AuditField::DeletedBy => FieldValue::from(self.deleted_by),
            AuditField::IsDeleted => FieldValue::from(self.is_deleted),
        }
    }
}

/// Audit columns shared by every entity's field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditField {
    /// `created_at`
    CreatedAt,
    /// `created_by`
    CreatedBy,
    /// `updated_at`
    UpdatedAt,
    /// `updated_by`
    UpdatedBy,
    /// `deleted_at`
    DeletedAt,
    /// `deleted_by`
    DeletedBy,
    /// `is_deleted`
    IsDeleted,
}

impl AuditField {
    /// Column name in storage.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::CreatedBy => "created_by",
            Self::UpdatedAt => "updated_at",
            Self::UpdatedBy => "updated_by",
            Self::DeletedAt => "deleted_at",
            Self::DeletedBy => "deleted_by",
            Self::IsDeleted => "is_deleted",
        }
    }
}

/// Enumerable column set of an entity.
pub trait EntityField: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every column, identity first.
    const ALL: &'static [Self];
    /// The identity column.
    const ID: Self;

    /// Column name in storage.
    fn name(self) -> &'static str;

    /// Resolve a column from its storage name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }
}

/// Any record with an identity, an audit block and enumerable columns.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Column set used by filters and orderings.
    type Field: EntityField;

    /// Stable storage name, unique per entity type.
    const KIND: &'static str;

    /// Current identifier; unassigned before the first write.
    fn id(&self) -> EntityId;

    /// Replace the identifier. Only repositories call this.
    fn assign_id(&mut self, id: EntityId);

    /// Audit block.
    fn audit(&self) -> &Audit;

    /// Mutable audit block. Only repositories call this.
    fn audit_mut(&mut self) -> &mut Audit;

    /// Read a column as a query value.
    fn value(&self, field: Self::Field) -> FieldValue;

    /// Clear a nullable reference column; returns `false` when the column
    /// cannot be cleared.
    fn detach(&mut self, field: Self::Field) -> bool;

    /// Soft-delete flag.
    fn is_deleted(&self) -> bool {
        self.audit().is_deleted
    }
}

/// Generate an entity's column enum and its [`Entity`] implementation.
///
/// The entity struct must carry `id: EntityId` and `audit: Audit` fields.
/// Each column maps a variant to its storage name and a value extractor;
/// the audit columns are appended automatically. Nullable reference columns
/// listed under `detach` can be cleared by the relationship policy.
macro_rules! define_entity {
    (
        $entity:ident as $kind:literal,
        $(#[$field_meta:meta])*
        fields $field:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $column:literal : |$row:ident| $value:expr
            ),+ $(,)?
        }
        $(
            detach {
                $( $detach_variant:ident => |$detach_row:ident| $detach_body:expr ),+ $(,)?
            }
        )?
    ) => {
        $(#[$field_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $field {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
            /// Shared audit column.
            Audit($crate::domain::AuditField),
        }

        impl $crate::domain::EntityField for $field {
            const ALL: &'static [Self] = &[
                $( Self::$variant, )+
                Self::Audit($crate::domain::AuditField::CreatedAt),
                Self::Audit($crate::domain::AuditField::CreatedBy),
                Self::Audit($crate::domain::AuditField::UpdatedAt),
                Self::Audit($crate::domain::AuditField::UpdatedBy),
                Self::Audit($crate::domain::AuditField::DeletedAt),
                Self::Audit($crate::domain::AuditField::DeletedBy),
                Self::Audit($crate::domain::AuditField::IsDeleted),
            ];
            const ID: Self = Self::Id;

            fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $column, )+
                    Self::Audit(audit) => audit.name(),
                }
            }
        }

        impl $crate::domain::Entity for $entity {
            type Field = $field;

            const KIND: &'static str = $kind;

            fn id(&self) -> $crate::domain::EntityId {
                self.id
            }

            fn assign_id(&mut self, id: $crate::domain::EntityId) {
                self.id = id;
            }

            fn audit(&self) -> &$crate::domain::Audit {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut $crate::domain::Audit {
                &mut self.audit
            }

            fn value(&self, field: Self::Field) -> $crate::domain::FieldValue {
                match field {
                    $(
                        $field::$variant => {
                            let $row = self;
                            $crate::domain::FieldValue::from($value)
                        }
                    )+
                    $field::Audit(audit) => self.audit.value(audit),
                }
            }

            #[allow(unreachable_patterns, reason = "entities without detachable columns")]
            fn detach(&mut self, field: Self::Field) -> bool {
                match field {
                    $($(
                        $field::$detach_variant => {
                            let $detach_row = self;
                            $detach_body;
                            true
                        }
                    )+)?
                    _ => false,
                }
            }
        }
    };
}

pub(crate) use define_entity;
