//! Enumerable query vocabulary for the generic repository port.
//!
//! Filters, orderings and relationship includes are plain data over an
//! entity's [`EntityField`] set, so adapters can translate them to SQL or
//! evaluate them in memory without executing caller-supplied closures.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::entity::{Entity, EntityField, EntityId};

/// Column value as seen by filters and orderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Absent value; sorts before everything else.
    Null,
    /// Boolean column.
    Bool(bool),
    /// Integer column (enumerations are stored as their rank).
    Int(i64),
    /// Text column.
    Text(String),
    /// Identifier column.
    Id(EntityId),
    /// Timestamp column.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Whether the value is [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Total order within a variant; `None` when the variants differ.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, _) => Some(Ordering::Less),
            (_, Self::Null) => Some(Ordering::Greater),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Id(a), Self::Id(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Referenced identifier, when the value is one.
    pub fn as_id(&self) -> Option<EntityId> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<EntityId> for FieldValue {
    fn from(value: EntityId) -> Self {
        Self::Id(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Test applied to a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Column equals the value.
    Eq(FieldValue),
    /// Column is non-null and differs from the value.
    NotEq(FieldValue),
    /// Column is non-null and less than the value.
    Lt(FieldValue),
    /// Column is non-null and at most the value.
    Lte(FieldValue),
    /// Column is non-null and greater than the value.
    Gt(FieldValue),
    /// Column is non-null and at least the value.
    Gte(FieldValue),
    /// Text column contains the needle, ignoring case.
    Contains(String),
    /// Column is null.
    IsNull,
    /// Column is not null.
    IsNotNull,
    /// Column equals one of the values.
    AnyOf(Vec<FieldValue>),
}

impl Predicate {
    /// Evaluate the predicate against a column value.
    pub fn matches(&self, candidate: &FieldValue) -> bool {
        let ordered = |value: &FieldValue, accept: fn(Ordering) -> bool| {
            !candidate.is_null() && candidate.compare(value).is_some_and(accept)
        };
        match self {
            Self::Eq(value) => candidate.compare(value) == Some(Ordering::Equal),
            Self::NotEq(value) => ordered(value, Ordering::is_ne),
            Self::Lt(value) => ordered(value, Ordering::is_lt),
            Self::Lte(value) => ordered(value, Ordering::is_le),
            Self::Gt(value) => ordered(value, Ordering::is_gt),
            Self::Gte(value) => ordered(value, Ordering::is_ge),
            Self::Contains(needle) => match candidate {
                FieldValue::Text(text) => text.to_lowercase().contains(&needle.to_lowercase()),
                _ => false,
            },
            Self::IsNull => candidate.is_null(),
            Self::IsNotNull => !candidate.is_null(),
            Self::AnyOf(values) => values
                .iter()
                .any(|value| candidate.compare(value) == Some(Ordering::Equal)),
        }
    }
}

/// A predicate bound to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition<F> {
    /// Column under test.
    pub field: F,
    /// Test applied to the column.
    pub predicate: Predicate,
}

/// Which rows a query sees with respect to soft deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletionScope {
    /// Only rows that are not soft deleted.
    #[default]
    Active,
    /// Every physically present row.
    IncludeDeleted,
    /// Only soft-deleted rows.
    DeletedOnly,
}

impl DeletionScope {
    /// Whether a row with the given soft-delete flag is visible.
    pub const fn admits(self, is_deleted: bool) -> bool {
        match self {
            Self::Active => !is_deleted,
            Self::IncludeDeleted => true,
            Self::DeletedOnly => is_deleted,
        }
    }
}

/// Conjunction of column conditions plus a deletion scope.
///
/// The default filter matches every active row.
///
/// # Examples
/// ```
/// use duty_backend::domain::{DeletionScope, DutyField, Filter};
///
/// let filter = Filter::all()
///     .contains(DutyField::Title, "login")
///     .include_deleted();
/// assert_eq!(filter.conditions().len(), 1);
/// assert_eq!(filter.deletion(), DeletionScope::IncludeDeleted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter<F> {
    conditions: Vec<Condition<F>>,
    deletion: DeletionScope,
}

impl<F> Default for Filter<F> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            deletion: DeletionScope::default(),
        }
    }
}

impl<F: EntityField> Filter<F> {
    /// Match every active row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match the row with the given identity.
    pub fn by_id(id: EntityId) -> Self {
        Self::all().equals(F::ID, id)
    }

    /// Match rows whose identity is one of `ids`.
    pub fn by_ids(ids: &[EntityId]) -> Self {
        Self::all().any_of(F::ID, ids.iter().copied())
    }

    /// Append a condition.
    pub fn with(mut self, field: F, predicate: Predicate) -> Self {
        self.conditions.push(Condition { field, predicate });
        self
    }

    /// Column equals `value`.
    pub fn equals(self, field: F, value: impl Into<FieldValue>) -> Self {
        self.with(field, Predicate::Eq(value.into()))
    }

    /// Column differs from `value`.
    pub fn not_equals(self, field: F, value: impl Into<FieldValue>) -> Self {
        self.with(field, Predicate::NotEq(value.into()))
    }

    /// Column is less than `value`.
    pub fn less_than(self, field: F, value: impl Into<FieldValue>) -> Self {
        self.with(field, Predicate::Lt(value.into()))
    }

    /// Column is greater than `value`.
    pub fn greater_than(self, field: F, value: impl Into<FieldValue>) -> Self {
        self.with(field, Predicate::Gt(value.into()))
    }

    /// Text column contains `needle`, ignoring case.
    pub fn contains(self, field: F, needle: impl Into<String>) -> Self {
        self.with(field, Predicate::Contains(needle.into()))
    }

    /// Column is null.
    pub fn is_null(self, field: F) -> Self {
        self.with(field, Predicate::IsNull)
    }

    /// Column equals one of `values`.
    pub fn any_of<V: Into<FieldValue>>(self, field: F, values: impl IntoIterator<Item = V>) -> Self {
        self.with(
            field,
            Predicate::AnyOf(values.into_iter().map(Into::into).collect()),
        )
    }

    /// See soft-deleted rows as well as active ones.
    pub fn include_deleted(self) -> Self {
        self.scoped(DeletionScope::IncludeDeleted)
    }

    /// See only soft-deleted rows.
    pub fn only_deleted(self) -> Self {
        self.scoped(DeletionScope::DeletedOnly)
    }

    /// Replace the deletion scope.
    pub fn scoped(mut self, deletion: DeletionScope) -> Self {
        self.deletion = deletion;
        self
    }

    /// Conditions in declaration order.
    pub fn conditions(&self) -> &[Condition<F>] {
        &self.conditions
    }

    /// Deletion scope.
    pub fn deletion(&self) -> DeletionScope {
        self.deletion
    }

    /// Evaluate the filter against an entity.
    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Entity<Field = F>,
    {
        self.deletion.admits(entity.is_deleted())
            && self
                .conditions
                .iter()
                .all(|condition| condition.predicate.matches(&entity.value(condition.field)))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// One ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    /// Column to order by.
    pub field: F,
    /// Sort direction.
    pub direction: Direction,
}

/// Change-tracking hint.
///
/// Reads default to [`Tracking::Disabled`]; callers enable tracking when they
/// intend to mutate and write back the instance in the same unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tracking {
    /// Read-only snapshot.
    #[default]
    Disabled,
    /// The caller intends to write the instance back.
    Enabled,
}

/// Query-shaping options: ordering, relationship includes, tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions<F> {
    order: Vec<OrderBy<F>>,
    include: Vec<F>,
    tracking: Tracking,
}

impl<F> Default for QueryOptions<F> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            include: Vec::new(),
            tracking: Tracking::default(),
        }
    }
}

impl<F: EntityField> QueryOptions<F> {
    /// Options with no ordering, no includes and tracking disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ordering key; earlier keys take precedence.
    pub fn order_by(mut self, field: F, direction: Direction) -> Self {
        self.order.push(OrderBy { field, direction });
        self
    }

    /// Request navigation of the relationship declared on `field`.
    pub fn include(mut self, field: F) -> Self {
        self.include.push(field);
        self
    }

    /// Set the tracking hint.
    pub fn tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// Ordering keys in precedence order.
    pub fn ordering(&self) -> &[OrderBy<F>] {
        &self.order
    }

    /// Requested relationship columns.
    pub fn includes(&self) -> &[F] {
        &self.include
    }

    /// Tracking hint.
    pub fn tracking_hint(&self) -> Tracking {
        self.tracking
    }

    /// Stable sort of `rows` by the ordering keys. Rows that compare equal
    /// keep their incoming order.
    pub fn sort<E>(&self, rows: &mut [E])
    where
        E: Entity<Field = F>,
    {
        if self.order.is_empty() {
            return;
        }
        rows.sort_by(|left, right| {
            self.order
                .iter()
                .map(|key| {
                    let ordering = left
                        .value(key.field)
                        .compare(&right.value(key.field))
                        .unwrap_or(Ordering::Equal);
                    match key.direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for predicate evaluation.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Predicate::Eq(FieldValue::Int(3)), FieldValue::Int(3), true)]
    #[case(Predicate::Eq(FieldValue::Int(3)), FieldValue::Text("3".into()), false)]
    #[case(Predicate::NotEq(FieldValue::Int(3)), FieldValue::Null, false)]
    #[case(Predicate::Lt(FieldValue::Int(3)), FieldValue::Int(2), true)]
    #[case(Predicate::Lt(FieldValue::Int(3)), FieldValue::Null, false)]
    #[case(Predicate::Gte(FieldValue::Int(3)), FieldValue::Int(3), true)]
    #[case(Predicate::Contains("LOG".into()), FieldValue::Text("Fix login".into()), true)]
    #[case(Predicate::Contains("x".into()), FieldValue::Int(1), false)]
    #[case(Predicate::IsNull, FieldValue::Null, true)]
    #[case(Predicate::IsNotNull, FieldValue::Null, false)]
    #[case(
        Predicate::AnyOf(vec![FieldValue::Int(1), FieldValue::Int(2)]),
        FieldValue::Int(2),
        true
    )]
    fn predicates_evaluate(
        #[case] predicate: Predicate,
        #[case] candidate: FieldValue,
        #[case] expected: bool,
    ) {
        assert_eq!(predicate.matches(&candidate), expected);
    }

    #[rstest]
    fn null_sorts_first() {
        assert_eq!(
            FieldValue::Null.compare(&FieldValue::Int(i64::MIN)),
            Some(Ordering::Less)
        );
        assert_eq!(FieldValue::Bool(true).compare(&FieldValue::Int(1)), None);
    }

    #[rstest]
    #[case(DeletionScope::Active, false, true)]
    #[case(DeletionScope::Active, true, false)]
    #[case(DeletionScope::IncludeDeleted, true, true)]
    #[case(DeletionScope::DeletedOnly, false, false)]
    fn deletion_scopes_admit_rows(
        #[case] scope: DeletionScope,
        #[case] is_deleted: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(scope.admits(is_deleted), expected);
    }
}
