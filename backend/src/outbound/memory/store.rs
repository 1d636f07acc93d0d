//! Shared in-memory table set with relationship-aware hard deletes.
//!
//! Every entity type gets its own insertion-ordered table keyed by
//! [`Entity::KIND`]. Hard deletes are planned in full (cascades, then
//! restrict checks, then detaches) before any row is touched, so a blocked
//! delete leaves every table unchanged.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::domain::ports::RepositoryError;
use crate::domain::{Entity, EntityField, EntityId, OnDelete, Relationship, duty_schema};

/// Type-erased view of a table used by the delete planner.
pub(crate) trait StoredTable: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// `(row id, referenced id)` for present rows whose `column` points at
    /// one of `parents`.
    fn referencing(&self, column: &str, parents: &HashSet<EntityId>) -> Vec<(EntityId, EntityId)>;

    /// Physically remove the rows; returns how many were removed.
    fn remove(&mut self, ids: &HashSet<EntityId>) -> u64;

    /// Clear `column` on rows pointing at one of `parents`.
    fn detach(&mut self, column: &str, parents: &HashSet<EntityId>);
}

/// Insertion-ordered rows of one entity type.
#[derive(Debug)]
pub(crate) struct Table<E> {
    pub(crate) rows: Vec<E>,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<E: Entity> Table<E> {
    pub(crate) fn position(&self, id: EntityId) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    pub(crate) fn live_position(&self, id: EntityId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.id() == id && !row.is_deleted())
    }
}

impl<E: Entity> StoredTable for Table<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn referencing(&self, column: &str, parents: &HashSet<EntityId>) -> Vec<(EntityId, EntityId)> {
        let Some(field) = E::Field::from_name(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| {
                row.value(field)
                    .as_id()
                    .filter(|parent| parents.contains(parent))
                    .map(|parent| (row.id(), parent))
            })
            .collect()
    }

    fn remove(&mut self, ids: &HashSet<EntityId>) -> u64 {
        let before = self.rows.len();
        self.rows.retain(|row| !ids.contains(&row.id()));
        u64::try_from(before - self.rows.len()).unwrap_or(u64::MAX)
    }

    fn detach(&mut self, column: &str, parents: &HashSet<EntityId>) {
        let Some(field) = E::Field::from_name(column) else {
            return;
        };
        for row in &mut self.rows {
            if row
                .value(field)
                .as_id()
                .is_some_and(|parent| parents.contains(&parent))
            {
                row.detach(field);
            }
        }
    }
}

pub(crate) type Tables = HashMap<&'static str, Box<dyn StoredTable>>;

/// Rows to remove and references to clear for one hard delete.
#[derive(Debug, Default)]
pub(crate) struct DeletePlan {
    removals: HashMap<&'static str, HashSet<EntityId>>,
    detaches: Vec<(&'static str, &'static str, HashSet<EntityId>)>,
}

impl DeletePlan {
    /// Number of rows of `kind` the plan removes.
    pub(crate) fn removed(&self, kind: &str) -> u64 {
        self.removals
            .get(kind)
            .map_or(0, |ids| u64::try_from(ids.len()).unwrap_or(u64::MAX))
    }
}

/// In-memory storage shared by every [`super::MemoryRepository`].
pub struct MemoryStore {
    tables: RwLock<Tables>,
    relationships: Vec<Relationship>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Store enforcing the duty management relationship policy.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_relationships(clock, duty_schema())
    }

    /// Store enforcing a custom relationship policy.
    pub fn with_relationships(clock: Arc<dyn Clock>, relationships: Vec<Relationship>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            relationships,
            clock,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    pub(crate) fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }

    /// Plan the hard delete of `roots` in `kind`.
    pub(crate) fn plan_delete(
        &self,
        tables: &Tables,
        kind: &'static str,
        roots: HashSet<EntityId>,
    ) -> Result<DeletePlan, RepositoryError> {
        let mut plan = DeletePlan::default();
        let mut queue = VecDeque::from([(kind, roots.clone())]);
        plan.removals.insert(kind, roots);

        while let Some((parent, ids)) = queue.pop_front() {
            for rel in self.edges(parent, OnDelete::Cascade) {
                let Some(child) = tables.get(rel.child) else {
                    continue;
                };
                let planned = plan.removals.entry(rel.child).or_default();
                let fresh: HashSet<EntityId> = child
                    .referencing(rel.column, &ids)
                    .into_iter()
                    .map(|(row, _)| row)
                    .filter(|row| planned.insert(*row))
                    .collect();
                if !fresh.is_empty() {
                    queue.push_back((rel.child, fresh));
                }
            }
        }

        for rel in self
            .relationships
            .iter()
            .filter(|rel| rel.on_delete == OnDelete::Restrict)
        {
            let (Some(parents), Some(child)) =
                (plan.removals.get(rel.parent), tables.get(rel.child))
            else {
                continue;
            };
            let removed_children = plan.removals.get(rel.child);
            let blocker = child
                .referencing(rel.column, parents)
                .into_iter()
                .find(|(row, _)| removed_children.is_none_or(|ids| !ids.contains(row)));
            if let Some((_, parent_id)) = blocker {
                debug!(parent = rel.parent, child = rel.child, column = rel.column, "hard delete restricted");
                return Err(RepositoryError::restricted(rel.parent, parent_id, rel.child));
            }
        }

        for rel in self
            .relationships
            .iter()
            .filter(|rel| rel.on_delete == OnDelete::Detach)
        {
            if let Some(parents) = plan.removals.get(rel.parent) {
                plan.detaches
                    .push((rel.child, rel.column, parents.clone()));
            }
        }
        Ok(plan)
    }

    /// Apply a plan produced by [`Self::plan_delete`] under the same lock.
    pub(crate) fn apply_delete(&self, tables: &mut Tables, plan: &DeletePlan) {
        for (kind, ids) in &plan.removals {
            if let Some(table) = tables.get_mut(kind) {
                table.remove(ids);
            }
        }
        for (child, column, parents) in &plan.detaches {
            if let Some(table) = tables.get_mut(child) {
                table.detach(column, parents);
            }
        }
    }

    fn edges(&self, parent: &str, on_delete: OnDelete) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |rel| rel.parent == parent && rel.on_delete == on_delete)
    }
}

/// Typed read access to the table of `E`.
pub(crate) fn table<E: Entity>(tables: &Tables) -> Result<Option<&Table<E>>, RepositoryError> {
    tables
        .get(E::KIND)
        .map(|table| {
            table
                .as_any()
                .downcast_ref::<Table<E>>()
                .ok_or_else(|| type_mismatch::<E>())
        })
        .transpose()
}

/// Typed write access to the table of `E`, creating it on first use.
pub(crate) fn table_mut<E: Entity>(tables: &mut Tables) -> Result<&mut Table<E>, RepositoryError> {
    tables
        .entry(E::KIND)
        .or_insert_with(|| Box::new(Table::<E>::default()))
        .as_any_mut()
        .downcast_mut::<Table<E>>()
        .ok_or_else(type_mismatch::<E>)
}

fn type_mismatch<E: Entity>() -> RepositoryError {
    RepositoryError::query(format!(
        "table {} holds rows of another type",
        E::KIND
    ))
}
