//! Generic [`Repository`] adapter over a [`MemoryStore`].

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageRequest, Paginated};
use tracing::debug;

use crate::domain::ports::{Repository, RepositoryError, UserAccountRepository};
use crate::domain::{
    AccountChanges, CodePurpose, Entity, EntityField, EntityId, Filter, QueryOptions,
    Relationship, UserAccount,
};

use super::store::{MemoryStore, table, table_mut};

/// Repository of `E` rows held in a shared [`MemoryStore`].
///
/// Rows come back in insertion order unless the options order them.
pub struct MemoryRepository<E> {
    store: Arc<MemoryStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for MemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> MemoryRepository<E> {
    /// Repository over `store`.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn check_includes(&self, options: &QueryOptions<E::Field>) -> Result<(), RepositoryError> {
        let relationships = self.store.relationships();
        match options
            .includes()
            .iter()
            .find(|field| !Relationship::declares::<E>(relationships, **field))
        {
            Some(field) => Err(RepositoryError::invalid_include(E::KIND, field.name())),
            None => Ok(()),
        }
    }

    async fn select(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
    ) -> Result<Vec<E>, RepositoryError> {
        self.check_includes(options)?;
        let tables = self.store.read().await;
        let mut rows: Vec<E> = table::<E>(&tables)?
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|row| filter.matches(*row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        options.sort(&mut rows);
        Ok(rows)
    }

    fn stamp_new(entity: &mut E, now: DateTime<Utc>, actor: Option<EntityId>) {
        if !entity.id().is_assigned() {
            entity.assign_id(EntityId::random());
        }
        entity.audit_mut().mark_created(now, actor);
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn get_all(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
    ) -> Result<Vec<E>, RepositoryError> {
        self.select(filter, options).await
    }

    async fn get_all_paginated(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
        page: PageRequest,
    ) -> Result<Paginated<E>, RepositoryError> {
        let rows = self.select(filter, options).await?;
        let total = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        Ok(Paginated::new(page.apply(rows), page, total))
    }

    async fn get(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
    ) -> Result<Option<E>, RepositoryError> {
        Ok(self.select(filter, options).await?.into_iter().next())
    }

    async fn count(&self, filter: &Filter<E::Field>) -> Result<u64, RepositoryError> {
        let tables = self.store.read().await;
        let count = table::<E>(&tables)?
            .map_or(0, |table| table.rows.iter().filter(|row| filter.matches(*row)).count());
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn add(&self, mut entity: E, actor: Option<EntityId>) -> Result<E, RepositoryError> {
        let now = self.store.now();
        let mut tables = self.store.write().await;
        let table = table_mut::<E>(&mut tables)?;
        Self::stamp_new(&mut entity, now, actor);
        if table.position(entity.id()).is_some() {
            return Err(RepositoryError::conflict(format!(
                "{} {} already exists",
                E::KIND,
                entity.id()
            )));
        }
        table.rows.push(entity.clone());
        Ok(entity)
    }

    async fn add_range(
        &self,
        entities: Vec<E>,
        actor: Option<EntityId>,
    ) -> Result<Vec<E>, RepositoryError> {
        let now = self.store.now();
        let mut tables = self.store.write().await;
        let table = table_mut::<E>(&mut tables)?;
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(entities.len());
        for mut entity in entities {
            Self::stamp_new(&mut entity, now, actor);
            if table.position(entity.id()).is_some() || !seen.insert(entity.id()) {
                return Err(RepositoryError::conflict(format!(
                    "{} {} already exists",
                    E::KIND,
                    entity.id()
                )));
            }
            staged.push(entity);
        }
        table.rows.extend(staged.iter().cloned());
        Ok(staged)
    }

    async fn update(&self, mut entity: E, actor: Option<EntityId>) -> Result<E, RepositoryError> {
        let now = self.store.now();
        let mut tables = self.store.write().await;
        let table = table_mut::<E>(&mut tables)?;
        let stored = table
            .live_position(entity.id())
            .and_then(|index| table.rows.get_mut(index))
            .ok_or_else(|| RepositoryError::not_found(E::KIND, entity.id()))?;
        let mut audit = stored.audit().clone();
        audit.mark_updated(now, actor);
        *entity.audit_mut() = audit;
        *stored = entity.clone();
        Ok(entity)
    }

    async fn soft_delete(
        &self,
        id: EntityId,
        actor: Option<EntityId>,
    ) -> Result<(), RepositoryError> {
        match self.soft_delete_matching(&[id], actor).await? {
            0 => Err(RepositoryError::not_found(E::KIND, id)),
            _ => Ok(()),
        }
    }

    async fn soft_delete_matching(
        &self,
        ids: &[EntityId],
        actor: Option<EntityId>,
    ) -> Result<u64, RepositoryError> {
        let now = self.store.now();
        let wanted: HashSet<EntityId> = ids.iter().copied().collect();
        let mut tables = self.store.write().await;
        let table = table_mut::<E>(&mut tables)?;
        let mut flagged = 0_u64;
        for row in table
            .rows
            .iter_mut()
            .filter(|row| !row.is_deleted() && wanted.contains(&row.id()))
        {
            row.audit_mut().mark_deleted(now, actor);
            flagged += 1;
        }
        debug!(entity = E::KIND, flagged, "soft deleted rows");
        Ok(flagged)
    }

    async fn hard_delete(&self, id: EntityId) -> Result<(), RepositoryError> {
        match self.hard_delete_matching(&[id]).await? {
            0 => Err(RepositoryError::not_found(E::KIND, id)),
            _ => Ok(()),
        }
    }

    async fn hard_delete_matching(&self, ids: &[EntityId]) -> Result<u64, RepositoryError> {
        let mut tables = self.store.write().await;
        let roots: HashSet<EntityId> = match table::<E>(&tables)? {
            Some(table) => table
                .rows
                .iter()
                .map(Entity::id)
                .filter(|id| ids.contains(id))
                .collect(),
            None => HashSet::new(),
        };
        if roots.is_empty() {
            return Ok(0);
        }
        let plan = self.store.plan_delete(&tables, E::KIND, roots)?;
        self.store.apply_delete(&mut tables, &plan);
        let removed = plan.removed(E::KIND);
        debug!(entity = E::KIND, removed, "hard deleted rows");
        Ok(removed)
    }
}

#[async_trait]
impl UserAccountRepository for MemoryRepository<UserAccount> {
    async fn consume_code(
        &self,
        user_id: EntityId,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.store.write().await;
        let table = table_mut::<UserAccount>(&mut tables)?;
        let Some(account) = table
            .live_position(user_id)
            .and_then(|index| table.rows.get_mut(index))
        else {
            return Ok(false);
        };
        let slot = account.code_mut(purpose);
        let redeemable = slot
            .as_ref()
            .is_some_and(|stored| stored.value == code && !stored.is_expired(now));
        if redeemable {
            *slot = None;
        }
        Ok(redeemable)
    }

    async fn apply_changes(
        &self,
        user_id: EntityId,
        changes: &AccountChanges,
        actor: Option<EntityId>,
    ) -> Result<UserAccount, RepositoryError> {
        let now = self.store.now();
        let mut tables = self.store.write().await;
        let table = table_mut::<UserAccount>(&mut tables)?;
        let account = table
            .live_position(user_id)
            .and_then(|index| table.rows.get_mut(index))
            .ok_or_else(|| RepositoryError::not_found(UserAccount::KIND, user_id))?;
        changes.apply_to(account);
        account.audit.mark_updated(now, actor);
        Ok(account.clone())
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
