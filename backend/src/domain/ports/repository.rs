//! Generic repository port shared by every entity type.
//!
//! One contract serves users, teams, projects, duties, comments and their
//! join rows. Reads exclude soft-deleted rows unless the filter's
//! [`DeletionScope`](crate::domain::DeletionScope) says otherwise; hard
//! deletes follow the declared relationship policy.

use async_trait::async_trait;
use pagination::{PageRequest, Paginated};

use crate::domain::{Direction, Entity, EntityId, Filter, QueryOptions, Tracking};

use super::define_port_error;

define_port_error! {
    /// Errors raised by repository adapters.
    pub enum RepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "repository query failed: {message}",
        /// No live row carries the identity.
        NotFound { entity: String, id: EntityId } => "{entity} {id} not found",
        /// A restrict relationship blocks the hard delete.
        Restricted { entity: String, id: EntityId, dependent: String } =>
            "{entity} {id} is still referenced by {dependent}",
        /// A uniqueness or integrity constraint rejected the write.
        Conflict { message: String } => "repository conflict: {message}",
        /// The requested include is not a declared relationship column.
        InvalidInclude { entity: String, column: String } =>
            "{column} is not a relationship of {entity}",
    }
}

/// Uniform data access over an entity type.
///
/// # Soft deletion
///
/// - Default reads, [`Repository::count`] and [`Repository::get_by_id`] skip
///   soft-deleted rows.
/// - [`Repository::update`] and [`Repository::soft_delete`] treat a
///   soft-deleted row as missing.
/// - Hard deletes remove physically present rows whether or not they are
///   soft deleted.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Every row matching `filter`, shaped by `options`.
    async fn get_all(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
    ) -> Result<Vec<E>, RepositoryError>;

    /// One page of the rows matching `filter`. A page past the end is empty.
    async fn get_all_paginated(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
        page: PageRequest,
    ) -> Result<Paginated<E>, RepositoryError>;

    /// First row matching `filter`; absence is not an error.
    async fn get(
        &self,
        filter: &Filter<E::Field>,
        options: &QueryOptions<E::Field>,
    ) -> Result<Option<E>, RepositoryError>;

    /// Live row with the given identity.
    async fn get_by_id(&self, id: EntityId) -> Result<Option<E>, RepositoryError> {
        let filter = Filter::by_id(id);
        let options = QueryOptions::default();
        self.get(&filter, &options).await
    }

    /// Number of rows matching `filter`.
    async fn count(&self, filter: &Filter<E::Field>) -> Result<u64, RepositoryError>;

    /// Persist a new entity, assigning its identity when unassigned and
    /// stamping creation audit columns.
    async fn add(&self, entity: E, actor: Option<EntityId>) -> Result<E, RepositoryError>;

    /// Persist several new entities as one write.
    async fn add_range(
        &self,
        entities: Vec<E>,
        actor: Option<EntityId>,
    ) -> Result<Vec<E>, RepositoryError>;

    /// Persist changes to a live entity. Creation and deletion audit columns
    /// are kept from storage; only the update columns are stamped.
    async fn update(&self, entity: E, actor: Option<EntityId>) -> Result<E, RepositoryError>;

    /// Flag a live row as deleted.
    async fn soft_delete(&self, id: EntityId, actor: Option<EntityId>)
    -> Result<(), RepositoryError>;

    /// Flag every live row among `ids` as deleted, returning how many were.
    async fn soft_delete_matching(
        &self,
        ids: &[EntityId],
        actor: Option<EntityId>,
    ) -> Result<u64, RepositoryError>;

    /// Irreversibly remove a row, applying the relationship policy.
    async fn hard_delete(&self, id: EntityId) -> Result<(), RepositoryError>;

    /// Irreversibly remove every present row among `ids` as one write,
    /// returning how many rows of this entity type were removed.
    async fn hard_delete_matching(&self, ids: &[EntityId]) -> Result<u64, RepositoryError>;

    /// Lazy query handle; nothing runs until it is materialised.
    fn find(&self, filter: Filter<E::Field>, tracking: Tracking) -> Query<'_, E, Self>
    where
        Self: Sized,
    {
        Query {
            repository: self,
            filter,
            options: QueryOptions::new().tracking(tracking),
        }
    }
}

/// Composable, not yet executed query against a [`Repository`].
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use duty_backend::domain::ports::Repository;
/// use duty_backend::domain::{Direction, Duty, DutyField, EntityId, Filter, Tracking};
/// use duty_backend::outbound::memory::{MemoryRepository, MemoryStore};
/// use mockable::DefaultClock;
///
/// # futures::executor::block_on(async {
/// let store = Arc::new(MemoryStore::new(Arc::new(DefaultClock)));
/// let duties = MemoryRepository::<Duty>::new(store);
/// let project = EntityId::random();
/// duties.add(Duty::new(project, "b"), None).await.expect("add");
/// duties.add(Duty::new(project, "a"), None).await.expect("add");
///
/// let first = duties
///     .find(Filter::all().equals(DutyField::ProjectId, project), Tracking::Disabled)
///     .order_by(DutyField::Title, Direction::Ascending)
///     .first()
///     .await
///     .expect("query");
/// assert_eq!(first.map(|d| d.title), Some("a".to_owned()));
/// # });
/// ```
pub struct Query<'r, E: Entity, R: ?Sized> {
    repository: &'r R,
    filter: Filter<E::Field>,
    options: QueryOptions<E::Field>,
}

impl<'r, E, R> Query<'r, E, R>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    /// Refine the filter.
    pub fn filter(mut self, refine: impl FnOnce(Filter<E::Field>) -> Filter<E::Field>) -> Self {
        self.filter = refine(self.filter);
        self
    }

    /// Append an ordering key.
    pub fn order_by(mut self, field: E::Field, direction: Direction) -> Self {
        self.options = self.options.order_by(field, direction);
        self
    }

    /// Request a relationship include.
    pub fn include(mut self, field: E::Field) -> Self {
        self.options = self.options.include(field);
        self
    }

    /// Materialise every matching row.
    pub async fn load(self) -> Result<Vec<E>, RepositoryError> {
        self.repository.get_all(&self.filter, &self.options).await
    }

    /// Materialise one page.
    pub async fn page(self, page: PageRequest) -> Result<Paginated<E>, RepositoryError> {
        self.repository
            .get_all_paginated(&self.filter, &self.options, page)
            .await
    }

    /// Materialise the first matching row.
    pub async fn first(self) -> Result<Option<E>, RepositoryError> {
        self.repository.get(&self.filter, &self.options).await
    }

    /// Count matching rows.
    pub async fn count(self) -> Result<u64, RepositoryError> {
        self.repository.count(&self.filter).await
    }

    /// Whether any row matches.
    pub async fn exists(self) -> Result<bool, RepositoryError> {
        Ok(self.count().await? > 0)
    }
}
