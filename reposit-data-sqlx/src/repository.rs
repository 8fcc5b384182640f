use std::marker::PhantomData;

use futures_util::future::BoxFuture;
use reposit_data::{
    DataError, Entity, FieldValue, Page, Pageable, Payload, QueryBuilder, Record, Repository,
};
use sqlx::FromRow;

use crate::backend::SqlBackend;
use crate::error::translate_insert_error;
use crate::session::{InFlight, Session};

/// The generic repository over one entity type, bound to a borrowed session.
///
/// Each write commits the session's unit of work on success and rolls it back
/// on failure. Inside [`transaction`](Self::transaction) the commit is left to
/// the enclosing scope.
///
/// # Example
///
/// ```ignore
/// let mut session = Session::new(pool.clone());
/// let mut repo = SqlxRepository::<Article, Sqlite>::new(&mut session);
/// let article = repo.create(&Record::new().set("title", "Hello")).await?;
/// ```
pub struct SqlxRepository<'s, T, DB: SqlBackend> {
    session: &'s mut Session<DB>,
    scoped: bool,
    _marker: PhantomData<T>,
}

impl<'s, T, DB> SqlxRepository<'s, T, DB>
where
    T: Entity + for<'r> FromRow<'r, DB::Row>,
    DB: SqlBackend,
{
    pub fn new(session: &'s mut Session<DB>) -> Self {
        Self {
            session,
            scoped: false,
            _marker: PhantomData,
        }
    }

    /// The session this repository runs on, for custom statements.
    pub fn session(&mut self) -> &mut Session<DB> {
        self.session
    }

    /// Create a `QueryBuilder` pre-configured for this entity's table and
    /// the session's dialect.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new_with_dialect(T::table_name(), DB::DIALECT)
    }

    /// Select every declared column of the rows matching `query`.
    pub async fn find_where(&mut self, query: QueryBuilder) -> Result<Vec<T>, DataError> {
        let (sql, params) = query.dialect(DB::DIALECT).build_select(T::columns())?;
        self.session.fetch_all::<T>(&sql, params).await
    }

    /// Run `block` as one unit of work.
    ///
    /// On `Ok`, commits when `autocommit` is set and otherwise leaves the
    /// work staged for the caller to commit through the session. On `Err`,
    /// rolls back and returns the block's error unchanged. Writes made by the
    /// scoped repository do not commit on their own.
    ///
    /// ```ignore
    /// repo.transaction(true, |repo| Box::pin(async move {
    ///     let owner = repo.create(&new_owner).await?;
    ///     repo.update(&owner.id, &promote).await
    /// })).await?;
    /// ```
    pub async fn transaction<F, R>(&mut self, autocommit: bool, block: F) -> Result<R, DataError>
    where
        F: for<'c> FnOnce(&'c mut SqlxRepository<'_, T, DB>) -> BoxFuture<'c, Result<R, DataError>>
            + Send,
        R: Send,
    {
        let commit = autocommit && !self.scoped;
        let mut guard = InFlight::arm(&mut *self.session, "transaction");
        let outcome = {
            let mut scoped = SqlxRepository::<T, DB> {
                session: &mut guard,
                scoped: true,
                _marker: PhantomData,
            };
            block(&mut scoped).await
        };
        match outcome {
            Ok(value) => {
                guard.finish(commit).await?;
                Ok(value)
            }
            Err(err) => Err(guard.abort(err).await),
        }
    }

    fn ensure_known_fields(record: &Record) -> Result<(), DataError> {
        match record.fields().find(|field| !T::has_column(field)) {
            Some(field) => Err(DataError::InvalidPayload(format!(
                "{} has no column `{field}`",
                T::entity_name()
            ))),
            None => Ok(()),
        }
    }
}

impl<T, DB> Repository<T> for SqlxRepository<'_, T, DB>
where
    T: Entity + for<'r> FromRow<'r, DB::Row>,
    DB: SqlBackend,
{
    async fn get_all(&mut self, skip: u64, limit: u64) -> Result<Vec<T>, DataError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut query = self.query().limit(limit);
        if skip > 0 {
            query = query.offset(skip);
        }
        self.find_where(query).await
    }

    async fn get_by_id(&mut self, id: &T::Id) -> Result<Option<T>, DataError> {
        self.session.find_by_id::<T>(id).await
    }

    async fn create<P: Payload + ?Sized>(&mut self, payload: &P) -> Result<T, DataError> {
        let record = payload.to_record()?;
        Self::ensure_known_fields(&record)?;
        let columns: Vec<&str> = record.fields().collect();
        let row = record.iter().map(|(_, value)| Some(value.clone())).collect();
        let (sql, params) = self.query().build_insert(&columns, vec![row], T::columns())?;

        let commit = !self.scoped;
        let mut guard = InFlight::arm(&mut *self.session, "create");
        let inserted = match guard.fetch_all::<T>(&sql, params).await {
            Ok(rows) => rows.into_iter().next(),
            Err(err) => return Err(guard.abort(translate_insert_error::<DB>(err)).await),
        };
        let Some(inserted) = inserted else {
            let err = DataError::database(sqlx::Error::RowNotFound);
            return Err(guard.abort(err).await);
        };
        guard.finish(commit).await?;

        tracing::debug!(table = T::table_name(), id = %inserted.id(), "created");
        match T::id_column() {
            Some(_) => self.session.refresh(&inserted).await,
            None => Ok(inserted),
        }
    }

    async fn create_many<P: Payload>(&mut self, payloads: &[P]) -> Result<Vec<T>, DataError> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        let records = payloads
            .iter()
            .map(Payload::to_record)
            .collect::<Result<Vec<_>, _>>()?;
        for record in &records {
            Self::ensure_known_fields(record)?;
        }

        // Union of every payload's fields, in first-seen order.
        let mut columns: Vec<&str> = Vec::new();
        for field in records.iter().flat_map(Record::fields) {
            if !columns.contains(&field) {
                columns.push(field);
            }
        }

        let statements = if columns.is_empty() {
            // No payload sets a field: one DEFAULT VALUES row each.
            let statement = self.query().build_insert(&[], vec![Vec::new()], T::columns())?;
            vec![statement; records.len()]
        } else {
            let rows: Vec<Vec<Option<FieldValue>>> = records
                .iter()
                .map(|record| columns.iter().map(|c| record.get(c).cloned()).collect())
                .collect();
            let statement = self.query().build_insert(&columns, rows, T::columns())?;
            if statement.1.len() > DB::MAX_BIND_PARAMS {
                return Err(DataError::InvalidPayload(format!(
                    "{} rows bind {} values, over the {} limit of {} per statement",
                    records.len(),
                    statement.1.len(),
                    DB::NAME,
                    DB::MAX_BIND_PARAMS
                )));
            }
            vec![statement]
        };

        let commit = !self.scoped;
        let mut guard = InFlight::arm(&mut *self.session, "create_many");
        let mut inserted = Vec::with_capacity(records.len());
        for (sql, params) in statements {
            match guard.fetch_all::<T>(&sql, params).await {
                Ok(rows) => inserted.extend(rows),
                Err(err) => return Err(guard.abort(translate_insert_error::<DB>(err)).await),
            }
        }
        guard.finish(commit).await?;

        tracing::debug!(table = T::table_name(), rows = inserted.len(), "created in bulk");
        Ok(inserted)
    }

    async fn update<P: Payload + ?Sized>(&mut self, id: &T::Id, payload: &P) -> Result<T, DataError> {
        let id_column = T::checked_id_column()?;
        let mut record = payload.to_record()?;
        record.remove(id_column);
        Self::ensure_known_fields(&record)?;

        if record.is_empty() {
            return self
                .session
                .find_by_id::<T>(id)
                .await?
                .ok_or_else(|| DataError::not_found(T::entity_name(), id));
        }

        let (sql, params) = self
            .query()
            .where_eq(id_column, id.clone())
            .build_update(&record, &[])?;

        let commit = !self.scoped;
        let mut guard = InFlight::arm(&mut *self.session, "update");
        let affected = match guard.execute(&sql, params).await {
            Ok(affected) => affected,
            Err(err) => return Err(guard.abort(err).await),
        };
        if affected == 0 {
            let err = DataError::not_found(T::entity_name(), id);
            return Err(guard.abort(err).await);
        }
        guard.finish(commit).await?;

        tracing::debug!(table = T::table_name(), %id, fields = record.len(), "updated");
        self.session
            .find_by_id::<T>(id)
            .await?
            .ok_or_else(|| DataError::not_found(T::entity_name(), id))
    }

    async fn delete(&mut self, id: &T::Id) -> Result<(), DataError> {
        let id_column = T::checked_id_column()?;
        let (sql, params) = self.query().where_eq(id_column, id.clone()).build_delete()?;

        let commit = !self.scoped;
        let mut guard = InFlight::arm(&mut *self.session, "delete");
        let affected = match guard.execute(&sql, params).await {
            Ok(affected) => affected,
            Err(err) => return Err(guard.abort(err).await),
        };
        if affected == 0 {
            let err = DataError::not_found(T::entity_name(), id);
            return Err(guard.abort(err).await);
        }
        guard.finish(commit).await?;

        tracing::debug!(table = T::table_name(), %id, "deleted");
        Ok(())
    }

    async fn count(&mut self) -> Result<u64, DataError> {
        let (sql, params) = self.query().build_count()?;
        self.session.fetch_count(&sql, params).await
    }

    async fn get_page(&mut self, pageable: &Pageable) -> Result<Page<T>, DataError> {
        let total = self.count().await?;
        if pageable.size == 0 {
            return Ok(Page::new(Vec::new(), pageable, total));
        }

        let mut query = self.query().limit(pageable.size).offset(pageable.offset());
        match pageable.sort_order() {
            Some((column, ascending)) if T::has_column(column) => {
                query = query.order_by(column, ascending);
            }
            requested => {
                if let Some((column, _)) = requested {
                    tracing::debug!(table = T::table_name(), column, "ignoring unknown sort column");
                }
                if let Some(id_column) = T::id_column() {
                    query = query.order_by(id_column, true);
                }
            }
        }

        let content = self.find_where(query).await?;
        Ok(Page::new(content, pageable, total))
    }
}
