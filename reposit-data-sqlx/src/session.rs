//! Unit-of-work handle shared by repositories.
//!
//! A [`Session`] owns a pool handle and lazily opens a transaction on the
//! first statement. [`commit`](Session::commit) and
//! [`rollback`](Session::rollback) end it; the next statement opens a new one.
//! Dropping a session with an open transaction rolls it back.

use std::ops::{Deref, DerefMut};

use reposit_data::{DataError, Entity, FieldValue, QueryBuilder};
use sqlx::{FromRow, Pool, Transaction};

use crate::backend::SqlBackend;
use crate::error::SqlxErrorExt;

/// Trait for application states that contain a database pool.
///
/// ```ignore
/// impl HasPool<Sqlite> for MyState {
///     fn pool(&self) -> &Pool<Sqlite> {
///         &self.pool
///     }
/// }
/// ```
pub trait HasPool<DB: sqlx::Database> {
    fn pool(&self) -> &Pool<DB>;
}

pub struct Session<DB: SqlBackend> {
    pool: Pool<DB>,
    tx: Option<Transaction<'static, DB>>,
}

impl<DB: SqlBackend> Session<DB> {
    pub fn new(pool: Pool<DB>) -> Self {
        Self { pool, tx: None }
    }

    pub fn from_state<S: HasPool<DB>>(state: &S) -> Self {
        Self::new(state.pool().clone())
    }

    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// The connection of the open transaction, beginning one if needed.
    pub async fn connection(&mut self) -> Result<&mut DB::Connection, DataError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let tx = DB::begin(&self.pool)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                tracing::trace!(backend = DB::NAME, "transaction started");
                tx
            }
        };
        Ok(&mut **self.tx.insert(tx))
    }

    /// Commit the open transaction. Does nothing when none is open.
    pub async fn commit(&mut self) -> Result<(), DataError> {
        if let Some(tx) = self.tx.take() {
            DB::commit(tx).await.map_err(SqlxErrorExt::into_data_error)?;
            tracing::trace!(backend = DB::NAME, "transaction committed");
        }
        Ok(())
    }

    /// Roll back the open transaction. Does nothing when none is open.
    pub async fn rollback(&mut self) -> Result<(), DataError> {
        if let Some(tx) = self.tx.take() {
            DB::rollback(tx).await.map_err(SqlxErrorExt::into_data_error)?;
            tracing::trace!(backend = DB::NAME, "transaction rolled back");
        }
        Ok(())
    }

    /// Run a statement inside the open unit of work and return the number of
    /// affected rows.
    pub async fn execute(&mut self, sql: &str, params: Vec<FieldValue>) -> Result<u64, DataError> {
        tracing::debug!(%sql, binds = params.len(), "execute");
        let conn = self.connection().await?;
        DB::execute(conn, sql.to_string(), params)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    /// Run a query inside the open unit of work and materialize every row.
    pub async fn fetch_all<T>(&mut self, sql: &str, params: Vec<FieldValue>) -> Result<Vec<T>, DataError>
    where
        T: for<'r> FromRow<'r, DB::Row> + Send + Unpin + 'static,
    {
        tracing::debug!(%sql, binds = params.len(), "fetch");
        let conn = self.connection().await?;
        DB::fetch_all::<T>(conn, sql.to_string(), params)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn fetch_count(&mut self, sql: &str, params: Vec<FieldValue>) -> Result<u64, DataError> {
        tracing::debug!(%sql, binds = params.len(), "count");
        let conn = self.connection().await?;
        let count = DB::fetch_count(conn, sql.to_string(), params)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Re-read an entity from storage by its identifier.
    ///
    /// Fails with `NotFound` when the row no longer exists.
    pub async fn refresh<T>(&mut self, entity: &T) -> Result<T, DataError>
    where
        T: Entity + for<'r> FromRow<'r, DB::Row>,
    {
        self.find_by_id::<T>(entity.id())
            .await?
            .ok_or_else(|| DataError::not_found(T::entity_name(), entity.id()))
    }

    pub(crate) async fn find_by_id<T>(&mut self, id: &T::Id) -> Result<Option<T>, DataError>
    where
        T: Entity + for<'r> FromRow<'r, DB::Row>,
    {
        let id_column = T::checked_id_column()?;
        let (sql, params) = QueryBuilder::new_with_dialect(T::table_name(), DB::DIALECT)
            .where_eq(id_column, id.clone())
            .build_select(T::columns())?;
        Ok(self.fetch_all::<T>(&sql, params).await?.into_iter().next())
    }
}

impl<DB: SqlBackend> std::fmt::Debug for Session<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &DB::NAME)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

/// Guard over a session for the duration of one write operation.
///
/// Unless the operation settles it through [`finish`](Self::finish) or
/// [`abort`](Self::abort), dropping the guard
/// (for instance because the operation's future was cancelled) drops the open
/// transaction, which rolls it back.
pub(crate) struct InFlight<'a, DB: SqlBackend> {
    session: &'a mut Session<DB>,
    armed: bool,
    operation: &'static str,
}

impl<'a, DB: SqlBackend> InFlight<'a, DB> {
    pub(crate) fn arm(session: &'a mut Session<DB>, operation: &'static str) -> Self {
        Self {
            session,
            armed: true,
            operation,
        }
    }

    /// Commit the operation's work when `commit` is set, otherwise leave it
    /// staged in the open transaction.
    pub(crate) async fn finish(mut self, commit: bool) -> Result<(), DataError> {
        self.armed = false;
        if !commit {
            return Ok(());
        }
        match self.session.commit().await {
            Ok(()) => {
                tracing::info!(operation = self.operation, "committed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(operation = self.operation, error = %err, "commit failed");
                Err(err)
            }
        }
    }

    /// Leave the open transaction untouched.
    #[cfg(test)]
    pub(crate) fn release(mut self) {
        self.armed = false;
    }

    /// Roll back, then hand back `err` unchanged.
    pub(crate) async fn abort(mut self, err: DataError) -> DataError {
        self.armed = false;
        match self.session.rollback().await {
            Ok(()) => {
                tracing::warn!(operation = self.operation, error = %err, "rolled back");
            }
            Err(rollback_err) => {
                tracing::warn!(
                    operation = self.operation,
                    error = %err,
                    rollback_error = %rollback_err,
                    "rollback failed"
                );
            }
        }
        err
    }
}

impl<DB: SqlBackend> Deref for InFlight<'_, DB> {
    type Target = Session<DB>;

    fn deref(&self) -> &Session<DB> {
        self.session
    }
}

impl<DB: SqlBackend> DerefMut for InFlight<'_, DB> {
    fn deref_mut(&mut self) -> &mut Session<DB> {
        self.session
    }
}

impl<DB: SqlBackend> Drop for InFlight<'_, DB> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(tx) = self.session.tx.take() {
            drop(tx);
            tracing::warn!(
                operation = self.operation,
                "operation interrupted, transaction rolled back"
            );
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Sqlite;

    async fn pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE note (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn count_notes(session: &mut Session<Sqlite>) -> u64 {
        session
            .fetch_count(r#"SELECT COUNT(*) FROM "note""#, vec![])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn transaction_begins_lazily_and_commit_ends_it() {
        let mut session = Session::new(pool().await);
        assert!(!session.in_transaction());
        session.commit().await.unwrap();

        session
            .execute(r#"INSERT INTO "note" ("body") VALUES (?)"#, vec!["a".into()])
            .await
            .unwrap();
        assert!(session.in_transaction());

        session.commit().await.unwrap();
        assert!(!session.in_transaction());
        assert_eq!(count_notes(&mut session).await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_statements() {
        let mut session = Session::new(pool().await);
        session
            .execute(r#"INSERT INTO "note" ("body") VALUES (?)"#, vec!["a".into()])
            .await
            .unwrap();
        session.rollback().await.unwrap();
        assert_eq!(count_notes(&mut session).await, 0);
    }

    #[tokio::test]
    async fn dropped_guard_rolls_back() {
        let mut session = Session::new(pool().await);
        {
            let mut guard = InFlight::arm(&mut session, "test");
            guard
                .execute(r#"INSERT INTO "note" ("body") VALUES (?)"#, vec!["lost".into()])
                .await
                .unwrap();
            // Dropped without being settled, as a cancelled future would be.
        }
        assert!(!session.in_transaction());
        assert_eq!(count_notes(&mut session).await, 0);
    }

    #[tokio::test]
    async fn released_guard_keeps_transaction_open() {
        let mut session = Session::new(pool().await);
        let mut guard = InFlight::arm(&mut session, "test");
        guard
            .execute(r#"INSERT INTO "note" ("body") VALUES (?)"#, vec!["kept".into()])
            .await
            .unwrap();
        guard.release();
        assert!(session.in_transaction());
        session.commit().await.unwrap();
        assert_eq!(count_notes(&mut session).await, 1);
    }

    #[tokio::test]
    async fn abort_returns_the_original_error() {
        let mut session = Session::new(pool().await);
        let mut guard = InFlight::arm(&mut session, "test");
        guard
            .execute(r#"INSERT INTO "note" ("body") VALUES (?)"#, vec!["x".into()])
            .await
            .unwrap();
        let err = guard.abort(DataError::not_found("Note", 7)).await;
        assert_eq!(err.to_string(), "Note with id 7 not found");
        assert_eq!(count_notes(&mut session).await, 0);
    }
}
