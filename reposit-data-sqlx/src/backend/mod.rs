//! Per-driver statement execution.
//!
//! Every call returns a boxed `Send` future so generic repository code can
//! await it without naming the driver's executor types.

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

use futures_util::future::BoxFuture;
use reposit_data::{Dialect, FieldValue};
use sqlx::error::DatabaseError;
use sqlx::{Database, FromRow, Pool, Transaction};

/// A SQLx driver the repository can run against.
pub trait SqlBackend: Database {
    /// SQL flavour used when rendering statements for this driver.
    const DIALECT: Dialect;

    /// Most bind parameters one statement may carry.
    const MAX_BIND_PARAMS: usize;

    fn begin(pool: &Pool<Self>) -> BoxFuture<'_, Result<Transaction<'static, Self>, sqlx::Error>>;

    fn commit(tx: Transaction<'static, Self>) -> BoxFuture<'static, Result<(), sqlx::Error>>;

    fn rollback(tx: Transaction<'static, Self>) -> BoxFuture<'static, Result<(), sqlx::Error>>;

    fn fetch_all<'c, T>(
        conn: &'c mut Self::Connection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<Vec<T>, sqlx::Error>>
    where
        T: for<'r> FromRow<'r, Self::Row> + Send + Unpin + 'static;

    /// Run a statement returning a single integer, such as `COUNT(*)`.
    fn fetch_count<'c>(
        conn: &'c mut Self::Connection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<i64, sqlx::Error>>;

    /// Run a statement and return the number of affected rows.
    fn execute<'c>(
        conn: &'c mut Self::Connection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<u64, sqlx::Error>>;

    /// The text searched for a referenced table name when a statement
    /// violates a foreign key.
    fn diagnostic(err: &(dyn DatabaseError + 'static)) -> String {
        err.message().to_string()
    }
}
