use futures_util::future::BoxFuture;
use reposit_data::{Dialect, FieldValue};
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::types::Json;
use sqlx::{Arguments, FromRow, Pool, Sqlite, Transaction};

use super::SqlBackend;

fn arguments<'q>(params: Vec<FieldValue>) -> Result<SqliteArguments<'q>, sqlx::Error> {
    let mut args = SqliteArguments::default();
    for param in params {
        match param {
            FieldValue::Null => args.add(None::<i64>),
            FieldValue::Bool(v) => args.add(v),
            FieldValue::Int(v) => args.add(v),
            FieldValue::Float(v) => args.add(v),
            FieldValue::Text(v) => args.add(v),
            FieldValue::Uuid(v) => args.add(v),
            FieldValue::Timestamp(v) => args.add(v),
            FieldValue::Json(v) => args.add(Json(v)),
        }
        .map_err(sqlx::Error::Encode)?;
    }
    Ok(args)
}

impl SqlBackend for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
    // SQLITE_MAX_VARIABLE_NUMBER of the bundled library.
    const MAX_BIND_PARAMS: usize = 32_766;

    fn begin(pool: &Pool<Self>) -> BoxFuture<'_, Result<Transaction<'static, Self>, sqlx::Error>> {
        Box::pin(pool.begin())
    }

    fn commit(tx: Transaction<'static, Self>) -> BoxFuture<'static, Result<(), sqlx::Error>> {
        Box::pin(tx.commit())
    }

    fn rollback(tx: Transaction<'static, Self>) -> BoxFuture<'static, Result<(), sqlx::Error>> {
        Box::pin(tx.rollback())
    }

    fn fetch_all<'c, T>(
        conn: &'c mut SqliteConnection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<Vec<T>, sqlx::Error>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
    {
        Box::pin(async move {
            let args = arguments(params)?;
            sqlx::query_as_with::<Sqlite, T, _>(&sql, args)
                .fetch_all(conn)
                .await
        })
    }

    fn fetch_count<'c>(
        conn: &'c mut SqliteConnection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<i64, sqlx::Error>> {
        Box::pin(async move {
            let args = arguments(params)?;
            sqlx::query_scalar_with::<Sqlite, i64, _>(&sql, args)
                .fetch_one(conn)
                .await
        })
    }

    fn execute<'c>(
        conn: &'c mut SqliteConnection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<u64, sqlx::Error>> {
        Box::pin(async move {
            let args = arguments(params)?;
            let done = sqlx::query_with::<Sqlite, _>(&sql, args)
                .execute(conn)
                .await?;
            Ok(done.rows_affected())
        })
    }
}
