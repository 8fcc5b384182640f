use futures_util::future::BoxFuture;
use reposit_data::{Dialect, FieldValue};
use sqlx::encode::IsNull;
use sqlx::error::{BoxDynError, DatabaseError};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnection, PgDatabaseError, PgRow, PgTypeInfo,
};
use sqlx::types::Json;
use sqlx::{Arguments, Encode, FromRow, Pool, Postgres, Transaction, Type};

use super::SqlBackend;

/// A NULL bound with an unspecified type so the server infers it from the
/// target column.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

fn arguments(params: Vec<FieldValue>) -> Result<PgArguments, sqlx::Error> {
    let mut args = PgArguments::default();
    for param in params {
        match param {
            FieldValue::Null => args.add(UntypedNull),
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

impl SqlBackend for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
    const MAX_BIND_PARAMS: usize = u16::MAX as usize;

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
        conn: &'c mut PgConnection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<Vec<T>, sqlx::Error>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
    {
        Box::pin(async move {
            let args = arguments(params)?;
            sqlx::query_as_with::<Postgres, T, _>(&sql, args)
                .fetch_all(conn)
                .await
        })
    }

    fn fetch_count<'c>(
        conn: &'c mut PgConnection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<i64, sqlx::Error>> {
        Box::pin(async move {
            let args = arguments(params)?;
            sqlx::query_scalar_with::<Postgres, i64, _>(&sql, args)
                .fetch_one(conn)
                .await
        })
    }

    fn execute<'c>(
        conn: &'c mut PgConnection,
        sql: String,
        params: Vec<FieldValue>,
    ) -> BoxFuture<'c, Result<u64, sqlx::Error>> {
        Box::pin(async move {
            let args = arguments(params)?;
            let done = sqlx::query_with::<Postgres, _>(&sql, args)
                .execute(conn)
                .await?;
            Ok(done.rows_affected())
        })
    }

    /// The `DETAIL` line names the referenced table, so it is searched first.
    fn diagnostic(err: &(dyn DatabaseError + 'static)) -> String {
        match err.try_downcast_ref::<PgDatabaseError>() {
            Some(pg) => match pg.detail() {
                Some(detail) => format!("{detail}\n{}", pg.message()),
                None => pg.message().to_string(),
            },
            None => err.message().to_string(),
        }
    }
}
