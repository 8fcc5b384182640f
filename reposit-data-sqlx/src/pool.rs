use reposit_core::DatabaseConfig;
use reposit_data::DataError;
use sqlx::pool::PoolOptions;
use sqlx::Pool;

use crate::backend::SqlBackend;
use crate::error::SqlxErrorExt;

/// Open a connection pool from the `database` configuration section.
pub async fn connect<DB: SqlBackend>(config: &DatabaseConfig) -> Result<Pool<DB>, DataError> {
    let pool = PoolOptions::<DB>::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;

    tracing::info!(
        backend = DB::NAME,
        max_connections = config.max_connections,
        "database pool ready"
    );
    Ok(pool)
}
