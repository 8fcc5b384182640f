//! # reposit-data-sqlx — SQLx backend for the reposit data layer
//!
//! This crate runs the [`reposit_data::Repository`] contract against a real
//! database through [SQLx](https://github.com/launchbadge/sqlx).
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Unit-of-work handle: pool plus a lazily opened transaction |
//! | [`SqlxRepository`] | Generic repository borrowing a `Session` for one entity type |
//! | [`HasPool`] | Trait for application states that contain a database pool |
//! | [`SqlBackend`] | Driver glue, implemented for `Sqlite` and `Postgres` |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`connect`] | Builds an `sqlx::Pool` from a [`DatabaseConfig`](reposit_core::DatabaseConfig) |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` (default) |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//!
//! # Quick start
//!
//! ```ignore
//! use reposit_data_sqlx::prelude::*;
//! use sqlx::Sqlite;
//!
//! let pool = connect::<Sqlite>(&config).await?;
//! let mut session = Session::new(pool);
//! let mut items = SqlxRepository::<Item, Sqlite>::new(&mut session);
//!
//! let item = items.create(&Record::new().set("name", "Widget")).await?;
//! let same = items.get_by_id(&item.id).await?;
//! ```
//!
//! # Transactions
//!
//! Every write runs in the session's open transaction and commits on success.
//! A failing write rolls back before its error is returned, and a write whose
//! future is dropped mid-flight rolls back as well. Group several writes with
//! [`SqlxRepository::transaction`].
//!
//! # Error bridging
//!
//! Foreign-key violations raised by `create` and `create_many` become
//! `DataError::ReferenceNotFound` when the driver names the referenced
//! table; every other driver error is carried unchanged in
//! `DataError::Database`.

pub mod backend;
pub mod error;
pub mod pool;
pub mod repository;
pub mod session;

pub use backend::SqlBackend;
pub use error::{SqlxErrorExt, SqlxResult};
pub use pool::connect;
pub use repository::SqlxRepository;
pub use session::{HasPool, Session};

/// Re-exports of the most commonly used types from both `reposit-data` and this crate.
pub mod prelude {
    pub use crate::{connect, HasPool, Session, SqlBackend, SqlxErrorExt, SqlxRepository};
    pub use reposit_data::prelude::*;
}
