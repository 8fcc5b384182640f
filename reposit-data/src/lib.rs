//! Backend-neutral data access contract: entity descriptors, payloads,
//! typed errors, pagination, SQL building and the [`Repository`] trait.

pub mod entity;
pub mod error;
pub mod page;
pub mod query;
pub mod record;
pub mod repository;
mod ser;
pub mod value;

pub use entity::{Entity, EntityId};
pub use error::DataError;
pub use page::{Page, Pageable};
pub use query::{Dialect, QueryBuilder, QueryError};
pub use record::{Payload, Record};
pub use repository::Repository;
pub use value::FieldValue;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        DataError, Entity, FieldValue, Page, Pageable, Payload, QueryBuilder, Record, Repository,
    };
}
