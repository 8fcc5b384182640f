use crate::error::DataError;
use crate::value::FieldValue;
use std::fmt::Display;
use uuid::Uuid;

/// Identifier types an entity may use: integers, strings or UUIDs.
pub trait EntityId: Clone + Display + Into<FieldValue> + Send + Sync + 'static {}

impl EntityId for i32 {}
impl EntityId for i64 {}
impl EntityId for String {}
impl EntityId for Uuid {}

/// Trait describing a storable record type: its table, identifier column and
/// persisted column list.
///
/// Rows are materialized by the backend (e.g. `sqlx::FromRow`); this trait only
/// names the table and the columns the repository reads and writes.
///
/// # Example
///
/// ```ignore
/// impl Entity for Article {
///     type Id = i64;
///     fn table_name() -> &'static str { "articles" }
///     fn columns() -> &'static [&'static str] { &["id", "title", "body"] }
///     fn id(&self) -> &i64 { &self.id }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    type Id: EntityId;

    fn table_name() -> &'static str;

    /// The identifier column. `None` marks a descriptor without one, which
    /// makes every id-based operation fail with `DataError::MissingIdentifier`.
    fn id_column() -> Option<&'static str> {
        Some("id")
    }

    fn columns() -> &'static [&'static str];

    fn id(&self) -> &Self::Id;

    /// Name used in error messages. Defaults to the unqualified type name.
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    fn has_column(name: &str) -> bool {
        Self::columns().contains(&name)
    }

    /// The identifier column, or `MissingIdentifier` when the descriptor has none.
    fn checked_id_column() -> Result<&'static str, DataError> {
        Self::id_column().ok_or(DataError::MissingIdentifier {
            entity: Self::entity_name(),
        })
    }
}
