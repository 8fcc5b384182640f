use once_cell::sync::Lazy;
use regex::Regex;
use reposit_data::DataError;

use crate::backend::SqlBackend;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Use `.into_data_error()` instead. The error is carried
/// unchanged, `RowNotFound` included.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        DataError::database(self)
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;

static REFERENCED_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"table "(.+?)""#).expect("valid referenced table regex"));

/// The table named in a foreign-key violation message, if any.
///
/// ```
/// use reposit_data_sqlx::error::foreign_key_relation;
///
/// let detail = r#"Key (owner_id)=(5) is not present in table "user_account"."#;
/// assert_eq!(foreign_key_relation(detail), Some("user_account"));
/// assert_eq!(foreign_key_relation("FOREIGN KEY constraint failed"), None);
/// ```
pub fn foreign_key_relation(message: &str) -> Option<&str> {
    REFERENCED_TABLE_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `user_account` becomes `user account`.
pub fn relation_phrase(table: &str) -> String {
    table.replace('_', " ")
}

/// Turn a foreign-key violation raised by an insert into
/// `DataError::ReferenceNotFound`. Anything else, including violations whose
/// message names no table, is returned untouched.
pub(crate) fn translate_insert_error<DB: SqlBackend>(err: DataError) -> DataError {
    let relation = match &err {
        DataError::Database(source) => match source.downcast_ref::<sqlx::Error>() {
            Some(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                foreign_key_relation(&DB::diagnostic(&**db_err)).map(relation_phrase)
            }
            _ => None,
        },
        _ => None,
    };

    match (relation, err) {
        (Some(relation), DataError::Database(source)) => {
            tracing::debug!(%relation, "foreign key violation translated");
            DataError::ReferenceNotFound { relation, source }
        }
        (_, err) => err,
    }
}
