type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// No row matches the identifier.
    NotFound { entity: &'static str, id: String },
    /// A write referenced a row that does not exist in a related table.
    ///
    /// `relation` is the human-readable phrase of the referenced table
    /// (`user_account` becomes `user account`).
    ReferenceNotFound { relation: String, source: BoxError },
    /// The entity descriptor declares no identifier column.
    MissingIdentifier { entity: &'static str },
    /// The payload cannot be turned into a statement for this entity.
    InvalidPayload(String),
    /// Any other storage failure, carried unchanged.
    Database(BoxError),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `reposit-data-sqlx`) to wrap
    /// driver-specific errors without altering them.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DataError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound { .. })
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound { entity, id } => write!(f, "{entity} with id {id} not found"),
            DataError::ReferenceNotFound { relation, .. } => {
                write!(f, "{relation} id does not exist")
            }
            DataError::MissingIdentifier { entity } => {
                write!(f, "{entity} must declare an identifier column")
            }
            DataError::InvalidPayload(msg) => write!(f, "Invalid payload: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::ReferenceNotFound { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<crate::query::QueryError> for DataError {
    fn from(err: crate::query::QueryError) -> Self {
        DataError::InvalidPayload(err.to_string())
    }
}
