use crate::db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read from storage: {0}")]
    PersistenceRead(#[source] DbError),
    #[error("Failed to write to storage: {0}")]
    PersistenceWrite(#[source] DbError),
    #[error("Failed to encode collection {0}: {1}")]
    Encode(String, #[source] serde_json::Error),
    #[error("Sample catalog is malformed: {0}")]
    SampleData(#[source] serde_json::Error),
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

/// Input the catalog refuses to store. Nothing is written when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("name {0:?} does not contain any letters or digits")]
    InvalidName(String),
    #[error("a category named {0:?} already exists")]
    DuplicateCategory(String),
    #[error("category {0:?} does not exist")]
    UnknownCategory(String),
    #[error("category {0:?} is the fallback category and cannot be deleted")]
    ProtectedCategory(String),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("comment must not be empty")]
    EmptyComment,
}

pub type CatalogResult<T> = Result<T, CatalogError>;
