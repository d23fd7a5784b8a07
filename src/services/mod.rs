pub mod catalog_service;
pub mod cpl_mk_service;
pub mod mapping_plan;
pub mod mapping_service;
pub mod program_studi_service;
pub mod user_service;

use uuid::Uuid;

use crate::auth::PasswordError;
use crate::database::DatabaseError;
use crate::validation::FieldErrors;

pub use catalog_service::CatalogService;
pub use cpl_mk_service::CplMkService;
pub use mapping_service::MappingService;
pub use program_studi_service::ProgramStudiService;
pub use user_service::UserService;

/// Business-rule failures shared by every service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("{message}")]
    Duplicate { field: String, message: String },
    #[error("{field} references missing rows: {ids:?}")]
    MissingReferences { field: String, ids: Vec<Uuid> },
    #[error("{0}")]
    InUse(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    NotFound(String),
    #[error("User program studi not found")]
    NoProgramStudi,
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Database(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

impl ServiceError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        ServiceError::Validation(errors)
    }
}
