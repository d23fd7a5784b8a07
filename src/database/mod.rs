pub mod entity;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;

pub use entity::{Dependent, TenantEntity, TenantSource};
pub use manager::{ConstraintViolation, DatabaseError, DatabaseManager};
pub use repository::{ListParams, Repository};
