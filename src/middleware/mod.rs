pub mod auth;
pub mod require_role;
pub mod response;
pub mod validate_tenant;
pub mod validate_user;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use require_role::{require_admin, require_curriculum_staff};
pub use response::{deleted, ApiResponse, ApiResult};
pub use validate_tenant::validate_tenant_middleware;
pub use validate_user::{validate_user_middleware, TenantPool, ValidatedUser};
