// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware -> role gate -> validate_user_middleware
//             -> validate_tenant_middleware (curriculum routes only)

pub mod catalog; // /api/<entity> - PL, CPL, CPMK, MK, BK, Kurikulum
pub mod cpl_mk; // /api/mapping/cpl-mk - links with status and weight
pub mod mapping; // /api/mapping/<pair> - plain link tables
pub mod program_studi; // /api/program-studi - admin only
pub mod roles; // /api/roles
pub mod session; // /api/auth/* - whoami, refresh
pub mod users; // /api/users - admin only

pub use session::{refresh_post, whoami_get};
