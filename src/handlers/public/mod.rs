// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and service liveness. No middleware layers.

pub mod login; // POST /auth/login - authenticate and get JWT

pub use login::login_post;
