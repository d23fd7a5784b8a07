pub mod auth;
pub mod db;
pub mod server;
pub mod user;
