// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) -> Protected (JWT auth, then role gate, user check and
// tenant scope as the route group requires). Role gates live in the
// router, so handlers only ever see callers that are allowed in.
pub mod params;
pub mod protected;
pub mod public;
