//! Gatehouse - API-key and access-token authentication service
//!
//! Clients authenticate with a permanent opaque API key, stored only as a
//! one-way digest, or with a short-lived signed access token derived from
//! it. Protected routes are gated by role (standard vs. administrator).
//!
//! ## Modules
//!
//! - **auth**: credential hashing, token issuance/validation/revocation,
//!   and the composable route guards
//! - **db**: the user directory behind a store trait (in-memory and
//!   MongoDB implementations) plus the first-boot superuser bootstrap
//! - **server**: hyper HTTP server and request dispatch
//! - **routes**: the `/api/v1` endpoint handlers

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, serve, AppState};
pub use types::{GatehouseError, Result};
