//! Persisted document schemas

pub mod user;

pub use user::{UserDoc, USER_COLLECTION};
