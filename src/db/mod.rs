//! User directory persistence

pub mod bootstrap;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use mongo::{MongoClient, MongoUserStore};
pub use schemas::{UserDoc, USER_COLLECTION};
pub use store::{MemoryUserStore, NewUser, StoreError, UserPage, UserStore, UserUpdate};
