//! User directory storage
//!
//! The `UserStore` trait is the seam between the auth core and persistence.
//! Production uses the MongoDB-backed implementation in `db::mongo`; tests
//! and dev mode use the in-memory implementation here. Route code is
//! backend-agnostic.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;

use crate::db::schemas::UserDoc;

/// Storage failures surfaced by the user directory
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already exists")]
    EmailExists,

    #[error("user not found")]
    NotFound,

    #[error("page out of range")]
    PageOutOfRange,

    #[error("storage error: {0}")]
    Internal(String),
}

/// Fields for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub hashed_api_key: String,
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    pub hashed_api_key: Option<String>,
}

/// One page of users, ordered by creation time ascending
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<UserDoc>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page: u32,
    pub per_page: u32,
}

impl UserPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// User directory operations
///
/// Mutations persist immediately; a failed write leaves prior state intact
/// and surfaces `StoreError::Internal`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup by hashed credential
    async fn find_by_key_digest(&self, digest: &str) -> Result<Option<UserDoc>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, StoreError>;

    /// Create a user; fails with `EmailExists` on a duplicate email
    async fn create(&self, new: NewUser) -> Result<UserDoc, StoreError>;

    /// Apply a partial update; fails with `NotFound`, or `EmailExists` when
    /// the new email collides with a different user
    async fn update(&self, id: &str, update: UserUpdate) -> Result<UserDoc, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Page through users ordered by creation time ascending
    ///
    /// `page` and `per_page` are 1-based and must be positive (the route
    /// layer rejects other values). `PageOutOfRange` when `page` lies past
    /// the last page.
    async fn list(&self, page: u32, per_page: u32) -> Result<UserPage, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// In-memory user directory for tests and dev mode
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserDoc>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    fn email_taken(&self, email: &str, excluding_id: Option<&str>) -> bool {
        self.users
            .iter()
            .any(|entry| entry.email == email && Some(entry.id.as_str()) != excluding_id)
    }

    fn sorted_users(&self) -> Vec<UserDoc> {
        let mut users: Vec<UserDoc> = self.users.iter().map(|entry| entry.clone()).collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        users
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_key_digest(&self, digest: &str) -> Result<Option<UserDoc>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.hashed_api_key == digest)
            .map(|entry| entry.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.clone()))
    }

    async fn create(&self, new: NewUser) -> Result<UserDoc, StoreError> {
        if self.email_taken(&new.email, None) {
            return Err(StoreError::EmailExists);
        }

        let user = UserDoc::new(
            new.first_name,
            new.last_name,
            new.email,
            new.is_admin,
            new.is_active,
            new.hashed_api_key,
        );
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update(&self, id: &str, update: UserUpdate) -> Result<UserDoc, StoreError> {
        if let Some(ref email) = update.email {
            if self.email_taken(email, Some(id)) {
                return Err(StoreError::EmailExists);
            }
        }

        let mut entry = self.users.get_mut(id).ok_or(StoreError::NotFound)?;

        if let Some(first_name) = update.first_name {
            entry.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            entry.last_name = Some(last_name);
        }
        if let Some(email) = update.email {
            entry.email = email;
        }
        if let Some(is_admin) = update.is_admin {
            entry.is_admin = is_admin;
        }
        if let Some(is_active) = update.is_active {
            entry.is_active = is_active;
        }
        if let Some(hashed_api_key) = update.hashed_api_key {
            entry.hashed_api_key = hashed_api_key;
        }
        entry.updated_at = Utc::now();

        Ok(entry.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.users
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<UserPage, StoreError> {
        let users = self.sorted_users();
        let total_items = users.len() as u64;
        let total_pages = total_items.div_ceil(per_page as u64) as u32;

        if page > 1 && page > total_pages {
            return Err(StoreError::PageOutOfRange);
        }

        let start = ((page - 1) as usize) * (per_page as usize);
        let users = users
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        Ok(UserPage {
            users,
            total_items,
            total_pages,
            page,
            per_page,
        })
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.len() as u64)
    }
}
