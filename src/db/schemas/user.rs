//! User record schema
//!
//! The single persisted entity: account identity, role flags and the
//! hashed API key credential.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User record as stored (and as passed around internally)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// Opaque unique identifier (UUIDv4)
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Unique, required
    pub email: String,

    #[serde(default)]
    pub is_admin: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// SHA-256 hex digest of the current API key
    pub hashed_api_key: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user record with a fresh id and timestamps
    pub fn new(
        first_name: Option<String>,
        last_name: Option<String>,
        email: String,
        is_admin: bool,
        is_active: bool,
        hashed_api_key: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            first_name,
            last_name,
            email,
            is_admin,
            is_active,
            hashed_api_key,
            created_at: now,
            updated_at: now,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on id (application-level identifier)
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("id_unique".to_string())
                        .build(),
                ),
            ),
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Index on hashed_api_key for credential lookups
            (
                doc! { "hashed_api_key": 1 },
                Some(
                    IndexOptions::builder()
                        .name("hashed_api_key_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
