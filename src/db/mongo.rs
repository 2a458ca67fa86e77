//! MongoDB client, collection wrapper and the production user store

use bson::{doc, Document};
use futures_util::StreamExt;
use mongodb::{
    options::{FindOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::db::store::{NewUser, StoreError, UserPage, UserStore, UserUpdate};
use crate::types::GatehouseError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, GatehouseError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GatehouseError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GatehouseError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its schema indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, GatehouseError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, GatehouseError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), GatehouseError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| GatehouseError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Get the underlying collection
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// MongoDB-backed user directory
pub struct MongoUserStore {
    users: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    /// Create the store, applying the user collection's indexes
    pub async fn new(client: &MongoClient) -> Result<Self, GatehouseError> {
        let users = client.collection::<UserDoc>(USER_COLLECTION).await?;
        Ok(Self { users })
    }
}

/// Translate a MongoDB write error, mapping duplicate-key violations of the
/// unique email index to `EmailExists`
fn map_write_error(e: mongodb::error::Error) -> StoreError {
    let text = e.to_string();
    if text.contains("duplicate key") || text.contains("E11000") {
        StoreError::EmailExists
    } else {
        error!("MongoDB write failed: {}", text);
        StoreError::Internal(text)
    }
}

fn map_read_error(e: mongodb::error::Error) -> StoreError {
    let text = e.to_string();
    error!("MongoDB read failed: {}", text);
    StoreError::Internal(text)
}

#[async_trait::async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_key_digest(&self, digest: &str) -> Result<Option<UserDoc>, StoreError> {
        self.users
            .inner()
            .find_one(doc! { "hashed_api_key": digest })
            .await
            .map_err(map_read_error)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>, StoreError> {
        self.users
            .inner()
            .find_one(doc! { "id": id })
            .await
            .map_err(map_read_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, StoreError> {
        self.users
            .inner()
            .find_one(doc! { "email": email })
            .await
            .map_err(map_read_error)
    }

    async fn create(&self, new: NewUser) -> Result<UserDoc, StoreError> {
        // The unique index still guards the check-then-insert race
        if self.find_by_email(&new.email).await?.is_some() {
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

        self.users
            .inner()
            .insert_one(&user)
            .await
            .map_err(map_write_error)?;

        Ok(user)
    }

    async fn update(&self, id: &str, update: UserUpdate) -> Result<UserDoc, StoreError> {
        if let Some(ref email) = update.email {
            if let Some(existing) = self.find_by_email(email).await? {
                if existing.id != id {
                    return Err(StoreError::EmailExists);
                }
            }
        }

        let mut set = doc! { "updated_at": bson::DateTime::now() };
        if let Some(first_name) = update.first_name {
            set.insert("first_name", first_name);
        }
        if let Some(last_name) = update.last_name {
            set.insert("last_name", last_name);
        }
        if let Some(email) = update.email {
            set.insert("email", email);
        }
        if let Some(is_admin) = update.is_admin {
            set.insert("is_admin", is_admin);
        }
        if let Some(is_active) = update.is_active {
            set.insert("is_active", is_active);
        }
        if let Some(hashed_api_key) = update.hashed_api_key {
            set.insert("hashed_api_key", hashed_api_key);
        }

        let result = self
            .users
            .inner()
            .update_one(doc! { "id": id }, doc! { "$set": set })
            .await
            .map_err(map_write_error)?;

        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }

        self.find_by_id(id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = self
            .users
            .inner()
            .delete_one(doc! { "id": id })
            .await
            .map_err(map_write_error)?;

        if result.deleted_count == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<UserPage, StoreError> {
        let total_items = self
            .users
            .inner()
            .count_documents(doc! {})
            .await
            .map_err(map_read_error)?;

        let total_pages = total_items.div_ceil(per_page as u64) as u32;

        if page > 1 && page > total_pages {
            return Err(StoreError::PageOutOfRange);
        }

        let skip = ((page - 1) as u64) * (per_page as u64);
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "id": 1 })
            .skip(skip)
            .limit(per_page as i64)
            .build();

        let mut cursor = self
            .users
            .inner()
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(map_read_error)?;

        let mut users = Vec::new();
        while let Some(result) = cursor.next().await {
            users.push(result.map_err(map_read_error)?);
        }

        Ok(UserPage {
            users,
            total_items,
            total_pages,
            page,
            per_page,
        })
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.users
            .inner()
            .count_documents(doc! {})
            .await
            .map_err(map_read_error)
    }
}
