//! First-boot superuser creation
//!
//! Called once from `main` after the store is selected. When the directory
//! is empty, creates an active administrator so the API is reachable on a
//! fresh deployment. Subsequent boots are a no-op.

use tracing::{info, warn};

use crate::auth::api_key::{digest_api_key, generate_api_key};
use crate::config::Args;
use crate::db::store::{NewUser, StoreError, UserStore};

/// Ensure an administrator exists, creating one when the directory is empty
///
/// Returns the generated plaintext API key when a superuser was created
/// without an explicit `--admin-api-key` (the only time it is recoverable).
pub async fn ensure_admin(
    store: &dyn UserStore,
    args: &Args,
) -> Result<Option<String>, StoreError> {
    if store.count().await? > 0 {
        return Ok(None);
    }

    let (plaintext, digest) = match &args.admin_api_key {
        Some(key) => (None, digest_api_key(key)),
        None => {
            let (key, digest) = generate_api_key();
            (Some(key), digest)
        }
    };

    store
        .create(NewUser {
            first_name: Some("admin".to_string()),
            last_name: Some("admin".to_string()),
            email: args.admin_email.clone(),
            is_admin: true,
            is_active: true,
            hashed_api_key: digest,
        })
        .await?;

    info!("Created first-boot superuser '{}'", args.admin_email);
    if let Some(ref key) = plaintext {
        warn!(
            "Generated superuser API key: {} (save it now, it cannot be recovered)",
            key
        );
    }

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryUserStore;
    use clap::Parser;

    fn args() -> Args {
        Args::parse_from(["gatehouse", "--dev-mode", "--admin-email", "root@local"])
    }

    #[tokio::test]
    async fn test_creates_admin_when_empty() {
        let store = MemoryUserStore::new();
        let key = ensure_admin(&store, &args()).await.unwrap();

        assert!(key.is_some());
        let admin = store.find_by_email("root@local").await.unwrap().unwrap();
        assert!(admin.is_admin);
        assert!(admin.is_active);
        assert_eq!(admin.hashed_api_key, digest_api_key(&key.unwrap()));
    }

    #[tokio::test]
    async fn test_noop_when_directory_not_empty() {
        let store = MemoryUserStore::new();
        ensure_admin(&store, &args()).await.unwrap();
        let second = ensure_admin(&store, &args()).await.unwrap();

        assert!(second.is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_explicit_key_is_used_and_not_returned() {
        let store = MemoryUserStore::new();
        let args = Args::parse_from([
            "gatehouse",
            "--dev-mode",
            "--admin-api-key",
            "chosen-key",
        ]);

        let returned = ensure_admin(&store, &args).await.unwrap();
        assert!(returned.is_none());

        let admin = store
            .find_by_key_digest(&digest_api_key("chosen-key"))
            .await
            .unwrap();
        assert!(admin.is_some());
    }
}
