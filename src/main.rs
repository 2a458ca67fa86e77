//! Gatehouse - API-key and access-token authentication service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse::{
    config::Args,
    db::{self, MemoryUserStore, MongoClient, MongoUserStore, UserStore},
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gatehouse={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Gatehouse - Authentication API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Token TTL: {}s", args.token_ttl_seconds);
    info!("======================================");

    // Select the user store: MongoDB, with an in-memory fallback in dev mode
    let users: Arc<dyn UserStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
        .await
    {
        Ok(client) => match MongoUserStore::new(&client).await {
            Ok(store) => {
                info!("MongoDB user store ready");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize MongoDB user store: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Arc::new(MemoryUserStore::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // First-boot superuser: created once when the directory is empty
    match db::bootstrap::ensure_admin(users.as_ref(), &args).await {
        Ok(_) => {}
        Err(e) => {
            error!("Superuser bootstrap failed: {}", e);
            std::process::exit(1);
        }
    }

    // Create application state and serve
    let state = Arc::new(server::AppState::new(args, users));
    server::run(state).await?;

    Ok(())
}
