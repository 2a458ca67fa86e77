//! Configuration for Gatehouse
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Gatehouse - API-key and access-token authentication service
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse")]
#[command(about = "Authentication and user-management API")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store fallback, default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "gatehouse")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOKEN_TTL_SECONDS", default_value = "900")]
    pub token_ttl_seconds: u64,

    /// Maximum page size accepted by the user listing endpoint
    #[arg(long, env = "MAX_PER_PAGE", default_value = "1000")]
    pub max_per_page: i64,

    /// Email for the superuser created on first boot
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@localhost")]
    pub admin_email: String,

    /// Explicit API key for the first-boot superuser (generated if unset)
    #[arg(long, env = "ADMIN_API_KEY")]
    pub admin_api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    ///
    /// `validate()` rejects a missing secret outside dev mode, so the
    /// fallback below is only reachable in development.
    pub fn jwt_secret(&self) -> String {
        self.jwt_secret
            .clone()
            .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.token_ttl_seconds == 0 {
            return Err("TOKEN_TTL_SECONDS must be greater than zero".to_string());
        }

        if self.max_per_page < 1 {
            return Err("MAX_PER_PAGE must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_requires_jwt_secret() {
        let args = Args::parse_from(["gatehouse"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["gatehouse", "--jwt-secret", "s3cret"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_falls_back_to_default_secret() {
        let args = Args::parse_from(["gatehouse", "--dev-mode"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "dev-only-insecure-secret");
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["gatehouse", "--dev-mode"]);
        assert_eq!(args.token_ttl_seconds, 900);
        assert_eq!(args.max_per_page, 1000);
        assert_eq!(args.admin_email, "admin@localhost");
    }
}
