//! Access token issuance and validation
//!
//! Tokens are HS256-signed JWTs carrying the subject user id, a unique
//! token id (`jti`), issue/expiry timestamps and a freshness flag. The
//! revocation registry is injected so previously issued tokens can be
//! invalidated before their natural expiry (logout, refresh rotation).

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::revocation::RevocationRegistry;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id
    pub sub: String,
    /// Unique token id, the unit of revocation
    pub jti: String,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
    /// True when obtained by direct credential exchange, false via refresh
    pub fresh: bool,
}

/// Token validation failures
#[derive(Debug, Error)]
pub enum TokenError {
    /// The bearer value cannot be parsed as a token at all
    #[error("Invalid access token")]
    Malformed,

    /// Well-formed token with a bad signature or claim set
    #[error("Invalid access token")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Token error: {0}")]
    Internal(String),
}

/// Issues, validates, refreshes and revokes access tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
    revoked: Arc<RevocationRegistry>,
}

impl TokenService {
    /// Create a token service signing with `secret`
    pub fn new(secret: &str, ttl_seconds: u64, revoked: Arc<RevocationRegistry>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token is unusable the second it expires
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
            revoked,
        }
    }

    /// Issue a signed token for `user_id`
    pub fn issue(&self, user_id: &str, fresh: bool) -> Result<String, TokenError> {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
            fresh,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Internal(e.to_string()))
    }

    /// Validate a token: signature, then expiry, then revocation
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if self.revoked.is_revoked(&data.claims.jti) {
            return Err(TokenError::Revoked);
        }

        Ok(data.claims)
    }

    /// Exchange a valid token for a new non-fresh one
    ///
    /// The presented token is revoked as the refresh succeeds, so each token
    /// can be refreshed at most once.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.validate(token)?;
        self.revoked.mark_revoked(&claims.jti);
        self.issue(&claims.sub, false)
    }

    /// Revoke a token id (idempotent)
    pub fn revoke(&self, jti: &str) {
        self.revoked.mark_revoked(jti);
    }
}

/// Extract the bearer value from an `Authorization` header
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}
