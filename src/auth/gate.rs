//! Route guards
//!
//! Explicit, composable allow/deny decisions the route layer checks before
//! running handler logic. Stack order matters: the credential guard runs
//! before the role guard, and the admin denial is uniform so callers cannot
//! tell whether authentication or authorization failed.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::error;

use crate::auth::api_key::digest_api_key;
use crate::auth::jwt::{extract_token_from_header, Claims, TokenError};
use crate::db::schemas::UserDoc;
use crate::db::store::UserStore as _;
use crate::server::AppState;

const MISSING_HEADER: &str = "Missing or invalid Authorization header";
const TOKEN_REQUIRED: &str = "A valid authorization token is required";
const INACTIVE_ACCOUNT: &str = "Inactive account";
const INTERNAL_ERROR: &str = "Internal server error";
const USER_NOT_FOUND: &str = "User not found";
const ADMIN_FORBIDDEN: &str = "You don't have the permission to access the requested resource. \
     It is either read-protected or not readable by the server.";

/// A denied request: HTTP status plus the message for the error body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deny {
    pub status: StatusCode,
    pub message: &'static str,
}

impl Deny {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    /// Render the denial as a JSON error response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({ "error": self.message }).to_string();
        Response::builder()
            .status(self.status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }
}

/// Resolve an API key bearer credential to its user
///
/// Denials are deliberately three-way: a missing/malformed header (401) is
/// distinguishable from an empty token (400) and from a wrong or inactive
/// credential (403), so clients can tell absent from rejected.
pub async fn require_api_user(
    state: &AppState,
    auth_header: Option<&str>,
) -> Result<UserDoc, Deny> {
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => return Err(Deny::new(StatusCode::UNAUTHORIZED, MISSING_HEADER)),
    };

    if token.is_empty() {
        return Err(Deny::new(StatusCode::BAD_REQUEST, TOKEN_REQUIRED));
    }

    let digest = digest_api_key(token);
    let user = match state.users.find_by_key_digest(&digest).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Deny::new(StatusCode::FORBIDDEN, TOKEN_REQUIRED)),
        Err(e) => {
            error!("API key lookup failed: {}", e);
            return Err(Deny::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR));
        }
    };

    if !user.is_active {
        return Err(Deny::new(StatusCode::FORBIDDEN, INACTIVE_ACCOUNT));
    }

    Ok(user)
}

/// Resolve an access-token bearer credential to its user and claims
pub async fn require_token_user(
    state: &AppState,
    auth_header: Option<&str>,
) -> Result<(UserDoc, Claims), Deny> {
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => return Err(Deny::new(StatusCode::UNAUTHORIZED, MISSING_HEADER)),
    };

    if token.is_empty() {
        return Err(Deny::new(StatusCode::BAD_REQUEST, TOKEN_REQUIRED));
    }

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(e) => return Err(deny_token_error(e)),
    };

    let user = match state.users.find_by_id(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Deny::new(StatusCode::UNAUTHORIZED, USER_NOT_FOUND)),
        Err(e) => {
            error!("Token subject lookup failed: {}", e);
            return Err(Deny::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR));
        }
    };

    if !user.is_active {
        return Err(Deny::new(StatusCode::FORBIDDEN, INACTIVE_ACCOUNT));
    }

    Ok((user, claims))
}

/// Map a token validation failure to its HTTP denial
///
/// An unparseable bearer value is 422; a well-formed token that is expired,
/// revoked or wrongly signed is 401.
pub fn deny_token_error(e: TokenError) -> Deny {
    match e {
        TokenError::Malformed => Deny::new(StatusCode::UNPROCESSABLE_ENTITY, "Invalid access token"),
        TokenError::Expired => Deny::new(StatusCode::UNAUTHORIZED, "Token has expired"),
        TokenError::Revoked => Deny::new(StatusCode::UNAUTHORIZED, "Token has been revoked"),
        TokenError::Invalid => Deny::new(StatusCode::UNAUTHORIZED, "Invalid access token"),
        TokenError::Internal(detail) => {
            error!("Token service failure: {}", detail);
            Deny::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// Pure role check, applied after a credential guard
pub fn require_admin(user: &UserDoc) -> Result<(), Deny> {
    if user.is_admin {
        Ok(())
    } else {
        Err(Deny::new(StatusCode::FORBIDDEN, ADMIN_FORBIDDEN))
    }
}
