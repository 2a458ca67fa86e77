//! Authentication endpoints
//!
//! - `POST /api/v1/auth`    - exchange an API key for an access token
//! - `POST /api/v1/refresh` - rotate an access token (one-time per token)
//! - `POST /api/v1/logout`  - revoke the presented access token

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::auth::gate::{deny_token_error, Deny};
use crate::auth::{extract_token_from_header, require_api_user};
use crate::routes::{get_auth_header, json_response, message_response};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// POST /api/v1/auth
///
/// The API-key path: on a verified credential, issue a fresh access token.
pub async fn login(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let user = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };

    match state.tokens.issue(&user.id, true) {
        Ok(access_token) => {
            info!("Issued access token for \"{}\"", user.email);
            json_response(StatusCode::OK, &TokenResponse { access_token })
        }
        Err(e) => {
            error!("Token issuance failed for \"{}\": {}", user.email, e);
            deny_token_error(e).into_response()
        }
    }
}

/// POST /api/v1/refresh
///
/// Accepts a token of any freshness. The presented token is revoked as the
/// exchange succeeds, so it cannot be replayed or refreshed twice.
pub async fn refresh(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let token = match bearer_token(auth_header.as_deref()) {
        Ok(token) => token,
        Err(deny) => return deny.into_response(),
    };

    match state.tokens.refresh(token) {
        Ok(access_token) => json_response(StatusCode::OK, &TokenResponse { access_token }),
        Err(e) => deny_token_error(e).into_response(),
    }
}

/// POST /api/v1/logout
pub async fn logout(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let token = match bearer_token(auth_header.as_deref()) {
        Ok(token) => token,
        Err(deny) => return deny.into_response(),
    };

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(e) => return deny_token_error(e).into_response(),
    };

    state.tokens.revoke(&claims.jti);
    message_response(StatusCode::OK, "Successfully logged out")
}

/// Pull a non-empty bearer value out of the Authorization header
fn bearer_token(auth_header: Option<&str>) -> Result<&str, Deny> {
    let token = extract_token_from_header(auth_header).ok_or(Deny {
        status: StatusCode::UNAUTHORIZED,
        message: "Missing or invalid Authorization header",
    })?;

    if token.is_empty() {
        return Err(Deny {
            status: StatusCode::BAD_REQUEST,
            message: "A valid authorization token is required",
        });
    }

    Ok(token)
}
