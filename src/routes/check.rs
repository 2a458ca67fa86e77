//! Health and credential check endpoints
//!
//! - `GET /api/v1/status` - unauthenticated liveness check
//! - `GET /api/v1/check` / `admin-check` - API key validity probes
//! - `GET /api/v1/jwt-check` / `jwt-admin-check` - access token probes

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::auth::{require_admin, require_api_user, require_token_user};
use crate::routes::{get_auth_header, message_response};
use crate::server::AppState;

/// GET /api/v1/status
pub fn status() -> Response<Full<Bytes>> {
    message_response(StatusCode::OK, "Up and running")
}

/// GET /api/v1/check
pub async fn check_api_key(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    match require_api_user(&state, auth_header.as_deref()).await {
        Ok(_) => message_response(StatusCode::OK, "API token is valid"),
        Err(deny) => deny.into_response(),
    }
}

/// GET /api/v1/admin-check
pub async fn check_admin_api_key(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let user = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };

    match require_admin(&user) {
        Ok(()) => message_response(StatusCode::OK, "API token is valid"),
        Err(deny) => deny.into_response(),
    }
}

/// GET /api/v1/jwt-check
pub async fn check_token(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    match require_token_user(&state, auth_header.as_deref()).await {
        Ok(_) => message_response(StatusCode::OK, "Access token is valid"),
        Err(deny) => deny.into_response(),
    }
}

/// GET /api/v1/jwt-admin-check
pub async fn check_admin_token(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let (user, _claims) = match require_token_user(&state, auth_header.as_deref()).await {
        Ok(resolved) => resolved,
        Err(deny) => return deny.into_response(),
    };

    match require_admin(&user) {
        Ok(()) => message_response(StatusCode::OK, "Access token is valid"),
        Err(deny) => deny.into_response(),
    }
}
