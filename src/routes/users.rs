//! User management endpoints (admin only)
//!
//! ## Endpoints
//!
//! - `GET    /api/v1/users` - list users with pagination
//! - `POST   /api/v1/users` - create a user (returns the plaintext API key once)
//! - `GET    /api/v1/users/{id}` - user details with action links
//! - `PATCH  /api/v1/users/{id}` - partial update, including credential replacement
//! - `DELETE /api/v1/users/{id}` - delete a user
//! - `POST   /api/v1/users/{id}/gen-api-key` - regenerate the API key
//!
//! Every endpoint stacks the credential guard before the admin guard.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

use crate::auth::{digest_api_key, generate_api_key, require_admin, require_api_user};
use crate::db::schemas::UserDoc;
use crate::db::store::{NewUser, StoreError, UserStore as _, UserUpdate};
use crate::routes::{
    error_response, get_auth_header, get_host, json_response, parse_json_body,
};
use crate::server::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ModifyUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    pub api_key: Option<String>,
}

/// User fields exposed to administrators
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl UserResponse {
    fn from_doc(user: &UserDoc) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            is_admin: user.is_admin,
        }
    }
}

/// Created user, including the only disclosure of the plaintext key
#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub api_key: String,
}

/// Paginated listing
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: i64,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
}

/// Discoverable follow-up action on a user resource
#[derive(Debug, Serialize)]
pub struct UserAction {
    pub uri: String,
    pub method: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserActions {
    #[serde(rename = "regen-api-key")]
    pub regen_api_key: UserAction,
    #[serde(rename = "get-user-info")]
    pub get_user_info: UserAction,
    #[serde(rename = "delete-user")]
    pub delete_user: UserAction,
    #[serde(rename = "modify-user")]
    pub modify_user: UserAction,
}

#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub actions: UserActions,
}

#[derive(Debug, Serialize)]
pub struct UserUpdatedResponse {
    pub message: String,
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedKeyResponse {
    pub message: String,
    pub api_key: String,
}

// =============================================================================
// Helpers
// =============================================================================

const COULD_NOT_PROCESS: &str = "Could not process your request";
const USER_NOT_FOUND: &str = "User not found!";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$")
            .expect("email pattern is valid")
    })
}

fn validate_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Query parameters for the listing endpoint
///
/// Mirrors the permissive parsing of the admin UI: unparseable values fall
/// back to defaults, range checks happen afterwards.
#[derive(Debug)]
struct ListUsersQuery {
    page: i64,
    per_page: i64,
}

impl ListUsersQuery {
    fn from_query_string(query: Option<&str>) -> Self {
        let mut params = Self {
            page: 1,
            per_page: 20,
        };

        if let Some(q) = query {
            for pair in q.split('&') {
                if let Some((key, value)) = pair.split_once('=') {
                    let value = urlencoding::decode(value).unwrap_or_default();
                    match key {
                        "page" => params.page = value.parse().unwrap_or(params.page),
                        "per_page" => params.per_page = value.parse().unwrap_or(params.per_page),
                        _ => {}
                    }
                }
            }
        }

        params
    }
}

/// Base URL for building absolute links, from the request Host header
fn base_url(host: Option<&str>, state: &AppState) -> String {
    match host {
        Some(host) => format!("http://{host}"),
        None => format!("http://{}", state.args.listen),
    }
}

fn store_failure(e: &StoreError) -> Response<Full<Bytes>> {
    error!("Error occurred: {}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, COULD_NOT_PROCESS)
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /api/v1/users* routes
pub async fn handle_users_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let subpath = path
        .strip_prefix("/api/v1/users")
        .unwrap_or("")
        .trim_end_matches('/');

    match (method, subpath) {
        (Method::GET, "") => list_users(req, state).await,
        (Method::POST, "") => create_user(req, state).await,

        (Method::POST, p) if p.ends_with("/gen-api-key") => {
            let id = p
                .strip_prefix('/')
                .and_then(|s| s.strip_suffix("/gen-api-key"))
                .unwrap_or("");
            gen_user_api_key(req, state, id).await
        }

        (method, p) if p.starts_with('/') && !p[1..].contains('/') => {
            let id = &p[1..];
            match method {
                Method::GET => get_user(req, state, id).await,
                Method::PATCH => modify_user(req, state, id).await,
                Method::DELETE => delete_user(req, state, id).await,
                _ => error_response(StatusCode::NOT_FOUND, "Not found"),
            }
        }

        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    }
}

// =============================================================================
// Endpoint Handlers
// =============================================================================

/// GET /api/v1/users - list users with pagination
async fn list_users(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let user = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };
    if let Err(deny) = require_admin(&user) {
        return deny.into_response();
    }

    let params = ListUsersQuery::from_query_string(req.uri().query());

    if params.per_page > state.args.max_per_page {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!(
                "Max items per page is {}, provided value is {}",
                state.args.max_per_page, params.per_page
            ),
        );
    }

    if params.page < 1 || params.per_page < 1 {
        return error_response(StatusCode::NOT_FOUND, "Page out of range");
    }

    let page = match state
        .users
        .list(params.page as u32, params.per_page as u32)
        .await
    {
        Ok(page) => page,
        Err(StoreError::PageOutOfRange) => {
            return error_response(StatusCode::NOT_FOUND, "Page out of range")
        }
        Err(e) => return store_failure(&e),
    };

    let base = base_url(get_host(&req).as_deref(), &state);
    let next_page = page.has_next().then(|| {
        format!(
            "{base}/api/v1/users?page={}&per_page={}",
            page.page + 1,
            page.per_page
        )
    });
    let prev_page = page.has_prev().then(|| {
        format!(
            "{base}/api/v1/users?page={}&per_page={}",
            page.page - 1,
            page.per_page
        )
    });

    json_response(
        StatusCode::OK,
        &UsersResponse {
            users: page.users.iter().map(UserResponse::from_doc).collect(),
            total_pages: page.total_pages,
            total_items: page.total_items,
            items_per_page: params.per_page,
            next_page,
            prev_page,
        },
    )
}

/// POST /api/v1/users - create a user
async fn create_user(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let admin = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };
    if let Err(deny) = require_admin(&admin) {
        return deny.into_response();
    }

    let body: CreateUserRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Missing required parameters"),
    };

    let (first_name, last_name, email) = match (body.first_name, body.last_name, body.email) {
        (Some(f), Some(l), Some(e)) if !f.is_empty() && !l.is_empty() && !e.is_empty() => (f, l, e),
        _ => return error_response(StatusCode::BAD_REQUEST, "Missing required parameters"),
    };

    if !validate_email(&email) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    let (api_key, hashed_api_key) = match body.api_key {
        Some(key) if !key.is_empty() => {
            let digest = digest_api_key(&key);
            (key, digest)
        }
        _ => generate_api_key(),
    };

    let created = state
        .users
        .create(NewUser {
            first_name: Some(first_name),
            last_name: Some(last_name),
            email,
            is_admin: body.is_admin.unwrap_or(false),
            is_active: body.is_active.unwrap_or(true),
            hashed_api_key,
        })
        .await;

    match created {
        Ok(user) => {
            info!("User \"{}\" has been added", user.email);
            json_response(
                StatusCode::CREATED,
                &CreatedUserResponse {
                    user: UserResponse::from_doc(&user),
                    api_key,
                },
            )
        }
        Err(StoreError::EmailExists) => {
            error_response(StatusCode::BAD_REQUEST, "user already exists")
        }
        Err(e) => store_failure(&e),
    }
}

/// GET /api/v1/users/{id} - user details with action links
async fn get_user(
    req: Request<Incoming>,
    state: Arc<AppState>,
    user_id: &str,
) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let admin = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };
    if let Err(deny) = require_admin(&admin) {
        return deny.into_response();
    }

    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => return store_failure(&e),
    };

    let base = base_url(get_host(&req).as_deref(), &state);
    let user_uri = format!("{base}/api/v1/users/{}", user.id);

    json_response(
        StatusCode::OK,
        &UserDetailResponse {
            user: UserResponse::from_doc(&user),
            actions: UserActions {
                regen_api_key: UserAction {
                    uri: format!("{user_uri}/gen-api-key"),
                    method: "POST",
                    description: "Regenerate the user API key and return the newly generated key",
                },
                get_user_info: UserAction {
                    uri: user_uri.clone(),
                    method: "GET",
                    description: "Return the user info",
                },
                delete_user: UserAction {
                    uri: user_uri.clone(),
                    method: "DELETE",
                    description: "Delete the user",
                },
                modify_user: UserAction {
                    uri: user_uri,
                    method: "PATCH",
                    description: "Edit the user information",
                },
            },
        },
    )
}

/// PATCH /api/v1/users/{id} - partial update
async fn modify_user(
    req: Request<Incoming>,
    state: Arc<AppState>,
    user_id: &str,
) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let admin = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };
    if let Err(deny) = require_admin(&admin) {
        return deny.into_response();
    }

    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => return store_failure(&e),
    };

    let body: ModifyUserRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(_) => ModifyUserRequest::default(),
    };

    let update = UserUpdate {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        is_admin: body.is_admin,
        is_active: body.is_active,
        hashed_api_key: body.api_key.map(|key| digest_api_key(&key)),
    };

    match state.users.update(&user.id, update).await {
        Ok(updated) => {
            info!("User \"{}\" has been modified", updated.email);
            json_response(
                StatusCode::OK,
                &UserUpdatedResponse {
                    message: "User has been updated".to_string(),
                    user: updated.email,
                },
            )
        }
        Err(StoreError::EmailExists) => {
            error_response(StatusCode::BAD_REQUEST, "Email already exists")
        }
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => store_failure(&e),
    }
}

/// DELETE /api/v1/users/{id}
async fn delete_user(
    req: Request<Incoming>,
    state: Arc<AppState>,
    user_id: &str,
) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let admin = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };
    if let Err(deny) = require_admin(&admin) {
        return deny.into_response();
    }

    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => return store_failure(&e),
    };

    match state.users.delete(&user.id).await {
        Ok(()) => {
            info!("User \"{}\" has been deleted", user.email);
            json_response(
                StatusCode::OK,
                &crate::routes::MessageResponse {
                    message: "User has been deleted".to_string(),
                },
            )
        }
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => store_failure(&e),
    }
}

/// POST /api/v1/users/{id}/gen-api-key - regenerate the user's API key
async fn gen_user_api_key(
    req: Request<Incoming>,
    state: Arc<AppState>,
    user_id: &str,
) -> Response<Full<Bytes>> {
    let auth_header = get_auth_header(&req);
    let admin = match require_api_user(&state, auth_header.as_deref()).await {
        Ok(user) => user,
        Err(deny) => return deny.into_response(),
    };
    if let Err(deny) = require_admin(&admin) {
        return deny.into_response();
    }

    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => return store_failure(&e),
    };

    let (api_key, hashed_api_key) = generate_api_key();
    let update = UserUpdate {
        hashed_api_key: Some(hashed_api_key),
        ..Default::default()
    };

    match state.users.update(&user.id, update).await {
        Ok(updated) => {
            info!("User \"{}\" API key has been regenerated", updated.email);
            json_response(
                StatusCode::OK,
                &GeneratedKeyResponse {
                    message: "New API key has been generated, be sure to save this now. \
                              It cannot be recovered once lost!"
                        .to_string(),
                    api_key,
                },
            )
        }
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, USER_NOT_FOUND),
        Err(e) => store_failure(&e),
    }
}
