//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; one spawned task per
//! accepted connection. Routing is a match over method and path under the
//! versioned API prefix.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{RevocationRegistry, TokenService};
use crate::config::Args;
use crate::db::store::UserStore;
use crate::routes;
use crate::types::GatehouseError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// User directory (memory or MongoDB behind the trait)
    pub users: Arc<dyn UserStore>,
    /// Access token service with its injected revocation registry
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Create application state over the given user store
    pub fn new(args: Args, users: Arc<dyn UserStore>) -> Self {
        let revoked = Arc::new(RevocationRegistry::new());
        let tokens = Arc::new(TokenService::new(
            &args.jwt_secret(),
            args.token_ttl_seconds,
            revoked,
        ));

        Self {
            args,
            users,
            tokens,
        }
    }
}

/// Bind the configured address and start serving
pub async fn run(state: Arc<AppState>) -> Result<(), GatehouseError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Gatehouse listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    serve(listener, state).await
}

/// Serve connections from an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), GatehouseError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::GET, "/api/v1/status") => routes::check::status(),

        (Method::GET, "/api/v1/check") => routes::check::check_api_key(req, state).await,
        (Method::GET, "/api/v1/admin-check") => {
            routes::check::check_admin_api_key(req, state).await
        }
        (Method::GET, "/api/v1/jwt-check") => routes::check::check_token(req, state).await,
        (Method::GET, "/api/v1/jwt-admin-check") => {
            routes::check::check_admin_token(req, state).await
        }

        (Method::POST, "/api/v1/auth") => routes::auth_routes::login(req, state).await,
        (Method::POST, "/api/v1/refresh") => routes::auth_routes::refresh(req, state).await,
        (Method::POST, "/api/v1/logout") => routes::auth_routes::logout(req, state).await,

        (_, p) if p == "/api/v1/users" || p.starts_with("/api/v1/users/") => {
            routes::users::handle_users_request(req, state, &path).await
        }

        _ => not_found(),
    };

    Ok(response)
}

fn not_found() -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": "Not found" }).to_string();
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
