//! HTTP routes for Gatehouse

pub mod auth_routes;
pub mod check;
pub mod users;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::GatehouseError;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 10240;

/// Error body shape used at the HTTP boundary
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Message body shape for simple success responses
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

pub(crate) fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &MessageResponse {
            message: message.to_string(),
        },
    )
}

pub(crate) fn get_auth_header(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub(crate) fn get_host(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, GatehouseError> {
    let body = req
        .collect()
        .await
        .map_err(|e| GatehouseError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(GatehouseError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| GatehouseError::Http(format!("Invalid JSON: {}", e)))
}
