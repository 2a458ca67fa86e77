//! End-to-end access token tests: issuance, refresh rotation, logout

mod common;

use common::{spawn_app, ADMIN_KEY, USER_KEY};
use serde_json::{json, Value};

async fn obtain_token(app: &common::TestApp, key: &str) -> String {
    let resp = app.post("/auth", key).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_user_auth_and_access() {
    let app = spawn_app().await;

    // An API key is not a parseable token
    let resp = app.get("/jwt-check", USER_KEY).await;
    assert_eq!(resp.status().as_u16(), 422);
    let resp = app.get("/jwt-admin-check", USER_KEY).await;
    assert_eq!(resp.status().as_u16(), 422);

    let token = obtain_token(&app, USER_KEY).await;

    let resp = app.get("/jwt-check", &token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.get("/jwt-admin-check", &token).await;
    assert_eq!(resp.status().as_u16(), 403);

    // A token is not an API key
    let resp = app.get("/check", &token).await;
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app.get("/admin-check", &token).await;
    assert_eq!(resp.status().as_u16(), 403);

    // The original API key still works on the key routes
    let resp = app.get("/check", USER_KEY).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.get("/admin-check", USER_KEY).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn test_admin_auth_and_access() {
    let app = spawn_app().await;

    let resp = app.get("/jwt-check", ADMIN_KEY).await;
    assert_eq!(resp.status().as_u16(), 422);
    let resp = app.get("/jwt-admin-check", ADMIN_KEY).await;
    assert_eq!(resp.status().as_u16(), 422);

    let token = obtain_token(&app, ADMIN_KEY).await;

    let resp = app.get("/jwt-check", &token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.get("/jwt-admin-check", &token).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.get("/check", &token).await;
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app.get("/admin-check", &token).await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.get("/check", ADMIN_KEY).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.get("/admin-check", ADMIN_KEY).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_refresh_tokens() {
    let app = spawn_app().await;

    let token_1 = obtain_token(&app, USER_KEY).await;

    // Refresh twice; each refresh revokes the token it consumed
    let resp = app.post("/refresh", &token_1).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let token_2 = body["access_token"].as_str().unwrap().to_string();

    let resp = app.post("/refresh", &token_2).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let token_3 = body["access_token"].as_str().unwrap().to_string();

    // The first token is spent
    let resp = app.get("/jwt-check", &token_1).await;
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Token has been revoked");

    // Refreshing it again also fails
    let resp = app.post("/refresh", &token_1).await;
    assert_eq!(resp.status().as_u16(), 401);

    // The newest token works
    let resp = app.get("/jwt-check", &token_3).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_logout() {
    let app = spawn_app().await;

    let token_1 = obtain_token(&app, USER_KEY).await;

    let resp = app.post("/refresh", &token_1).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let token_2 = body["access_token"].as_str().unwrap().to_string();

    let resp = app.post("/refresh", &token_2).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let token_3 = body["access_token"].as_str().unwrap().to_string();

    // Logout with the live token
    let resp = app.post("/logout", &token_3).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Successfully logged out");

    // Every token in the chain is now unusable
    for token in [&token_1, &token_2, &token_3] {
        let resp = app.get("/jwt-check", token).await;
        assert_eq!(resp.status().as_u16(), 401);
    }

    // Logging out again with the same token reports it as revoked
    let resp = app.post("/logout", &token_3).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_rejects_bad_credentials() {
    let app = spawn_app().await;

    let resp = app.post("/auth", "NotRealToken").await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.client.post(app.url("/auth")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app.post("/refresh", "garbage-token").await;
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app.post("/logout", "garbage-token").await;
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn test_full_lifecycle_with_explicit_key() {
    let app = spawn_app().await;

    // Create a user with a chosen API key
    let resp = app
        .post_json(
            "/users",
            ADMIN_KEY,
            &json!({
                "first_name": "jay",
                "last_name": "son",
                "email": "jay@pytest.local",
                "api_key": "chosen-api-key",
            }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["api_key"], "chosen-api-key");

    // Exchange it for a token and use it
    let token = obtain_token(&app, "chosen-api-key").await;
    let resp = app.get("/jwt-check", &token).await;
    assert_eq!(resp.status().as_u16(), 200);

    // Logout kills exactly that token
    let resp = app.post("/logout", &token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.get("/jwt-check", &token).await;
    assert_eq!(resp.status().as_u16(), 401);

    // The API key itself is unaffected
    let resp = app.get("/check", "chosen-api-key").await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_deactivated_user_token_rejected() {
    let app = spawn_app().await;

    let resp = app
        .post_json(
            "/users",
            ADMIN_KEY,
            &json!({
                "first_name": "shorty",
                "last_name": "lived",
                "email": "shorty@pytest.local",
            }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    let user_id = body["id"].as_str().unwrap().to_string();
    let api_key = body["api_key"].as_str().unwrap().to_string();

    let token = obtain_token(&app, &api_key).await;
    let resp = app.get("/jwt-check", &token).await;
    assert_eq!(resp.status().as_u16(), 200);

    // Deactivation takes effect before token expiry
    let resp = app
        .patch_json(
            &format!("/users/{user_id}"),
            ADMIN_KEY,
            &json!({"is_active": false}),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.get("/jwt-check", &token).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Inactive account");
}
