//! Shared test harness: a real server on a loopback port with seeded users

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use gatehouse::auth::api_key::digest_api_key;
use gatehouse::config::Args;
use gatehouse::db::store::{MemoryUserStore, NewUser, UserStore};
use gatehouse::server::{serve, AppState};

pub const ADMIN_KEY: &str = "admin_api_key";
pub const USER_KEY: &str = "user_api_key";

pub struct TestApp {
    /// Base URL including the API prefix, e.g. `http://127.0.0.1:9999/api/v1`
    pub base: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str, key: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {key}"))
            .send()
            .await
            .expect("request failed")
    }

    pub async fn post(&self, path: &str, key: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {key}"))
            .send()
            .await
            .expect("request failed")
    }

    pub async fn post_json(
        &self,
        path: &str,
        key: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {key}"))
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn patch_json(
        &self,
        path: &str,
        key: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {key}"))
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn delete(&self, path: &str, key: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {key}"))
            .send()
            .await
            .expect("request failed")
    }
}

/// Start a server over a fresh in-memory store seeded with an admin and a
/// standard user, mirroring a just-bootstrapped deployment
pub async fn spawn_app() -> TestApp {
    let args = Args::parse_from([
        "gatehouse",
        "--dev-mode",
        "--jwt-secret",
        "integration-test-secret",
    ]);

    let store = Arc::new(MemoryUserStore::new());
    store
        .create(NewUser {
            first_name: Some("admin".to_string()),
            last_name: Some("admin".to_string()),
            email: "admin@test.local".to_string(),
            is_admin: true,
            is_active: true,
            hashed_api_key: digest_api_key(ADMIN_KEY),
        })
        .await
        .expect("seed admin");
    store
        .create(NewUser {
            first_name: Some("user".to_string()),
            last_name: Some("user".to_string()),
            email: "user@test.local".to_string(),
            is_admin: false,
            is_active: true,
            hashed_api_key: digest_api_key(USER_KEY),
        })
        .await
        .expect("seed user");

    let state = Arc::new(AppState::new(args, store));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("local addr");

    let serve_state = Arc::clone(&state);
    tokio::spawn(async move {
        let _ = serve(listener, serve_state).await;
    });

    TestApp {
        base: format!("http://{addr}/api/v1"),
        client: reqwest::Client::new(),
    }
}
