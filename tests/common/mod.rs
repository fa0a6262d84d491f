#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use http::{Method, Request};
use roomcast::config::GatewayConfig;
use roomcast::db;
use roomcast::gateway::hub::HubSnapshot;
use roomcast::models::room::{CreateRoom, Room};
use roomcast::models::user::{CreateUser, User};
use roomcast::routes;
use roomcast::state::AppState;
use sqlx::SqlitePool;

/// Test server that owns an in-memory SQLite pool, a running hub, and the
/// full AppState. Each instance is isolated, so tests can run in parallel.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_gateway(GatewayConfig::default()).await
    }

    pub async fn with_gateway(gateway: GatewayConfig) -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");
        Self {
            state: AppState::new(pool, gateway),
        }
    }

    /// Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Bind port 0, serve in the background, and return the `ws://` base URL.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://127.0.0.1:{}", addr.port())
    }

    pub async fn snapshot(&self) -> HubSnapshot {
        self.state
            .hub
            .snapshot()
            .await
            .expect("hub should be running")
    }

    /// Poll the hub until `pred` holds, failing the test after two seconds.
    pub async fn wait_for(&self, what: &str, pred: impl Fn(&HubSnapshot) -> bool) -> HubSnapshot {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let snap = self.snapshot().await;
            if pred(&snap) {
                return snap;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {what}; hub state: {snap:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn create_user(&self, name: &str) -> User {
        db::users::create_user(
            self.pool(),
            &CreateUser {
                name: name.to_string(),
                email: format!("{name}@example.com"),
            },
        )
        .await
        .expect("failed to create test user")
    }

    pub async fn create_room(&self, name: &str) -> Room {
        db::rooms::create_room(
            self.pool(),
            &CreateRoom {
                name: name.to_string(),
                description: String::new(),
            },
        )
        .await
        .expect("failed to create test room")
    }
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn test_app() -> axum::Router {
    let server = TestServer::new().await;
    routes::router(server.state)
}
