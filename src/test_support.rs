//! Shared fixtures for unit and HTTP tests.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{Argon2Config, Config};
use crate::db::{init_db, UserRepository};
use crate::models::User;
use crate::passwords::Passwords;
use crate::server::{self, AccountAttributes, AccountService, AppState};

/// A fresh database in a temporary directory, with Argon2 parameters cheap
/// enough for tests.
pub struct TestContext {
    pub pool: SqlitePool,
    pub config: Config,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            database_path: temp_dir.path().join("test.db"),
            argon2: Argon2Config {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            ..Config::default()
        };
        let pool = init_db(&config.database_path).await.unwrap();

        Self {
            pool,
            config,
            _temp_dir: temp_dir,
        }
    }

    pub fn passwords(&self) -> Passwords {
        Passwords::new(&self.config.argon2).unwrap()
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(
            UserRepository::new(self.pool.clone()),
            self.passwords(),
            self.config.min_password_length,
        )
    }

    pub async fn create_user(&self, email: &str, password: &str) -> User {
        self.accounts()
            .create_account(email, password, AccountAttributes::named("Test Name"))
            .await
            .unwrap()
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.pool.clone(), &self.config).unwrap()
    }

    pub fn app(&self) -> Router {
        server::router(self.state())
    }

    /// Creates an account and logs it in, returning the token.
    pub async fn token_for(&self, email: &str, password: &str) -> String {
        self.create_user(email, password).await;
        self.state()
            .tokens
            .issue_token(email, password)
            .await
            .unwrap()
    }
}

/// Sends one request through the router. An empty response body comes back
/// as `Value::Null`.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
