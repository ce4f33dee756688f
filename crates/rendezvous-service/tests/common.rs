//! Common test utilities for rendezvous integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{json, Value};
use tempfile::TempDir;

use rendezvous_core::UserId;
use rendezvous_service::auth::JwtClaims;
use rendezvous_service::{create_router, AppState, ServiceConfig, StorageBackend};
use rendezvous_store::{Database, RocksStore};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: Option<TempDir>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// A user holding the admin role.
    pub admin_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
    config: ServiceConfig,
}

impl TestHarness {
    /// Create a new test harness with a fresh `RocksDB` database.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");
        let data_dir = temp_dir.path().to_string_lossy().to_string();

        Self::build(
            Database::new(Arc::new(store)),
            StorageBackend::RocksDb,
            data_dir,
            Some(temp_dir),
        )
    }

    /// Create a harness backed by the in-memory store.
    pub fn in_memory() -> Self {
        Self::build(
            Database::in_memory(),
            StorageBackend::Memory,
            String::new(),
            None,
        )
    }

    fn build(
        db: Database,
        storage_backend: StorageBackend,
        data_dir: String,
        temp_dir: Option<TempDir>,
    ) -> Self {
        let service_api_key = "test-service-key".to_string();
        let admin_user_id = UserId::generate();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir,
            storage_backend,
            auth_jwt_secret: "test-jwt-secret".into(),
            auth_issuer: "rendezvous-auth".into(),
            auth_audience: "rendezvous".into(),
            service_api_key: Some(service_api_key.clone()),
            admin_user_ids: vec![admin_user_id],
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            welcome_grant_credits: 4,
            expiry_sweep_interval_seconds: None,
        };

        let state = AppState::new(Arc::new(db), config.clone());
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id: UserId::generate(),
            admin_user_id,
            service_api_key,
            config,
        }
    }

    /// Mint a valid token for `user_id`.
    pub fn token_for(&self, user_id: &UserId) -> String {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            aud: self.config.auth_audience.clone(),
            iss: self.config.auth_issuer.clone(),
            exp: now + 3600,
            iat: now,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth_jwt_secret.as_bytes()),
        )
        .expect("Failed to sign token")
    }

    /// The authorization header value for `user_id`.
    pub fn auth_for(&self, user_id: &UserId) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", self.token_for(user_id)))
            .expect("Invalid header value")
    }

    /// The authorization header value for the default test user.
    pub fn user_auth_header(&self) -> HeaderValue {
        self.auth_for(&self.test_user_id)
    }

    /// The authorization header value for the admin.
    pub fn admin_auth_header(&self) -> HeaderValue {
        self.auth_for(&self.admin_user_id)
    }

    /// Header name for service authentication.
    pub fn api_key_header() -> HeaderName {
        HeaderName::from_static("x-api-key")
    }

    /// Open an account for `user_id` with the welcome grant.
    pub async fn create_account(&self, user_id: &UserId) {
        self.server
            .post("/v1/accounts")
            .add_header(AUTHORIZATION, self.auth_for(user_id))
            .json(&json!({}))
            .await
            .assert_status_ok();
    }

    /// Read the balance of `user_id`.
    pub async fn balance(&self, user_id: &UserId) -> Value {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header(AUTHORIZATION, self.auth_for(user_id))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Create an event starting `starts_in` from now and return its id.
    pub async fn create_event(
        &self,
        owner: &UserId,
        max_guests: u32,
        starts_in: Duration,
    ) -> String {
        let start = Utc::now() + starts_in;
        let response = self
            .server
            .post("/v1/events")
            .add_header(AUTHORIZATION, self.auth_for(owner))
            .json(&json!({
                "title": "Board games",
                "start_time": start,
                "end_time": start + Duration::hours(3),
                "max_guests": max_guests
            }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["id"].as_str().expect("event id").to_string()
    }

    /// Apply to `event_id` as `applicant` and return the application id.
    pub async fn apply(&self, applicant: &UserId, event_id: &str) -> String {
        let response = self
            .server
            .post(&format!("/v1/events/{event_id}/applications"))
            .add_header(AUTHORIZATION, self.auth_for(applicant))
            .json(&json!({ "message": "Count me in" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["application_id"]
            .as_str()
            .expect("application id")
            .to_string()
    }

    /// Approve an application as `owner`.
    pub async fn approve(&self, owner: &UserId, application_id: &str) {
        self.server
            .post(&format!("/v1/applications/{application_id}/respond"))
            .add_header(AUTHORIZATION, self.auth_for(owner))
            .json(&json!({ "status": "approved" }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
