//! Service configuration.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use rendezvous_core::{UserId, WELCOME_GRANT_CREDITS};

/// Development-only signing secret used when none is configured.
const DEV_JWT_SECRET: &str = "rendezvous-dev-secret";

/// Where records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// `RocksDB` under `data_dir`.
    RocksDb,
    /// In-process maps; nothing survives a restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocksdb" | "rocks" => Ok(Self::RocksDb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/rendezvous").
    pub data_dir: String,

    /// Storage backend (default: `RocksDB`).
    pub storage_backend: StorageBackend,

    /// HS256 secret for user JWTs.
    pub auth_jwt_secret: String,

    /// Expected JWT issuer (default: "rendezvous-auth").
    pub auth_issuer: String,

    /// Expected JWT audience (default: "rendezvous").
    pub auth_audience: String,

    /// Service API key for the payment processor.
    pub service_api_key: Option<String>,

    /// Users granted the admin role.
    pub admin_user_ids: Vec<UserId>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Credits granted when an account is opened.
    pub welcome_grant_credits: u32,

    /// Run the event expiry sweep this often, if set.
    pub expiry_sweep_interval_seconds: Option<u64>,
}

/// Auth secrets file structure.
#[derive(Debug, Deserialize)]
struct AuthSecrets {
    jwt_secret: String,
    #[serde(default)]
    service_api_key: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and the secrets file.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (auth_jwt_secret, service_api_key) = load_auth_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            storage_backend: env_parse("STORAGE_BACKEND").unwrap_or(defaults.storage_backend),
            auth_jwt_secret: auth_jwt_secret.unwrap_or_else(|| {
                tracing::warn!("AUTH_JWT_SECRET not set - using the development secret");
                defaults.auth_jwt_secret
            }),
            auth_issuer: std::env::var("AUTH_ISSUER").unwrap_or(defaults.auth_issuer),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            service_api_key,
            admin_user_ids: std::env::var("ADMIN_USER_IDS")
                .map(|ids| parse_user_ids(&ids))
                .unwrap_or_default(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            welcome_grant_credits: env_parse("WELCOME_GRANT_CREDITS")
                .unwrap_or(defaults.welcome_grant_credits),
            expiry_sweep_interval_seconds: env_parse::<u64>("EXPIRY_SWEEP_INTERVAL_SECONDS")
                .filter(|secs| *secs > 0),
        }
    }

    /// Whether `user_id` carries the admin role.
    #[must_use]
    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admin_user_ids.contains(user_id)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Parse a comma-separated list of user ids, skipping malformed entries.
fn parse_user_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(value = %s, error = %e, "Ignoring invalid admin user id");
                None
            }
        })
        .collect()
}

/// Load the JWT secret and service key from file or environment.
fn load_auth_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/auth.json",
        "rendezvous/.secrets/auth.json",
        "../.secrets/auth.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<AuthSecrets>(path) {
            tracing::info!(path = %path, "Loaded auth secrets from file");
            return (
                Some(secrets.jwt_secret),
                secrets
                    .service_api_key
                    .or_else(|| std::env::var("SERVICE_API_KEY").ok()),
            );
        }
    }

    tracing::debug!("Auth secrets file not found, using environment variables");
    (
        std::env::var("AUTH_JWT_SECRET").ok(),
        std::env::var("SERVICE_API_KEY").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/rendezvous".into(),
            storage_backend: StorageBackend::RocksDb,
            auth_jwt_secret: DEV_JWT_SECRET.into(),
            auth_issuer: "rendezvous-auth".into(),
            auth_audience: "rendezvous".into(),
            service_api_key: None,
            admin_user_ids: Vec::new(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            welcome_grant_credits: WELCOME_GRANT_CREDITS,
            expiry_sweep_interval_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!("rocksdb".parse(), Ok(StorageBackend::RocksDb));
        assert_eq!(" Memory ".parse(), Ok(StorageBackend::Memory));
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn admin_ids_skip_garbage() {
        let admin = UserId::generate();
        let ids = parse_user_ids(&format!("{admin}, not-a-uuid,,"));
        assert_eq!(ids, vec![admin]);

        let config = ServiceConfig {
            admin_user_ids: ids,
            ..ServiceConfig::default()
        };
        assert!(config.is_admin(&admin));
        assert!(!config.is_admin(&UserId::generate()));
    }
}
