//! Environment-driven application configuration.

use std::env;

use serde::Serialize;

use opportunities_openings::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_BROKERS: &str = "redis://localhost:6379";
pub const DEFAULT_FEEDBACK_TOPIC: &str = "feedback-opening-v1";
pub const DEFAULT_CLIENT_ID: &str = "opportunities-api";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub intake: IntakeConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreConfig {
    /// Postgres URL; the in-memory store is used when unset.
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeConfig {
    pub queue_capacity: usize,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackConfig {
    pub enabled: bool,
    pub brokers: Vec<String>,
    pub topic: String,
    pub client_id: String,
}

impl AppConfig {
    /// Build config from process environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// Values are trimmed; blank values count as unset. Unparseable numbers fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Self {
            server: ServerConfig {
                bind_addr: or("BIND_ADDR", DEFAULT_BIND_ADDR),
                max_upload_bytes: parse_or(get("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES),
            },
            store: StoreConfig {
                database_url: get("DATABASE_URL"),
                max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS),
            },
            intake: IntakeConfig {
                queue_capacity: parse_or(get("INTAKE_QUEUE_CAPACITY"), DEFAULT_QUEUE_CAPACITY),
                chunk_size: parse_or(get("INGEST_CHUNK_SIZE"), DEFAULT_CHUNK_SIZE),
            },
            feedback: FeedbackConfig {
                enabled: get("FEEDBACK_ENABLED").map_or(true, |v| parse_flag(&v)),
                brokers: parse_brokers(&or("FEEDBACK_BROKERS", DEFAULT_BROKERS)),
                topic: or("FEEDBACK_TOPIC", DEFAULT_FEEDBACK_TOPIC),
                client_id: or("FEEDBACK_CLIENT_ID", DEFAULT_CLIENT_ID),
            },
        }
    }

    /// Log a summary of the active configuration (secrets excluded).
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  server:    bind={}, max_upload_bytes={}",
            self.server.bind_addr,
            self.server.max_upload_bytes
        );
        tracing::info!(
            "  store:     backend={}, max_connections={}",
            if self.store.database_url.is_some() { "postgres" } else { "in-memory" },
            self.store.max_connections
        );
        tracing::info!(
            "  intake:    queue_capacity={}, chunk_size={}",
            self.intake.queue_capacity,
            self.intake.chunk_size
        );
        tracing::info!(
            "  feedback:  enabled={}, brokers={}, topic={}, client_id={}",
            self.feedback.enabled,
            self.feedback.brokers.join(","),
            self.feedback.topic,
            self.feedback.client_id
        );
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Comma-separated list, entries trimmed, blanks dropped.
fn parse_brokers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
