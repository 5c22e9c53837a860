use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub lock_timeout_ms: u64,
    pub max_txn_retries: u32,
    pub enforce_capacity: bool,
    pub default_consultation_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            lock_timeout_ms: 2000,
            max_txn_retries: 3,
            enforce_capacity: false,
            default_consultation_minutes: 15,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("CAREQUEUE_BIND_ADDRESS")
                .unwrap_or_else(|_| defaults.bind_address),
            lock_timeout_ms: env::var("CAREQUEUE_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lock_timeout_ms),
            max_txn_retries: env::var("CAREQUEUE_MAX_TXN_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_txn_retries),
            enforce_capacity: env::var("CAREQUEUE_ENFORCE_CAPACITY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or_else(|_| {
                    warn!("CAREQUEUE_ENFORCE_CAPACITY not set, capacity is advisory only");
                    defaults.enforce_capacity
                }),
            default_consultation_minutes: env::var("CAREQUEUE_DEFAULT_CONSULTATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_consultation_minutes),
        }
    }
}
