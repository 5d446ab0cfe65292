use std::env;
use std::time::Duration;

use crate::cache::operations::StoreOptions;

/// 默认键前缀
pub const DEFAULT_KEY_PREFIX: &str = "rlflx";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoreConfig {
    pub redis_url: String,
    pub key_prefix: String,
    pub points: i64,
    pub duration_secs: u64,
    pub reject_if_not_ready: bool,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(StoreConfig {
            redis_url: env::var("REDIS_URL")?,
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
            points: env::var("RATE_LIMIT_POINTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            duration_secs: env::var("RATE_LIMIT_DURATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            reject_if_not_ready: env::var("RATE_LIMIT_REJECT_IF_NOT_READY")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key_prefix: self.key_prefix.clone(),
            reject_if_not_ready: self.reject_if_not_ready,
        }
    }
}
