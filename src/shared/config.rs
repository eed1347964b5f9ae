use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub device_id: String,
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
    pub content: ContentConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub heartbeat_interval_secs: u64,
    pub offline_threshold_secs: u64,
    pub sync_interval_secs: u64,
    pub sync_max_retry: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    pub poll_interval_secs: u64,
    pub max_retry_attempts: u32,
}

/// Shared by every retried remote call; there is exactly one backoff formula
/// in the crate (see `shared::retry`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub scenes: PartitionLimits,
    pub media: PartitionLimits,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PartitionLimits {
    pub max_bytes: u64,
    pub max_entries: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                connection_timeout: 30,
            },
            network: NetworkConfig {
                heartbeat_interval_secs: 30,
                offline_threshold_secs: 40,
                sync_interval_secs: 300, // 5 minutes
                sync_max_retry: 3,
            },
            content: ContentConfig {
                poll_interval_secs: 30,
                max_retry_attempts: 3,
            },
            retry: RetryConfig {
                base_delay_ms: 1_000,
                max_delay_ms: 60_000,
            },
            cache: CacheConfig {
                scenes: PartitionLimits {
                    max_bytes: 100 * 1024 * 1024, // 100MB
                    max_entries: 500,
                },
                media: PartitionLimits {
                    max_bytes: 500 * 1024 * 1024, // 500MB
                    max_entries: 1000,
                },
            },
        }
    }
}

fn default_database_url() -> String {
    let data_dir = dirs::data_local_dir()
        .map(|dir| dir.join("marquee"))
        .unwrap_or_else(|| std::path::PathBuf::from("./data"));
    format!("sqlite:{}/marquee.db", data_dir.display())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("MARQUEE_DEVICE_ID") {
            if !v.trim().is_empty() {
                cfg.device_id = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_HEARTBEAT_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.network.heartbeat_interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_OFFLINE_THRESHOLD_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.network.offline_threshold_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_SYNC_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.network.sync_interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_POLL_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.content.poll_interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_BASE_RETRY_DELAY_MS") {
            if let Some(value) = parse_u64(&v) {
                cfg.retry.base_delay_ms = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_MAX_RETRY_DELAY_MS") {
            if let Some(value) = parse_u64(&v) {
                cfg.retry.max_delay_ms = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_SCENES_MAX_BYTES") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.scenes.max_bytes = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_SCENES_MAX_ENTRIES") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.scenes.max_entries = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_MEDIA_MAX_BYTES") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.media.max_bytes = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MARQUEE_MEDIA_MAX_ENTRIES") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.media.max_entries = value.max(1);
            }
        }

        cfg
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.device_id.is_empty() {
            return Err("device_id must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.content.max_retry_attempts == 0 {
            return Err("Content max_retry_attempts must be greater than 0".to_string());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err("Retry base_delay_ms must not exceed max_delay_ms".to_string());
        }
        if self.network.offline_threshold_secs == 0 {
            return Err("Network offline_threshold_secs must be greater than 0".to_string());
        }
        for (name, limits) in [("scenes", &self.cache.scenes), ("media", &self.cache.media)] {
            if limits.max_bytes == 0 || limits.max_entries == 0 {
                return Err(format!("Cache limits for {name} must be greater than 0"));
            }
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            device_id: "device-1".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_carries_documented_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.network.heartbeat_interval_secs, 30);
        assert_eq!(cfg.network.offline_threshold_secs, 40);
        assert_eq!(cfg.content.poll_interval_secs, 30);
        assert_eq!(cfg.retry.base_delay_ms, 1_000);
        assert_eq!(cfg.retry.max_delay_ms, 60_000);
        assert_eq!(cfg.cache.scenes.max_entries, 500);
        assert_eq!(cfg.cache.media.max_bytes, 500 * 1024 * 1024);
    }

    #[test]
    fn validate_rejects_missing_device_id() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_retry_delays() {
        let mut cfg = valid_config();
        cfg.retry.base_delay_ms = 120_000;
        assert!(cfg.validate().is_err());
    }
}
