//! Configuration module for Sygna
//!
//! Defaults come from utils/constants.rs; environment variables override them.
//! No hardcoded endpoints or timings in this file.

use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_API_HOST, DEFAULT_API_PORT, DEFAULT_COMPUTE_MODEL, DEFAULT_COMPUTE_PROVIDER,
    DEFAULT_COMPUTE_TIMEOUT_SECS, DEFAULT_METADATA_TTL_SECS, DEFAULT_RATE_LIMIT_PER_MINUTE,
    DEFAULT_WS_URL, WS_HEARTBEAT_INTERVAL_SECS, WS_HEARTBEAT_TIMEOUT_SECS,
    WS_MAX_RECONNECT_ATTEMPTS, WS_OUTBOUND_QUEUE_CAPACITY, WS_RECONNECT_BASE_MS,
    WS_RECONNECT_MAX_MS,
};

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}

/// Realtime feed client configuration
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Feed endpoint (ws:// or wss://)
    pub url: String,
    /// First reconnect delay; doubles per attempt
    pub reconnect_base_delay: Duration,
    /// Upper bound of the reconnect delay
    pub reconnect_max_delay: Duration,
    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Interval between heartbeat pings
    pub heartbeat_interval: Duration,
    /// Time allowed for inbound traffic after a ping
    pub heartbeat_timeout: Duration,
    /// Outbound messages held while disconnected
    pub queue_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: env_string("SYGNA_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            reconnect_base_delay: Duration::from_millis(
                env_parse("SYGNA_RECONNECT_BASE_MS").unwrap_or(WS_RECONNECT_BASE_MS),
            ),
            reconnect_max_delay: Duration::from_millis(WS_RECONNECT_MAX_MS),
            max_reconnect_attempts: env_parse("SYGNA_MAX_RECONNECT_ATTEMPTS")
                .unwrap_or(WS_MAX_RECONNECT_ATTEMPTS),
            heartbeat_interval: Duration::from_secs(
                env_parse("SYGNA_HEARTBEAT_INTERVAL_SECS").unwrap_or(WS_HEARTBEAT_INTERVAL_SECS),
            ),
            heartbeat_timeout: Duration::from_secs(
                env_parse("SYGNA_HEARTBEAT_TIMEOUT_SECS").unwrap_or(WS_HEARTBEAT_TIMEOUT_SECS),
            ),
            queue_capacity: WS_OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

impl RealtimeConfig {
    /// Defaults pointed at a specific endpoint
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(AppError::invalid_config(format!(
                "Feed URL must use ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.queue_capacity == 0 {
            return Err(AppError::invalid_config("Outbound queue capacity must be > 0"));
        }
        if self.heartbeat_interval.is_zero() || self.heartbeat_timeout.is_zero() {
            return Err(AppError::invalid_config("Heartbeat timings must be > 0"));
        }
        Ok(())
    }
}

/// Compute inference (0G provider) configuration
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    /// OpenAI-compatible base URL of the provider; None disables AI reasoning
    pub endpoint: Option<String>,
    /// Provider id recorded in audit trails
    pub provider_id: String,
    pub model: String,
    /// Bearer token, if the provider requires one
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            endpoint: env_string("SYGNA_COMPUTE_URL"),
            provider_id: env_string("SYGNA_COMPUTE_PROVIDER")
                .unwrap_or_else(|| DEFAULT_COMPUTE_PROVIDER.to_string()),
            model: env_string("SYGNA_COMPUTE_MODEL")
                .unwrap_or_else(|| DEFAULT_COMPUTE_MODEL.to_string()),
            api_key: env_string("SYGNA_COMPUTE_API_KEY"),
            timeout: Duration::from_secs(
                env_parse("SYGNA_COMPUTE_TIMEOUT_SECS").unwrap_or(DEFAULT_COMPUTE_TIMEOUT_SECS),
            ),
        }
    }
}

impl ComputeConfig {
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn validate(&self) -> AppResult<()> {
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(AppError::invalid_config(format!(
                    "Compute URL must use http:// or https://, got {}",
                    endpoint
                )));
            }
        }
        if self.timeout.is_zero() {
            return Err(AppError::invalid_config("Compute timeout must be > 0"));
        }
        Ok(())
    }
}

/// Scoring API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub metadata_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: env_string("SYGNA_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            // Hosting platforms inject PORT; SYGNA_PORT is for local dev
            port: env_parse("PORT")
                .or_else(|| env_parse("SYGNA_PORT"))
                .unwrap_or(DEFAULT_API_PORT),
            rate_limit_per_minute: env_parse("SYGNA_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE),
            metadata_ttl: Duration::from_secs(DEFAULT_METADATA_TTL_SECS),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default)]
pub struct SygnaConfig {
    pub realtime: RealtimeConfig,
    pub compute: ComputeConfig,
    pub api: ApiConfig,
}

impl SygnaConfig {
    /// Load from environment and validate
    pub fn from_env() -> AppResult<Self> {
        let config = Self::default();
        config.validate()?;

        info!(
            feed = %config.realtime.url,
            ai_reasoning = config.compute.is_enabled(),
            "⚙️ Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.realtime.validate()?;
        self.compute.validate()?;
        if self.api.rate_limit_per_minute == 0 {
            return Err(AppError::invalid_config("Rate limit must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_realtime_defaults_match_constants() {
        let config = RealtimeConfig::with_url("ws://127.0.0.1:9000");
        assert_eq!(config.url, "ws://127.0.0.1:9000");
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
        assert_eq!(config.queue_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_realtime_rejects_http_url() {
        let config = RealtimeConfig::with_url("http://example.com");
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_realtime_rejects_empty_queue() {
        let config = RealtimeConfig {
            queue_capacity: 0,
            ..RealtimeConfig::with_url("wss://feed.example")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compute_validation() {
        let mut config = ComputeConfig {
            endpoint: Some("ftp://nope".to_string()),
            provider_id: "p".to_string(),
            model: "m".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        };
        assert!(config.validate().is_err());

        config.endpoint = Some("https://provider.example/v1/proxy".to_string());
        assert!(config.validate().is_ok());
        assert!(config.is_enabled());

        config.endpoint = None;
        assert!(config.validate().is_ok());
        assert!(!config.is_enabled());
    }
}
