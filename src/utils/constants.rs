//! Constants Module - Single Source of Truth
//!
//! Every tunable used by the scorer, the realtime feed client, the compute
//! inference client and the scoring API is defined here. Other modules read
//! these values (directly or through `models::config`) instead of hardcoding.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "0g-Sygna";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = "Sygna/0.1.0";

// ============================================
// REALTIME FEED CONSTANTS
// ============================================

/// Default feed endpoint when `SYGNA_WS_URL` is not set
pub const DEFAULT_WS_URL: &str = "ws://localhost:3001/ws";

/// Reconnection base delay (milliseconds)
pub const WS_RECONNECT_BASE_MS: u64 = 1000;

/// Maximum reconnection delay (milliseconds)
pub const WS_RECONNECT_MAX_MS: u64 = 30_000;

/// Reconnect attempts before the client gives up
pub const WS_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Heartbeat ping interval (seconds)
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Time allowed for any inbound traffic after a ping (seconds)
pub const WS_HEARTBEAT_TIMEOUT_SECS: u64 = 5;

/// Outbound messages held while disconnected; the oldest is dropped beyond this
pub const WS_OUTBOUND_QUEUE_CAPACITY: usize = 100;

/// Buffer of the connection event broadcast channel
pub const WS_EVENT_BUFFER: usize = 64;

/// Topic that receives every inbound message
pub const WILDCARD_TOPIC: &str = "*";

/// Envelope type of heartbeat pings
pub const PING_MESSAGE_TYPE: &str = "ping";

/// Feed topic carrying transactions to score
pub const TRANSACTION_TOPIC: &str = "transaction";

// ============================================
// RISK SCORER AUDIT CONSTANTS
// ============================================

/// Audit version of locally reasoned records
pub const LOCAL_SCORER_VERSION: &str = "1.0.0";

/// Audit model of locally reasoned records
pub const LOCAL_SCORER_MODEL: &str = "intelligent-risk-scorer-v1";

/// Audit version of AI reasoned records
pub const AI_SCORER_VERSION: &str = "2.0.0";

/// Audit model prefix of AI reasoned records, followed by the provider id
pub const AI_MODEL_PREFIX: &str = "0g-compute-";

// ============================================
// COMPUTE INFERENCE CONSTANTS
// ============================================

/// Default model requested from the compute provider
pub const DEFAULT_COMPUTE_MODEL: &str = "llama-3.3-70b-instruct";

/// Provider id used when none is configured
pub const DEFAULT_COMPUTE_PROVIDER: &str = "default";

/// Timeout for one inference round trip (seconds)
pub const DEFAULT_COMPUTE_TIMEOUT_SECS: u64 = 15;

/// Sampling temperature for reasoning requests
pub const COMPUTE_TEMPERATURE: f32 = 0.2;

/// Completion token cap for reasoning requests
pub const COMPUTE_MAX_TOKENS: u32 = 600;

// ============================================
// STORE & API CONSTANTS
// ============================================

/// Metadata store TTL (seconds)
pub const DEFAULT_METADATA_TTL_SECS: u64 = 3600;

/// Interval of background cleanup tasks (seconds)
pub const CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default API port
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default API bind host
pub const DEFAULT_API_HOST: &str = "0.0.0.0";

/// Requests per key per rate-limit window
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Concurrent in-flight API requests
pub const API_CONCURRENCY_LIMIT: usize = 256;
