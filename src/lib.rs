//! 0G-Sygna Library
//!
//! Risk scoring and realtime feed plumbing for blockchain activity monitoring:
//! - Weighted six-factor risk scoring with severity and confidence
//! - Auditable risk metadata, optionally reasoned by a 0G compute provider
//! - Resilient WebSocket feed client (backoff, heartbeat, topic subscribers)
//! - HTTP scoring API

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::risk_score::{
    calculate_risk_score, fallback_reasoning, RiskAssessment, RiskFactors, Severity,
};
pub use crate::core::scorer::{parse_ai_reasoning, IntelligentRiskScorer};
pub use crate::models::config::{ApiConfig, ComputeConfig, RealtimeConfig, SygnaConfig};
pub use crate::models::errors::{AppError, AppResult, ErrorCode};
pub use crate::models::types::{
    AuditTrail, InferenceRequest, InferenceResponse, RealtimeMessage, RiskMetadata,
    TransactionEvent,
};
pub use crate::providers::compute::{ComputeClient, InferenceProvider};
pub use crate::providers::realtime::{
    BackoffPolicy, ConnectionEvent, ConnectionState, RealtimeClient, Subscription,
};
pub use crate::utils::cache::{MetadataStore, StoreStats};
pub use crate::utils::telemetry::{AssessmentStats, AssessmentTelemetry};
