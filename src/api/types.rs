//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::core::risk_score::{RiskAssessment, RiskFactors, Severity};
use crate::models::errors::AppError;
use crate::utils::cache::StoreStats;
use crate::utils::telemetry::AssessmentStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

// ============================================
// Risk Scoring
// ============================================

/// Assessment plus rule-based explanation for one factor set
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreData {
    pub risk_score: f64,
    pub severity: Severity,
    pub confidence: f64,
    pub is_alert: bool,
    pub reasoning: Vec<String>,
    pub factors: RiskFactors,
}

impl ScoreData {
    pub fn new(factors: RiskFactors, assessment: RiskAssessment, reasoning: Vec<String>) -> Self {
        Self {
            risk_score: assessment.score,
            severity: assessment.severity,
            confidence: assessment.confidence,
            is_alert: assessment.severity.is_alert(),
            reasoning,
            factors,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub factors: RiskFactors,
    #[serde(default)]
    pub transaction_data: Option<serde_json::Value>,
    /// Used verbatim when no transaction data is supplied
    #[serde(default)]
    pub reasoning: Option<Vec<String>>,
}


// ============================================
// Stats / Telemetry
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatsData {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

impl From<StoreStats> for StoreStatsData {
    fn from(stats: StoreStats) -> Self {
        Self {
            entries: stats.entries,
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate,
            ttl_secs: stats.ttl_secs,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub assessments: AssessmentStats,
    pub store: StoreStatsData,
    pub ai_enabled: bool,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub service: String,
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
