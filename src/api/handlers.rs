//! API Request Handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::middleware::RateLimiter;
use super::types::*;
use crate::core::risk_score::{calculate_risk_score, fallback_reasoning, RiskFactors};
use crate::core::scorer::IntelligentRiskScorer;
use crate::models::config::ApiConfig;
use crate::models::errors::AppError;
use crate::models::types::RiskMetadata;
use crate::utils::cache::MetadataStore;
use crate::utils::constants::{APP_NAME, APP_VERSION};
use crate::utils::telemetry::AssessmentTelemetry;

type ApiFailure = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

/// Shared application state
pub struct AppState {
    pub scorer: IntelligentRiskScorer,
    pub store: MetadataStore,
    pub telemetry: Arc<AssessmentTelemetry>,
    pub limiter: RateLimiter,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(scorer: IntelligentRiskScorer, config: &ApiConfig) -> Self {
        Self {
            scorer,
            store: MetadataStore::with_ttl(config.metadata_ttl),
            telemetry: Arc::new(AssessmentTelemetry::new()),
            limiter: RateLimiter::per_minute(config.rate_limit_per_minute),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn failure(err: AppError, start: Instant) -> ApiFailure {
    let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, start: Instant) -> Result<T, ApiFailure> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| failure(AppError::bad_request(rejection.body_text()), start))
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        service: APP_NAME.to_string(),
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        assessments: state.telemetry.stats(),
        store: state.store.stats().into(),
        ai_enabled: state.scorer.has_provider(),
        uptime_seconds: state.uptime_seconds(),
        api_version: APP_VERSION.to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Risk Scoring
// ============================================

/// Score factors without storing a record
pub async fn score_risk(payload: Result<Json<RiskFactors>, JsonRejection>) -> ApiResult<ScoreData> {
    let start = Instant::now();
    let factors = body(payload, start)?;

    let assessment = calculate_risk_score(&factors);
    let reasoning = fallback_reasoning(&factors, assessment.severity);

    Ok(Json(ApiResponse::success(
        ScoreData::new(factors, assessment, reasoning),
        elapsed_ms(start),
    )))
}

/// Generate, store and return an audit record
pub async fn create_metadata(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MetadataRequest>, JsonRejection>,
) -> ApiResult<RiskMetadata> {
    let start = Instant::now();
    let req = body(payload, start)?;

    let id = match req.id {
        Some(id) if id.trim().is_empty() => {
            return Err(failure(AppError::bad_request("id must not be empty"), start));
        }
        Some(id) => id,
        None => uuid::Uuid::new_v4().to_string(),
    };

    let metadata = match (req.transaction_data, req.reasoning) {
        (None, Some(reasoning)) => state.scorer.generate_risk_metadata(id, req.factors, reasoning),
        (transaction_data, _) => {
            state
                .scorer
                .generate_risk_metadata_with_ai(id, req.factors, transaction_data.as_ref())
                .await
        }
    };

    let latency_ms = start.elapsed().as_millis() as u64;
    state.telemetry.record(&metadata, latency_ms);
    state.store.insert(metadata.clone());

    if metadata.severity.is_alert() {
        warn!(id = %metadata.id, "🚨 {}", metadata.summary());
    } else {
        info!(id = %metadata.id, "📝 {}", metadata.summary());
    }

    Ok(Json(ApiResponse::success(metadata, elapsed_ms(start))))
}

pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<RiskMetadata> {
    let start = Instant::now();

    match state.store.get(&id) {
        Some(metadata) => Ok(Json(ApiResponse::success(metadata, elapsed_ms(start)))),
        None => Err(failure(
            AppError::not_found(format!("No risk metadata for id '{}'", id)),
            start,
        )),
    }
}
