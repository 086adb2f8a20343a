//! Intelligent Risk Scorer
//!
//! Wraps the pure scoring function into auditable [`RiskMetadata`] records.
//! Reasoning comes either from the caller, from the local rule set, or from a
//! compute inference provider. The AI path is best-effort: every failure
//! (transport error, timeout, unsuccessful response, unparseable body) falls
//! back to the local rules and is only visible as a warning in the logs.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::risk_score::{calculate_risk_score, fallback_reasoning, RiskAssessment, RiskFactors};
use crate::models::types::{AuditTrail, InferenceRequest, RiskMetadata};
use crate::models::config::ComputeConfig;
use crate::providers::compute::{ComputeClient, InferenceProvider};
use crate::utils::constants::DEFAULT_COMPUTE_TIMEOUT_SECS;

/// Scorer with an optional inference provider
#[derive(Clone)]
pub struct IntelligentRiskScorer {
    provider: Option<Arc<dyn InferenceProvider>>,
    ai_timeout: Duration,
}

impl Default for IntelligentRiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl IntelligentRiskScorer {
    /// Local-only scorer
    pub fn new() -> Self {
        Self {
            provider: None,
            ai_timeout: Duration::from_secs(DEFAULT_COMPUTE_TIMEOUT_SECS),
        }
    }

    /// Scorer that asks `provider` for reasoning
    pub fn with_provider(provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::new()
        }
    }

    /// Scorer wired to the configured compute provider, local-only otherwise
    pub fn from_config(config: &ComputeConfig) -> Self {
        if !config.is_enabled() {
            info!("🧠 No compute endpoint configured, AI reasoning disabled");
            return Self::new();
        }

        match ComputeClient::new(config) {
            Ok(client) => Self::with_provider(Arc::new(client)).with_ai_timeout(config.timeout),
            Err(e) => {
                warn!(code = e.code_str(), "⚠️ Compute client unavailable, AI reasoning disabled: {}", e);
                Self::new()
            }
        }
    }

    /// Upper bound on one inference round trip
    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn calculate_risk_score(&self, factors: &RiskFactors) -> RiskAssessment {
        calculate_risk_score(factors)
    }

    /// Record with caller-supplied reasoning (stored verbatim)
    pub fn generate_risk_metadata(
        &self,
        id: impl Into<String>,
        factors: RiskFactors,
        reasoning: Vec<String>,
    ) -> RiskMetadata {
        let assessment = calculate_risk_score(&factors);
        RiskMetadata::new(id, factors, assessment, reasoning, AuditTrail::local(Utc::now()))
    }

    /// Record with AI reasoning when available, local rules otherwise. Never fails.
    pub async fn generate_risk_metadata_with_ai(
        &self,
        id: impl Into<String>,
        factors: RiskFactors,
        transaction_data: Option<&serde_json::Value>,
    ) -> RiskMetadata {
        let id = id.into();
        let assessment = calculate_risk_score(&factors);

        if let Some(transaction_data) = transaction_data {
            if let Some((reasoning, provider_id)) = self.ai_reasoning(&id, factors, transaction_data).await {
                info!(id = %id, provider = %provider_id, "🧠 AI reasoning attached");
                return RiskMetadata::new(
                    id,
                    factors,
                    assessment,
                    reasoning,
                    AuditTrail::ai(Utc::now(), &provider_id),
                );
            }
        }

        let reasoning = fallback_reasoning(&factors, assessment.severity);
        self.generate_risk_metadata(id, factors, reasoning)
    }

    /// Reasoning lines and provider id, or None for any failure
    async fn ai_reasoning(
        &self,
        id: &str,
        factors: RiskFactors,
        transaction_data: &serde_json::Value,
    ) -> Option<(Vec<String>, String)> {
        let Some(provider) = &self.provider else {
            debug!(id = %id, "No inference provider configured, using local reasoning");
            return None;
        };

        let request = InferenceRequest::new(transaction_data.clone(), factors);

        let response = match tokio::time::timeout(self.ai_timeout, provider.analyze_transaction(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(
                    id = %id,
                    code = e.code_str(),
                    retryable = e.code.is_retryable(),
                    "⚠️ AI analysis failed, using local reasoning: {}",
                    e
                );
                return None;
            }
            Err(_) => {
                warn!(
                    id = %id,
                    timeout_ms = self.ai_timeout.as_millis() as u64,
                    "⚠️ AI analysis timed out, using local reasoning"
                );
                return None;
            }
        };

        if !response.success {
            warn!(
                id = %id,
                "⚠️ AI analysis unsuccessful, using local reasoning: {}",
                response.error.as_deref().unwrap_or("no error message")
            );
            return None;
        }

        let Some(reasoning) = response.data.as_deref().and_then(parse_ai_reasoning) else {
            warn!(id = %id, "⚠️ AI analysis returned no usable reasoning, using local reasoning");
            return None;
        };

        let provider_id = response
            .provider
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| provider.provider_id().to_string());

        Some((reasoning, provider_id))
    }
}

// ============================================
// AI RESPONSE PARSING
// ============================================

/// Keys that may carry the reasoning list in an object response
const REASONING_KEYS: [&str; 4] = ["reasoning", "reasons", "keyFactors", "key_factors"];

/// Extract a non-empty list of reasoning lines from a model response.
///
/// Accepts a JSON string array or an object holding one under a known key,
/// optionally wrapped in prose or a ```json fence.
pub fn parse_ai_reasoning(raw: &str) -> Option<Vec<String>> {
    let json = extract_json(raw)?;
    let value: serde_json::Value = serde_json::from_str(json).ok()?;

    let list = match &value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => REASONING_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_array()))?,
        _ => return None,
    };

    let reasoning: Vec<String> = list
        .iter()
        .filter_map(|item| item.as_str())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    (!reasoning.is_empty()).then_some(reasoning)
}

/// Locate the JSON payload inside mixed model output
fn extract_json(raw: &str) -> Option<&str> {
    let text = raw.trim();

    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let first = text.find(|c| c == '{' || c == '[')?;
    let closing = if text[first..].starts_with('{') { '}' } else { ']' };
    let last = text.rfind(closing)?;
    (first < last).then(|| &text[first..=last])
}
