//! Shared data types: audit records, feed envelopes and inference payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::risk_score::{RiskAssessment, RiskFactors, Severity};
use crate::utils::constants::{
    AI_MODEL_PREFIX, AI_SCORER_VERSION, LOCAL_SCORER_MODEL, LOCAL_SCORER_VERSION,
    PING_MESSAGE_TYPE,
};

// ============================================
// RISK METADATA (audit record)
// ============================================

/// How and when a record was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub calculated_at: DateTime<Utc>,
    pub version: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl AuditTrail {
    /// Trail of a record reasoned by the local rules
    pub fn local(calculated_at: DateTime<Utc>) -> Self {
        Self {
            calculated_at,
            version: LOCAL_SCORER_VERSION.to_string(),
            model: LOCAL_SCORER_MODEL.to_string(),
            provider: None,
        }
    }

    /// Trail of a record reasoned by a compute provider
    pub fn ai(calculated_at: DateTime<Utc>, provider_id: &str) -> Self {
        Self {
            calculated_at,
            version: AI_SCORER_VERSION.to_string(),
            model: format!("{}{}", AI_MODEL_PREFIX, provider_id),
            provider: Some(provider_id.to_string()),
        }
    }

    pub fn is_ai_assisted(&self) -> bool {
        self.provider.is_some()
    }
}

/// Auditable result of one scoring event. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub severity: Severity,
    pub confidence: f64,
    pub factors: RiskFactors,
    pub reasoning: Vec<String>,
    pub audit_trail: AuditTrail,
}

impl RiskMetadata {
    pub fn new(
        id: impl Into<String>,
        factors: RiskFactors,
        assessment: RiskAssessment,
        reasoning: Vec<String>,
        audit_trail: AuditTrail,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: audit_trail.calculated_at,
            risk_score: assessment.score,
            severity: assessment.severity,
            confidence: assessment.confidence,
            factors,
            reasoning,
            audit_trail,
        }
    }

    /// One-line log summary
    pub fn summary(&self) -> String {
        format!(
            "{} {} | Score: {:.1} | Confidence: {:.0} | Model: {} | {}",
            self.severity.emoji(),
            self.id,
            self.risk_score,
            self.confidence,
            self.audit_trail.model,
            self.reasoning.join("; ")
        )
    }
}

// ============================================
// REALTIME ENVELOPE
// ============================================

/// Feed envelope, both directions: `{ "type", "data", "timestamp" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl RealtimeMessage {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Parse an inbound text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Outbound heartbeat: `{ "type": "ping", "timestamp": <ms> }`
#[derive(Debug, Clone, Serialize)]
pub struct PingMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: i64,
}

impl PingMessage {
    pub fn now() -> Self {
        Self {
            kind: PING_MESSAGE_TYPE,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Payload of `transaction` feed messages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub factors: RiskFactors,
    #[serde(default)]
    pub transaction_data: Option<serde_json::Value>,
}

// ============================================
// INFERENCE PAYLOADS
// ============================================

/// Context handed to the inference provider next to the transaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceContext {
    pub risk_factors: RiskFactors,
}

/// `analyzeTransaction` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub transaction_data: serde_json::Value,
    pub context: InferenceContext,
}

impl InferenceRequest {
    pub fn new(transaction_data: serde_json::Value, risk_factors: RiskFactors) -> Self {
        Self {
            transaction_data,
            context: InferenceContext { risk_factors },
        }
    }
}

/// `analyzeTransaction` response; `data` is the JSON-encoded analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl InferenceResponse {
    pub fn success(data: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
            provider: Some(provider.into()),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            provider: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk_score::calculate_risk_score;

    #[test]
    fn test_envelope_parse() {
        let msg = RealtimeMessage::parse(r#"{"type":"alert","data":{"x":1},"timestamp":1700000000000}"#)
            .unwrap();
        assert_eq!(msg.kind, "alert");
        assert_eq!(msg.data["x"], 1);
        assert_eq!(msg.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_envelope_missing_data_defaults_to_null() {
        let msg = RealtimeMessage::parse(r#"{"type":"pong","timestamp":1}"#).unwrap();
        assert!(msg.data.is_null());
    }

    #[test]
    fn test_envelope_rejects_bad_shapes() {
        assert!(RealtimeMessage::parse("not json").is_err());
        assert!(RealtimeMessage::parse(r#"{"data":1,"timestamp":1}"#).is_err());
        assert!(RealtimeMessage::parse(r#"{"type":"x","data":1}"#).is_err());
        assert!(RealtimeMessage::parse(r#"{"type":7,"timestamp":1}"#).is_err());
    }

    #[test]
    fn test_ping_wire_format() {
        let json = serde_json::to_value(PingMessage::now()).unwrap();
        assert_eq!(json["type"], "ping");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_metadata_wire_format() {
        let factors = RiskFactors::uniform(50.0);
        let now = Utc::now();
        let metadata = RiskMetadata::new(
            "tx-1",
            factors,
            calculate_risk_score(&factors),
            vec!["ok".to_string()],
            AuditTrail::ai(now, "0xprovider"),
        );

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["riskScore"], 50.0);
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["auditTrail"]["model"], "0g-compute-0xprovider");
        assert_eq!(json["auditTrail"]["version"], "2.0.0");
        assert_eq!(json["factors"]["walletAge"], 50.0);
    }

    #[test]
    fn test_local_trail_has_no_provider() {
        let trail = AuditTrail::local(Utc::now());
        assert_eq!(trail.version, "1.0.0");
        assert_eq!(trail.model, "intelligent-risk-scorer-v1");
        assert!(!trail.is_ai_assisted());
        let json = serde_json::to_value(&trail).unwrap();
        assert!(json.get("provider").is_none());
    }
}
