//! Integration tests for risk scoring and AI-assisted metadata

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sygna::{
    calculate_risk_score, AppError, AppResult, InferenceProvider, InferenceRequest,
    InferenceResponse, IntelligentRiskScorer, RiskFactors, Severity,
};

/// Provider returning a scripted outcome and counting calls
struct ScriptedProvider {
    outcome: fn() -> AppResult<InferenceResponse>,
    delay: Duration,
    calls: AtomicUsize,
    last_request: std::sync::Mutex<Option<serde_json::Value>>,
}

impl ScriptedProvider {
    fn new(outcome: fn() -> AppResult<InferenceResponse>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: std::sync::Mutex::new(None),
        })
    }

    fn slow(outcome: fn() -> AppResult<InferenceResponse>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            delay,
            calls: AtomicUsize::new(0),
            last_request: std::sync::Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "0xconfigured"
    }

    async fn analyze_transaction(&self, request: &InferenceRequest) -> AppResult<InferenceResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(serde_json::to_value(request).unwrap());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.outcome)()
    }
}

fn reference_factors() -> RiskFactors {
    RiskFactors::new(80.0, 45.0, 30.0, 60.0, 80.0, 70.0)
}

/// Trips the volume, wallet age and behavior rules
fn alarming_factors() -> RiskFactors {
    RiskFactors::new(90.0, 20.0, 20.0, 50.0, 10.0, 85.0)
}

fn tx() -> serde_json::Value {
    serde_json::json!({"hash": "0xfeed", "from": "0xaaa", "to": "0xbbb", "value": "3.2"})
}

#[test]
fn test_reference_scenario() {
    let assessment = calculate_risk_score(&reference_factors());
    assert_eq!(assessment.score, 59.0);
    assert_eq!(assessment.severity, Severity::Medium);
    assert_eq!(assessment.confidence, 55.0);
}

#[test]
fn test_score_is_monotone_in_each_factor() {
    let base = RiskFactors::uniform(40.0);
    let base_score = calculate_risk_score(&base).score;

    let bumped = [
        RiskFactors { transaction_volume: 60.0, ..base },
        RiskFactors { frequency_score: 60.0, ..base },
        RiskFactors { contract_risk: 60.0, ..base },
        RiskFactors { network_reputation: 60.0, ..base },
        RiskFactors { wallet_age: 60.0, ..base },
        RiskFactors { behavior_pattern: 60.0, ..base },
    ];
    for factors in bumped {
        assert!(calculate_risk_score(&factors).score > base_score);
    }
}

#[test]
fn test_uniform_factors_have_full_confidence() {
    for level in [0.0, 25.0, 50.0, 75.0, 100.0] {
        let assessment = calculate_risk_score(&RiskFactors::uniform(level));
        assert!((assessment.score - level).abs() < 1e-9);
        assert_eq!(assessment.confidence, 85.0);
    }
}

#[test]
fn test_polarized_factors_floor_confidence() {
    let factors = RiskFactors::new(0.0, 100.0, 0.0, 100.0, 0.0, 100.0);
    assert_eq!(calculate_risk_score(&factors).confidence, 55.0);
}

#[tokio::test]
async fn test_ai_success_records_provider() {
    let provider = ScriptedProvider::new(|| {
        Ok(InferenceResponse::success(
            r#"{"reasoning": ["Funds routed through a fresh contract", "Burst of transfers"]}"#,
            "0xprovider",
        ))
    });
    let scorer = IntelligentRiskScorer::with_provider(provider.clone());

    let metadata = scorer
        .generate_risk_metadata_with_ai("tx-1", reference_factors(), Some(&tx()))
        .await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(
        metadata.reasoning,
        vec!["Funds routed through a fresh contract", "Burst of transfers"]
    );
    assert_eq!(metadata.audit_trail.version, "2.0.0");
    assert_eq!(metadata.audit_trail.model, "0g-compute-0xprovider");
    assert_eq!(metadata.audit_trail.provider.as_deref(), Some("0xprovider"));
    assert_eq!(metadata.risk_score, 59.0);

    let sent = provider.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent["transactionData"]["hash"], "0xfeed");
    assert_eq!(sent["context"]["riskFactors"]["walletAge"], 80.0);
}

#[tokio::test]
async fn test_ai_success_without_provider_id_uses_configured() {
    let provider = ScriptedProvider::new(|| {
        Ok(InferenceResponse {
            success: true,
            data: Some(r#"["Looks routine"]"#.to_string()),
            error: None,
            provider: None,
        })
    });
    let scorer = IntelligentRiskScorer::with_provider(provider);

    let metadata = scorer
        .generate_risk_metadata_with_ai("tx-2", RiskFactors::uniform(10.0), Some(&tx()))
        .await;
    assert_eq!(metadata.audit_trail.model, "0g-compute-0xconfigured");
}

#[tokio::test]
async fn test_no_transaction_data_never_calls_provider() {
    let provider = ScriptedProvider::new(|| Ok(InferenceResponse::success(r#"["x"]"#, "p")));
    let scorer = IntelligentRiskScorer::with_provider(provider.clone());

    let metadata = scorer
        .generate_risk_metadata_with_ai("tx-3", alarming_factors(), None)
        .await;

    assert_eq!(provider.calls(), 0);
    assert_eq!(metadata.audit_trail.version, "1.0.0");
    assert_eq!(metadata.audit_trail.model, "intelligent-risk-scorer-v1");
    assert_eq!(
        metadata.reasoning,
        vec![
            "High transaction volume detected",
            "New wallet with limited transaction history",
            "Anomalous behavioral pattern detected",
        ]
    );
}

#[tokio::test]
async fn test_provider_failures_fall_back_to_local_rules() {
    let outcomes: [fn() -> AppResult<InferenceResponse>; 4] = [
        || Err(AppError::invalid_inference("connection reset")),
        || Ok(InferenceResponse::failure("HTTP 503: overloaded")),
        || Ok(InferenceResponse::success("I cannot answer that", "p")),
        || Ok(InferenceResponse::success(r#"{"reasoning": []}"#, "p")),
    ];

    for outcome in outcomes {
        let provider = ScriptedProvider::new(outcome);
        let scorer = IntelligentRiskScorer::with_provider(provider.clone());
        let metadata = scorer
            .generate_risk_metadata_with_ai("tx-f", RiskFactors::uniform(50.0), Some(&tx()))
            .await;

        assert_eq!(provider.calls(), 1);
        assert!(metadata.audit_trail.provider.is_none());
        assert_eq!(metadata.audit_trail.version, "1.0.0");
        assert_eq!(metadata.reasoning, vec!["Risk level: medium based on standard analysis"]);
    }
}

#[tokio::test]
async fn test_slow_provider_times_out_to_local_rules() {
    let provider = ScriptedProvider::slow(
        || Ok(InferenceResponse::success(r#"["too late"]"#, "p")),
        Duration::from_secs(10),
    );
    let scorer = IntelligentRiskScorer::with_provider(provider.clone())
        .with_ai_timeout(Duration::from_millis(50));

    let metadata = scorer
        .generate_risk_metadata_with_ai("tx-slow", alarming_factors(), Some(&tx()))
        .await;

    assert_eq!(provider.calls(), 1);
    assert!(metadata.audit_trail.provider.is_none());
    assert_eq!(metadata.reasoning.len(), 3);
}

#[tokio::test]
async fn test_local_only_scorer_with_transaction_data() {
    let scorer = IntelligentRiskScorer::new();
    let metadata = scorer
        .generate_risk_metadata_with_ai("tx-l", RiskFactors::uniform(95.0), Some(&tx()))
        .await;

    assert_eq!(metadata.severity, Severity::Critical);
    assert!(metadata.reasoning.contains(&"Elevated smart contract interaction risk".to_string()));
    assert!(metadata.audit_trail.provider.is_none());
}

#[test]
fn test_metadata_serializes_camel_case() {
    let metadata = IntelligentRiskScorer::new().generate_risk_metadata(
        "wallet-9",
        reference_factors(),
        vec!["manual review".to_string()],
    );
    let json = serde_json::to_value(&metadata).unwrap();

    assert_eq!(json["riskScore"], 59.0);
    assert_eq!(json["severity"], "medium");
    assert_eq!(json["factors"]["transactionVolume"], 80.0);
    assert_eq!(json["auditTrail"]["model"], "intelligent-risk-scorer-v1");
    assert!(json["auditTrail"]["calculatedAt"].is_string());
    assert!(json["auditTrail"].get("provider").is_none());
}
