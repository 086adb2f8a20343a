//! Risk Scoring Module
//!
//! Deterministic, explainable mapping from six wallet/transaction risk
//! signals to a 0-100 score, a severity tier and a confidence value.
//!
//! - Score: fixed weighted sum of the six factors
//! - Severity: inclusive lower bounds (30 / 60 / 80)
//! - Confidence: inverse of the spread between factors (agreeing signals are
//!   trusted more than scattered ones)
//!
//! No I/O, no hidden state.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// FACTOR WEIGHTS (sum to 1.0)
// ============================================

pub mod weights {
    pub const TRANSACTION_VOLUME: f64 = 0.25;
    pub const FREQUENCY_SCORE: f64 = 0.20;
    pub const CONTRACT_RISK: f64 = 0.20;
    pub const NETWORK_REPUTATION: f64 = 0.15;
    pub const WALLET_AGE: f64 = 0.10;
    pub const BEHAVIOR_PATTERN: f64 = 0.10;

    /// Weights in factor order
    pub const ALL: [f64; 6] = [
        TRANSACTION_VOLUME,
        FREQUENCY_SCORE,
        CONTRACT_RISK,
        NETWORK_REPUTATION,
        WALLET_AGE,
        BEHAVIOR_PATTERN,
    ];
}

/// Severity lower bounds (inclusive)
pub mod thresholds {
    pub const CRITICAL: f64 = 80.0;
    pub const HIGH: f64 = 60.0;
    pub const MEDIUM: f64 = 30.0;
}

/// Confidence heuristic parameters
pub mod confidence {
    /// Confidence when all factors agree (zero variance)
    pub const BASE: f64 = 85.0;
    /// Variance to confidence-penalty factor
    pub const VARIANCE_FACTOR: f64 = 0.5;
    /// Largest penalty applied
    pub const MAX_PENALTY: f64 = 30.0;
    pub const MIN: f64 = 50.0;
    pub const MAX: f64 = 100.0;
}

/// Factor thresholds that produce a reasoning line
mod reasoning_triggers {
    pub const HIGH_VOLUME: f64 = 80.0;
    pub const HIGH_FREQUENCY: f64 = 70.0;
    pub const HIGH_CONTRACT_RISK: f64 = 60.0;
    pub const LOW_REPUTATION: f64 = 40.0;
    pub const NEW_WALLET: f64 = 30.0;
    pub const ANOMALOUS_BEHAVIOR: f64 = 70.0;
}

const FACTOR_MIN: f64 = 0.0;
const FACTOR_MAX: f64 = 100.0;

// ============================================
// TYPES
// ============================================

/// Six risk signals, each on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub transaction_volume: f64,
    pub frequency_score: f64,
    pub contract_risk: f64,
    pub network_reputation: f64,
    pub wallet_age: f64,
    pub behavior_pattern: f64,
}

impl RiskFactors {
    pub fn new(
        transaction_volume: f64,
        frequency_score: f64,
        contract_risk: f64,
        network_reputation: f64,
        wallet_age: f64,
        behavior_pattern: f64,
    ) -> Self {
        Self {
            transaction_volume,
            frequency_score,
            contract_risk,
            network_reputation,
            wallet_age,
            behavior_pattern,
        }
    }

    /// Every factor set to the same value
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value, value, value)
    }

    /// Factors in weight order
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.transaction_volume,
            self.frequency_score,
            self.contract_risk,
            self.network_reputation,
            self.wallet_age,
            self.behavior_pattern,
        ]
    }

    /// Copy with every factor forced into [0, 100]; NaN counts as 0
    pub fn clamped(&self) -> Self {
        let [tv, fs, cr, nr, wa, bp] = self.as_array().map(clamp_factor);
        Self::new(tv, fs, cr, nr, wa, bp)
    }

    /// True when no factor needed clamping
    pub fn is_in_range(&self) -> bool {
        self.as_array()
            .iter()
            .all(|v| (FACTOR_MIN..=FACTOR_MAX).contains(v))
    }
}

/// Severity tier derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= thresholds::CRITICAL {
            Self::Critical
        } else if score >= thresholds::HIGH {
            Self::High
        } else if score >= thresholds::MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and critical records are surfaced as alerts
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High => "🟠",
            Self::Critical => "🔴",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one set of factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Weighted score (0-100)
    pub score: f64,
    pub severity: Severity,
    /// Confidence (50-100)
    pub confidence: f64,
}

// ============================================
// SCORING
// ============================================

/// Score a set of factors.
///
/// Factors are clamped to [0, 100] first, so out-of-range input can never
/// push the score or the confidence outside their documented ranges.
pub fn calculate_risk_score(factors: &RiskFactors) -> RiskAssessment {
    let values = factors.clamped().as_array();

    let score: f64 = values
        .iter()
        .zip(weights::ALL.iter())
        .map(|(value, weight)| value * weight)
        .sum();
    let score = score.clamp(FACTOR_MIN, FACTOR_MAX);

    RiskAssessment {
        score,
        severity: Severity::from_score(score),
        confidence: confidence_from_variance(population_variance(&values)),
    }
}

/// Confidence drops as the factors disagree with each other
fn confidence_from_variance(variance: f64) -> f64 {
    let penalty = (variance * confidence::VARIANCE_FACTOR).min(confidence::MAX_PENALTY);
    (confidence::BASE - penalty).clamp(confidence::MIN, confidence::MAX)
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn clamp_factor(value: f64) -> f64 {
    if value.is_nan() {
        FACTOR_MIN
    } else {
        value.clamp(FACTOR_MIN, FACTOR_MAX)
    }
}

// ============================================
// RULE-BASED REASONING
// ============================================

/// Human-readable reasons for a score.
///
/// Check order is fixed so output stays diffable between runs.
pub fn fallback_reasoning(factors: &RiskFactors, severity: Severity) -> Vec<String> {
    use reasoning_triggers::*;

    let f = factors.clamped();
    let mut reasoning = Vec::new();

    if f.transaction_volume > HIGH_VOLUME {
        reasoning.push("High transaction volume detected".to_string());
    }
    if f.frequency_score > HIGH_FREQUENCY {
        reasoning.push("Unusual transaction frequency pattern".to_string());
    }
    if f.contract_risk > HIGH_CONTRACT_RISK {
        reasoning.push("Elevated smart contract interaction risk".to_string());
    }
    if f.network_reputation < LOW_REPUTATION {
        reasoning.push("Low network reputation score".to_string());
    }
    if f.wallet_age < NEW_WALLET {
        reasoning.push("New wallet with limited transaction history".to_string());
    }
    if f.behavior_pattern > ANOMALOUS_BEHAVIOR {
        reasoning.push("Anomalous behavioral pattern detected".to_string());
    }

    if reasoning.is_empty() {
        reasoning.push(format!("Risk level: {} based on standard analysis", severity));
    }

    reasoning
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = weights::ALL.iter().sum();
        assert!(approx(total, 1.0), "weights summed to {}", total);
    }

    #[test]
    fn test_uniform_factors_score_and_confidence() {
        let assessment = calculate_risk_score(&RiskFactors::uniform(50.0));
        assert!(approx(assessment.score, 50.0));
        assert_eq!(assessment.severity, Severity::Medium);
        assert!(approx(assessment.confidence, 85.0));
    }

    #[test]
    fn test_zero_variance_confidence_regardless_of_severity() {
        for value in [0.0, 10.0, 45.0, 70.0, 95.0, 100.0] {
            let assessment = calculate_risk_score(&RiskFactors::uniform(value));
            assert!(approx(assessment.confidence, 85.0), "value {}", value);
        }
    }

    #[test]
    fn test_severity_boundaries() {
        let cases = [
            (80.0, Severity::Critical),
            (79.999, Severity::High),
            (60.0, Severity::High),
            (30.0, Severity::Medium),
            (29.999, Severity::Low),
        ];
        for (value, expected) in cases {
            let assessment = calculate_risk_score(&RiskFactors::uniform(value));
            assert_eq!(assessment.score, value, "score for uniform {}", value);
            assert_eq!(assessment.severity, expected, "severity for {}", value);
        }
    }

    #[test]
    fn test_reference_scenario() {
        let factors = RiskFactors::new(80.0, 45.0, 30.0, 60.0, 80.0, 70.0);
        let assessment = calculate_risk_score(&factors);

        // 20 + 9 + 6 + 9 + 8 + 7
        assert!(approx(assessment.score, 59.0), "score was {}", assessment.score);
        assert_eq!(assessment.severity, Severity::Medium);
        assert!(approx(assessment.confidence, 55.0));
    }

    #[test]
    fn test_ranges_hold_across_grid() {
        let steps = [0.0, 17.0, 33.0, 50.0, 66.0, 100.0];
        for &a in &steps {
            for &b in &steps {
                for &c in &steps {
                    let factors = RiskFactors::new(a, b, c, 100.0 - a, b, 100.0 - c);
                    let r = calculate_risk_score(&factors);
                    assert!((0.0..=100.0).contains(&r.score));
                    assert!((50.0..=100.0).contains(&r.confidence));
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let factors = RiskFactors::new(500.0, -20.0, f64::NAN, 100.0, 100.0, 100.0);
        assert!(!factors.is_in_range());

        let clamped = factors.clamped();
        assert_eq!(clamped.transaction_volume, 100.0);
        assert_eq!(clamped.frequency_score, 0.0);
        assert_eq!(clamped.contract_risk, 0.0);

        let r = calculate_risk_score(&factors);
        assert!((0.0..=100.0).contains(&r.score));
        assert!((50.0..=100.0).contains(&r.confidence));
    }

    #[test]
    fn test_fallback_reasoning_order() {
        let factors = RiskFactors::new(90.0, 75.0, 65.0, 20.0, 10.0, 90.0);
        let reasoning = fallback_reasoning(&factors, Severity::High);
        assert_eq!(
            reasoning,
            vec![
                "High transaction volume detected",
                "Unusual transaction frequency pattern",
                "Elevated smart contract interaction risk",
                "Low network reputation score",
                "New wallet with limited transaction history",
                "Anomalous behavioral pattern detected",
            ]
        );
    }

    #[test]
    fn test_fallback_reasoning_thresholds_are_strict() {
        // Exactly on every threshold: nothing triggers
        let factors = RiskFactors::new(80.0, 70.0, 60.0, 40.0, 30.0, 70.0);
        let reasoning = fallback_reasoning(&factors, Severity::Medium);
        assert_eq!(reasoning, vec!["Risk level: medium based on standard analysis"]);
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert!(Severity::High.is_alert());
        assert!(!Severity::Medium.is_alert());
        assert!(Severity::Low < Severity::Critical);
    }

    #[test]
    fn test_factors_wire_format() {
        let json = r#"{"transactionVolume":80,"frequencyScore":45,"contractRisk":30,
            "networkReputation":60,"walletAge":80,"behaviorPattern":70}"#;
        let factors: RiskFactors = serde_json::from_str(json).unwrap();
        assert_eq!(factors, RiskFactors::new(80.0, 45.0, 30.0, 60.0, 80.0, 70.0));
    }
}
