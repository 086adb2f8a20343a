//! Assessment Telemetry
//!
//! Process-local counters over generated risk records: how many were
//! scored, which reasoning path produced them, severity mix and latency.
//! No ids or transaction data are retained.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::risk_score::Severity;
use crate::models::types::RiskMetadata;

const SEVERITIES: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

fn severity_index(severity: Severity) -> usize {
    match severity {
        Severity::Low => 0,
        Severity::Medium => 1,
        Severity::High => 2,
        Severity::Critical => 3,
    }
}

/// Serializable snapshot of the counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStats {
    pub total_assessments: u64,
    pub ai_assisted: u64,
    pub local_reasoning: u64,
    /// High + critical
    pub alerts: u64,
    pub by_severity: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    pub period_start: i64,
    pub period_end: i64,
}

impl AssessmentStats {
    /// Share of records whose reasoning came from the inference provider
    pub fn ai_ratio(&self) -> f64 {
        if self.total_assessments == 0 {
            0.0
        } else {
            self.ai_assisted as f64 / self.total_assessments as f64
        }
    }

    /// Human-readable session summary for shutdown logs
    pub fn summary(&self) -> String {
        let count = |s: Severity| self.by_severity.get(s.as_str()).copied().unwrap_or(0);
        format!(
            r#"
╔══════════════════════════════════════════════╗
║          0G-SYGNA - ASSESSMENT REPORT        ║
╠══════════════════════════════════════════════╣
║  Assessments:        {:>10}              ║
║  AI-assisted:        {:>10}              ║
║  Local reasoning:    {:>10}              ║
║  Alerts:             {:>10}              ║
║    critical / high:  {:>4} / {:<4}           ║
║    medium / low:     {:>4} / {:<4}           ║
║  Avg latency:        {:>10.2}ms            ║
╚══════════════════════════════════════════════╝
"#,
            self.total_assessments,
            self.ai_assisted,
            self.local_reasoning,
            self.alerts,
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low),
            self.avg_latency_ms,
        )
    }
}

/// Lock-free collector shared by the API and the feed monitor
#[derive(Debug)]
pub struct AssessmentTelemetry {
    total: AtomicU64,
    ai_assisted: AtomicU64,
    alerts: AtomicU64,
    total_latency_ms: AtomicU64,
    by_severity: [AtomicU64; 4],
    session_start: i64,
}

impl Default for AssessmentTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentTelemetry {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            ai_assisted: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            by_severity: Default::default(),
            session_start: chrono::Utc::now().timestamp(),
        }
    }

    /// Count one generated record and how long it took
    pub fn record(&self, metadata: &RiskMetadata, latency_ms: u64) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.by_severity[severity_index(metadata.severity)].fetch_add(1, Ordering::Relaxed);

        if metadata.audit_trail.is_ai_assisted() {
            self.ai_assisted.fetch_add(1, Ordering::Relaxed);
        }
        if metadata.severity.is_alert() {
            self.alerts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> AssessmentStats {
        let total = self.total.load(Ordering::Relaxed);
        let ai_assisted = self.ai_assisted.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if total > 0 {
            total_latency as f64 / total as f64
        } else {
            0.0
        };

        let by_severity = SEVERITIES
            .iter()
            .map(|s| {
                (
                    s.as_str().to_string(),
                    self.by_severity[severity_index(*s)].load(Ordering::Relaxed),
                )
            })
            .collect();

        AssessmentStats {
            total_assessments: total,
            ai_assisted,
            local_reasoning: total.saturating_sub(ai_assisted),
            alerts: self.alerts.load(Ordering::Relaxed),
            by_severity,
            avg_latency_ms,
            period_start: self.session_start,
            period_end: chrono::Utc::now().timestamp(),
        }
    }

    /// Zero every counter for a new reporting period
    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.ai_assisted.store(0, Ordering::Relaxed);
        self.alerts.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);
        for counter in &self.by_severity {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
