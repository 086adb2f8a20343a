//! 0G-Sygna Feed Monitor
//!
//! Connects to the realtime activity feed, scores every `transaction`
//! event and logs high/critical records as alerts.
//!
//! Environment:
//!   SYGNA_WS_URL        - Feed URL (default: ws://localhost:3001/ws)
//!   SYGNA_COMPUTE_URL   - Optional compute provider for AI reasoning
//!   RUST_LOG            - Log filter (default: info)

use sygna::utils::constants::{TRANSACTION_TOPIC, WILDCARD_TOPIC};
use sygna::{
    AssessmentTelemetry, ConnectionEvent, IntelligentRiskScorer, RealtimeClient, SygnaConfig,
    TransactionEvent,
};

use eyre::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const SCORING_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = SygnaConfig::from_env()?;
    let scorer = IntelligentRiskScorer::from_config(&config.compute);
    let telemetry = Arc::new(AssessmentTelemetry::new());
    let client = RealtimeClient::new(config.realtime.clone());

    // Callbacks stay synchronous; scoring happens on the worker
    let (tx, rx) = mpsc::channel::<TransactionEvent>(SCORING_QUEUE_CAPACITY);
    let _transactions = client.subscribe(TRANSACTION_TOPIC, move |msg| {
        match serde_json::from_value::<TransactionEvent>(msg.data.clone()) {
            Ok(event) => {
                if let Err(e) = tx.try_send(event) {
                    warn!("⚠️ Scoring queue unavailable, dropping transaction: {}", e);
                }
            }
            Err(e) => warn!("⚠️ Ignoring malformed transaction event: {}", e),
        }
    });
    let _everything = client.subscribe(WILDCARD_TOPIC, |msg| {
        debug!(kind = %msg.kind, timestamp = msg.timestamp, "📨 Feed event");
    });

    let worker = tokio::spawn(score_transactions(rx, scorer, telemetry.clone()));

    let mut events = client.events();
    client.connect();
    info!("🛰️ Monitoring {} (Ctrl+C to stop)", client.url());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ConnectionEvent::Connected) => info!("✅ Feed connected"),
                Ok(ConnectionEvent::Disconnected) => warn!("🔌 Feed disconnected"),
                Ok(ConnectionEvent::Reconnecting { attempt, delay }) => {
                    info!(attempt, delay_ms = delay.as_millis() as u64, "🔄 Feed reconnect scheduled");
                }
                Ok(ConnectionEvent::GaveUp { attempts }) => {
                    error!("❌ Feed unreachable after {} attempts, exiting", attempts);
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Missed {} connection events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutting down gracefully...");
                break;
            }
        }
    }

    // Clearing subscribers drops the sender and lets the worker drain
    client.disconnect();
    if let Err(e) = worker.await {
        warn!("⚠️ Scoring worker ended abnormally: {}", e);
    }

    println!("{}", telemetry.stats().summary());

    Ok(())
}

async fn score_transactions(
    mut rx: mpsc::Receiver<TransactionEvent>,
    scorer: IntelligentRiskScorer,
    telemetry: Arc<AssessmentTelemetry>,
) {
    while let Some(event) = rx.recv().await {
        let start = Instant::now();
        let id = event.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let metadata = scorer
            .generate_risk_metadata_with_ai(id, event.factors, event.transaction_data.as_ref())
            .await;
        telemetry.record(&metadata, start.elapsed().as_millis() as u64);

        if metadata.severity.is_alert() {
            warn!(id = %metadata.id, "🚨 {}", metadata.summary());
            for line in &metadata.reasoning {
                warn!("   • {}", line);
            }
        } else {
            info!(id = %metadata.id, "{}", metadata.summary());
        }
    }
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════╗
    ║                                              ║
    ║              0 G  -  S Y G N A               ║
    ║                                              ║
    ║        Realtime Risk Feed Monitor            ║
    ║                                              ║
    ╚══════════════════════════════════════════════╝
    "#
    );
}
