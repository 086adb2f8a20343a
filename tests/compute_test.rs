//! Compute inference client against a local OpenAI-compatible endpoint

use axum::{http::StatusCode, routing::post, Json, Router};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sygna::{
    ComputeClient, ComputeConfig, InferenceProvider, InferenceRequest, IntelligentRiskScorer,
    RiskFactors,
};
use tokio::net::TcpListener;

type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

async fn spawn_provider(status: StatusCode, reply: serde_json::Value) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();

    let app = Router::new().route(
        "/v1/proxy/chat/completions",
        post(move |headers: axum::http::HeaderMap, Json(body): Json<serde_json::Value>| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                sink.lock().unwrap().push((auth, body));
                (status, Json(reply))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1/proxy", addr), captured)
}

fn config(endpoint: String) -> ComputeConfig {
    ComputeConfig {
        endpoint: Some(endpoint),
        provider_id: "0xprovider".to_string(),
        model: "llama-3.3-70b-instruct".to_string(),
        api_key: Some("app-sk-test".to_string()),
        timeout: Duration::from_secs(5),
    }
}

fn request() -> InferenceRequest {
    InferenceRequest::new(
        serde_json::json!({"hash": "0xfeed", "value": "3.2"}),
        RiskFactors::new(90.0, 20.0, 20.0, 50.0, 10.0, 85.0),
    )
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn test_successful_completion() {
    let (endpoint, captured) = spawn_provider(
        StatusCode::OK,
        completion(r#"{"reasoning": ["Outflow to a mixer"]}"#),
    )
    .await;
    let client = ComputeClient::new(&config(endpoint)).unwrap();

    let response = client.analyze_transaction(&request()).await.unwrap();
    assert!(response.success);
    assert_eq!(response.provider.as_deref(), Some("0xprovider"));
    assert_eq!(response.data.as_deref(), Some(r#"{"reasoning": ["Outflow to a mixer"]}"#));

    let calls = captured.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (auth, body) = &calls[0];
    assert_eq!(auth.as_deref(), Some("Bearer app-sk-test"));
    assert_eq!(body["model"], "llama-3.3-70b-instruct");
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][1]["content"].as_str().unwrap().contains("0xfeed"));
}

#[tokio::test]
async fn test_non_success_status_is_unsuccessful_response() {
    let (endpoint, _) = spawn_provider(
        StatusCode::SERVICE_UNAVAILABLE,
        serde_json::json!({"error": "no capacity"}),
    )
    .await;
    let client = ComputeClient::new(&config(endpoint)).unwrap();

    let response = client.analyze_transaction(&request()).await.unwrap();
    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("HTTP 503"));
}

#[tokio::test]
async fn test_empty_choices_is_error() {
    let (endpoint, _) = spawn_provider(StatusCode::OK, serde_json::json!({"choices": []})).await;
    let client = ComputeClient::new(&config(endpoint)).unwrap();

    assert!(client.analyze_transaction(&request()).await.is_err());
}

#[tokio::test]
async fn test_scorer_end_to_end_with_compute_client() {
    let (endpoint, _) = spawn_provider(
        StatusCode::OK,
        completion("```json\n{\"reasoning\": [\"Fresh wallet draining funds\"]}\n```"),
    )
    .await;
    let scorer = IntelligentRiskScorer::from_config(&config(endpoint));

    let metadata = scorer
        .generate_risk_metadata_with_ai(
            "tx-e2e",
            RiskFactors::uniform(70.0),
            Some(&serde_json::json!({"hash": "0x1"})),
        )
        .await;

    assert_eq!(metadata.reasoning, vec!["Fresh wallet draining funds"]);
    assert_eq!(metadata.audit_trail.model, "0g-compute-0xprovider");
}

#[tokio::test]
async fn test_unreachable_provider_falls_back() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let scorer = IntelligentRiskScorer::from_config(&config(format!("http://{}", addr)));
    let metadata = scorer
        .generate_risk_metadata_with_ai(
            "tx-down",
            RiskFactors::uniform(50.0),
            Some(&serde_json::json!({"hash": "0x2"})),
        )
        .await;

    assert!(metadata.audit_trail.provider.is_none());
    assert_eq!(metadata.reasoning, vec!["Risk level: medium based on standard analysis"]);
}
