//! 0G Compute Inference Module
//!
//! Narrow seam between the risk scorer and a decentralized-compute inference
//! provider. The scorer only ever sees [`InferenceProvider`]; the broker's
//! ledger, funding and fine-tuning operations live outside this crate.
//!
//! Call convention (one, documented):
//! - `POST {endpoint}/chat/completions`, OpenAI-compatible body
//! - the assistant message content is returned verbatim as `data`
//! - non-2xx responses come back as `success = false`, transport failures as `Err`

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::config::ComputeConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{InferenceRequest, InferenceResponse};
use crate::utils::constants::{COMPUTE_MAX_TOKENS, COMPUTE_TEMPERATURE, USER_AGENT as USER_AGENT_CONST};

const SYSTEM_PROMPT: &str = "You are an on-chain risk analyst. Explain the risk of a blockchain \
transaction in short factual statements. Respond ONLY with JSON of the form \
{\"reasoning\": [\"statement\", ...]}.";

/// Remote transaction analysis capability
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Id recorded in audit trails when the response does not name one
    fn provider_id(&self) -> &str;

    async fn analyze_transaction(&self, request: &InferenceRequest) -> AppResult<InferenceResponse>;
}

// ============================================
// OPENAI-COMPATIBLE WIRE TYPES
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ============================================
// COMPUTE CLIENT
// ============================================

/// HTTP client for one compute provider
#[derive(Clone)]
pub struct ComputeClient {
    completions_url: String,
    provider_id: String,
    model: String,
    client: reqwest::Client,
}

impl ComputeClient {
    /// Build a client; fails when no endpoint is configured
    pub fn new(config: &ComputeConfig) -> AppResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(AppError::inference_not_configured)?;

        let client = Self::build_client(config)?;

        info!(
            provider = %config.provider_id,
            model = %config.model,
            "🧠 Compute inference client ready"
        );

        Ok(Self {
            completions_url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            provider_id: config.provider_id.clone(),
            model: config.model.clone(),
            client,
        })
    }

    fn build_client(config: &ComputeConfig) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));

        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| AppError::invalid_config("Compute API key is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(AppError::from)
    }

    pub fn completions_url(&self) -> &str {
        &self.completions_url
    }

    /// User prompt for one transaction
    pub fn build_prompt(request: &InferenceRequest) -> String {
        let transaction = serde_json::to_string_pretty(&request.transaction_data)
            .unwrap_or_else(|_| request.transaction_data.to_string());
        let factors = &request.context.risk_factors;

        format!(
            "Transaction:\n{}\n\nRisk factors (0-100):\n\
             - transactionVolume: {:.1}\n\
             - frequencyScore: {:.1}\n\
             - contractRisk: {:.1}\n\
             - networkReputation: {:.1}\n\
             - walletAge: {:.1}\n\
             - behaviorPattern: {:.1}\n\n\
             List the main reasons this transaction is or is not risky.",
            transaction,
            factors.transaction_volume,
            factors.frequency_score,
            factors.contract_risk,
            factors.network_reputation,
            factors.wallet_age,
            factors.behavior_pattern,
        )
    }
}

#[async_trait]
impl InferenceProvider for ComputeClient {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn analyze_transaction(&self, request: &InferenceRequest) -> AppResult<InferenceResponse> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(&Self::build_prompt(request)),
            ],
            temperature: COMPUTE_TEMPERATURE,
            max_tokens: COMPUTE_MAX_TOKENS,
        };

        debug!(url = %self.completions_url, "📤 Sending inference request");

        let response = self.client.post(&self.completions_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Ok(InferenceResponse::failure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::invalid_inference("Completion contained no choices"))?;

        debug!(chars = content.len(), "📥 Inference response received");

        Ok(InferenceResponse::success(content, self.provider_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk_score::RiskFactors;
    use crate::models::errors::ErrorCode;
    use std::time::Duration;

    fn config(endpoint: Option<&str>) -> ComputeConfig {
        ComputeConfig {
            endpoint: endpoint.map(String::from),
            provider_id: "0xabc".to_string(),
            model: "test-model".to_string(),
            api_key: Some("secret".to_string()),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_requires_endpoint() {
        let err = ComputeClient::new(&config(None)).err().unwrap();
        assert_eq!(err.code, ErrorCode::InferenceNotConfigured);
    }

    #[test]
    fn test_completions_url_joins_cleanly() {
        let client = ComputeClient::new(&config(Some("https://provider.example/v1/proxy/"))).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://provider.example/v1/proxy/chat/completions"
        );
        assert_eq!(client.provider_id(), "0xabc");
    }

    #[test]
    fn test_prompt_contains_transaction_and_factors() {
        let request = InferenceRequest::new(
            serde_json::json!({"hash": "0xdeadbeef", "value": "12.5"}),
            RiskFactors::new(80.0, 45.0, 30.0, 60.0, 80.0, 70.0),
        );
        let prompt = ComputeClient::build_prompt(&request);
        assert!(prompt.contains("0xdeadbeef"));
        assert!(prompt.contains("transactionVolume: 80.0"));
        assert!(prompt.contains("behaviorPattern: 70.0"));
    }

    #[test]
    fn test_request_wire_format() {
        let request = InferenceRequest::new(serde_json::json!({}), RiskFactors::uniform(10.0));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["context"]["riskFactors"]["contractRisk"], 10.0);
        assert!(json["transactionData"].is_object());
    }
}
