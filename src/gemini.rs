//! Gemini API client
//!
//! Text generation (`generateContent`) and document embeddings
//! (`batchEmbedContents`). Uses a long-lived reqwest::Client for connection pooling.

use crate::error::OrchestrationError;
use crate::retrieval::Embedder;
use crate::tools::TextGenerator;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GENERATION_MODEL: &str = "gemini-2.0-flash";
const EMBEDDING_MODEL: &str = "embedding-001";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> crate::Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}?key={}", self.base_url, model, method, self.api_key)
    }

    /// Generate a response for a single-turn prompt
    pub async fn generate_text(&self, prompt: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::GenerationError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        info!(prompt_len = prompt.len(), "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint(GENERATION_MODEL, "generateContent"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                OrchestrationError::GenerationError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(OrchestrationError::GenerationError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::GenerationError(format!("Gemini parse error: {}", e))
        })?;

        let (answer, finish_reason) = first_candidate_text(&gemini_response)?;

        info!(
            finish_reason = finish_reason.unwrap_or("unknown"),
            answer_len = answer.len(),
            "Gemini response received"
        );

        Ok(answer)
    }

    /// Embed a batch of texts, one vector per input in input order
    pub async fn embed_texts(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.api_key.is_empty() {
            return Err(OrchestrationError::RetrievalError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let model = format!("models/{}", EMBEDDING_MODEL);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model.clone(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint(EMBEDDING_MODEL, "batchEmbedContents"))
            .json(&request)
            .send()
            .await
            .map_err(|e| OrchestrationError::RetrievalError(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OrchestrationError::RetrievalError(format!(
                "Embedding API error: {}",
                error_text
            )));
        }

        let parsed: BatchEmbedResponse = response.json().await.map_err(|e| {
            OrchestrationError::RetrievalError(format!("Embedding parse error: {}", e))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(OrchestrationError::RetrievalError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.generate_text(prompt).await
    }
}

#[async_trait::async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.embed_texts(texts).await
    }
}

const SYSTEM_PROMPT: &str = r#"You are a professional financial assistant.

Guidelines:
- Provide accurate and educational financial information
- Be structured and concise
- Emphasize research and risk awareness
- Say so plainly when you are unsure"#;

fn first_candidate_text(response: &GeminiResponse) -> crate::Result<(String, Option<&str>)> {
    let candidate = response.candidates.first().ok_or_else(|| {
        OrchestrationError::GenerationError("No response from Gemini API".to_string())
    })?;

    let text = candidate
        .content
        .parts
        .first()
        .ok_or_else(|| OrchestrationError::GenerationError("Empty response from Gemini".to_string()))?
        .text
        .clone();

    Ok((text, candidate.finish_reason.as_deref()))
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "What is diversification?".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What is diversification?"));
        assert!(json.contains("max_output_tokens"));
    }

    #[test]
    fn test_candidate_extraction() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Diversify."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        let (text, reason) = first_candidate_text(&response).unwrap();
        assert_eq!(text, "Diversify.");
        assert_eq!(reason, Some("STOP"));

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(first_candidate_text(&empty).is_err());
    }

    #[test]
    fn test_embedding_response_parse() {
        let parsed: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#)
                .unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_empty_key_fails_fast() {
        let client = GeminiClient::new(String::new()).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::GenerationError(_)));
    }
}
