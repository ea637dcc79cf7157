//! Google Gemini API client.
//!
//! Covers the three capabilities the pipeline needs:
//! - text generation (plain and JSON-constrained output)
//! - text embeddings (`:embedContent`)
//! - image description (vision, inline data)

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::{Error, Result};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    generation_model: String,
    embedding_model: String,
}

impl GeminiClient {
    /// Create a client from explicit configuration.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "Gemini API key is empty (set GEMINI_API_KEY)".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent("prismbreak/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: GEMINI_API_URL.to_string(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    /// Override the API base URL (used by tests against a mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Plain text generation.
    pub async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let payload = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
                response_mime_type: None,
            }),
            system_instruction: None,
        };

        self.send_generate(payload).await
    }

    /// Generation constrained to JSON output, with a system instruction.
    ///
    /// The JSON response MIME type makes well-formed output far more likely,
    /// but callers still must treat the result as untrusted text.
    pub async fn generate_json(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let payload = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::Text {
                    text: user.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
                response_mime_type: Some("application/json".to_string()),
            }),
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::Text {
                    text: system.to_string(),
                }],
            }),
        };

        self.send_generate(payload).await
    }

    /// Describe an image (vision, inline data).
    pub async fn describe_image(
        &self,
        image_data: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String> {
        use base64::Engine;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let payload = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: image_base64,
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 256,
                response_mime_type: None,
            }),
            system_instruction: None,
        };

        self.send_generate(payload).await
    }

    /// Generate an embedding vector for a text.
    pub async fn embed_content(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.base_url, self.embedding_model, self.api_key
        );

        let payload = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: EmbedContent {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Embedding(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Embedding(format!(
                "embedding error {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Embedding(format!("invalid embedding response: {}", e)))?;

        Ok(embed_response.embedding.values)
    }

    async fn send_generate(&self, payload: GeminiRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.generation_model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Generation(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Generation(format!(
                "Gemini error {}: {}",
                status, body
            )));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Generation(format!("invalid Gemini response: {}", e)))?;

        gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| match p {
                Part::Text { text } => Some(text.clone()),
                Part::InlineData { .. } => None,
            })
            .ok_or_else(|| Error::Generation("empty response from Gemini".to_string()))
    }
}

// === Request structures ===

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none", rename = "responseMimeType")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<Part>,
}

// === Response structures ===

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Debug, Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}
