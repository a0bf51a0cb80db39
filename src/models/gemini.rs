use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::traits::Model;
use super::types::{ChatMessage, Citation, GenerationConfig, ModelResponse};
use crate::constants::FALLBACK_MODEL_API_KEY_ENV;
use crate::utils::ProbeError;

/// Gemini `generateContent` over REST
pub struct GeminiModel {
    client: Client,
    api_base: String,
    model_name: String,
    api_key: String,
}

impl GeminiModel {
    pub fn new(
        api_base: impl Into<String>,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProbeError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProbeError::Config("the model API key is empty".to_string()));
        }
        Ok(Self {
            client: Client::builder().build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model_name: model_name.into(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model_name)
    }
}

/// Read the API key from `primary`, falling back to `GEMINI_API_KEY`
pub fn api_key_from_env(primary: &str) -> Result<String, ProbeError> {
    [primary, FALLBACK_MODEL_API_KEY_ENV]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            ProbeError::Config(format!(
                "no model API key found; set {} or {}",
                primary, FALLBACK_MODEL_API_KEY_ENV
            ))
        })
}

fn request_body(
    system_instruction: Option<&str>,
    history: &[ChatMessage],
    config: &GenerationConfig,
) -> Value {
    let contents: Vec<Value> = history
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "parts": [{ "text": message.content }],
            })
        })
        .collect();

    let mut body = json!({
        "contents": contents,
        "generationConfig": { "temperature": config.temperature },
    });
    if let Some(instruction) = system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    if config.google_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

fn parse_response(response: GenerateResponse, model_name: &str) -> Result<ModelResponse, ProbeError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProbeError::Model("the model returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    // Sources missing either a link or a title are not worth showing
    let citations = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| match (web.uri, web.title) {
            (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => {
                Some(Citation { uri, title })
            }
            _ => None,
        })
        .collect();

    Ok(ModelResponse {
        text,
        citations,
        model_name: model_name.to_string(),
    })
}

#[async_trait]
impl Model for GeminiModel {
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        history: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<ModelResponse, ProbeError> {
        let body = request_body(system_instruction, history, config);
        debug!("sending {} message(s) to {}", history.len(), self.model_name);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ProbeError::Model(format!("{}: {}", status, message)));
        }

        let parsed: GenerateResponse = response.json().await?;
        parse_response(parsed, &self.model_name)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

// Response structures for the generateContent API

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}
