//! Room assessment client
//!
//! Sends one image plus a fixed inspection instruction to a multimodal
//! inference backend (Google Gemini `generateContent`) and validates the
//! structured JSON answer into a [`CleaningAnalysis`].
//!
//! No retries happen here. A failed assessment surfaces as an error on the
//! room and is only retried when the user retakes the photo.

use async_trait::async_trait;
use autocheck_common::config::BackendConfig;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::models::{CleaningAnalysis, ImageUpload};

const USER_AGENT: &str = concat!("AutoCheck/", env!("CARGO_PKG_VERSION"));

/// Assessment errors, scoped to a single room
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    /// Request could not be sent or no usable response was received
    #[error("Assessment request failed: {0}")]
    Transport(String),

    /// Response arrived but does not match the expected shape
    #[error("Malformed assessment response: {0}")]
    MalformedResponse(String),
}

/// Anything able to assess a room photograph
#[async_trait]
pub trait RoomAssessor: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn assess(&self, image: &ImageUpload) -> Result<CleaningAnalysis, AssessmentError>;
}

/// Connection settings for [`GeminiClient`]
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub response_language: String,
}

impl GeminiConfig {
    pub fn from_backend(backend: &BackendConfig, api_key: String) -> Self {
        Self {
            api_key,
            model: backend.model.clone(),
            base_url: backend.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(backend.timeout_secs),
            response_language: backend.response_language.clone(),
        }
    }
}

/// Inspection instruction sent with every image
pub fn inspection_instruction(response_language: &str) -> String {
    format!(
        "You are an expert professional cleanliness inspector for luxury apartments.\n\
         Analyze the uploaded image.\n\
         \n\
         Your task is:\n\
         1. Identify which room it is (e.g. kitchen, bathroom, bedroom, living room, balcony).\n\
         2. Assign a cleanliness score from 0 to 100.\n\
            - 100 means absolutely impeccable, ready for a VIP guest.\n\
            - Below 50 means significant visible dirt or clutter.\n\
            - 90-99 means very clean but with minor details missed.\n\
         3. Provide a brief summary of the condition.\n\
         4. List the specific issues found (e.g. \"Dust on the baseboard\", \"Stain on the mirror\").\n\
         5. Provide actionable, specific tips to reach a score of 100.\n\
         \n\
         IMPORTANT: Write the room name, summary, issues and tips in {}.",
        response_language
    )
}

/// JSON schema the backend must follow
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "roomName": {
                "type": "STRING",
                "description": "The type of room identified (e.g., Cocina, Baño)."
            },
            "score": {
                "type": "INTEGER",
                "description": "The cleanliness score between 0 and 100."
            },
            "summary": {
                "type": "STRING",
                "description": "A brief summary of the cleanliness state."
            },
            "issues": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of specific cleanliness issues identified in the image."
            },
            "tips": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Actionable steps to fix the issues and reach a score of 100."
            }
        },
        "required": ["roomName", "score", "summary", "issues", "tips"]
    })
}

/// `generateContent` request body
pub fn build_request_body(image: &ImageUpload, instruction: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": general_purpose::STANDARD.encode(&image.bytes),
                    }
                },
                { "text": instruction }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

#[derive(Debug, Deserialize, Serialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text of the first candidate
fn extract_text(envelope: &GenerateContentResponse) -> Option<String> {
    let parts = &envelope.candidates.first()?.content.as_ref()?.parts;
    let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Validate the backend's JSON answer into a typed analysis
///
/// All five fields are required. The score must be an integer in 0..=100;
/// anything else is rejected rather than clamped.
pub fn parse_assessment(text: &str) -> Result<CleaningAnalysis, AssessmentError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| AssessmentError::MalformedResponse(format!("not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| AssessmentError::MalformedResponse("expected a JSON object".to_string()))?;

    let field = |name: &str| {
        object
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| AssessmentError::MalformedResponse(format!("missing field '{}'", name)))
    };

    let string_field = |name: &str| -> Result<String, AssessmentError> {
        field(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AssessmentError::MalformedResponse(format!("'{}' is not a string", name)))
    };

    let list_field = |name: &str| -> Result<Vec<String>, AssessmentError> {
        let items = field(name)?.as_array().ok_or_else(|| {
            AssessmentError::MalformedResponse(format!("'{}' is not an array", name))
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    AssessmentError::MalformedResponse(format!("'{}' contains a non-string item", name))
                })
            })
            .collect()
    };

    let room_label = string_field("roomName")?;
    let score = parse_score(field("score")?)?;
    let summary = string_field("summary")?;
    let issues = list_field("issues")?;
    let tips = list_field("tips")?;

    Ok(CleaningAnalysis {
        room_label,
        score,
        summary,
        issues,
        tips,
    })
}

fn parse_score(value: &Value) -> Result<u8, AssessmentError> {
    let score = if let Some(n) = value.as_i64() {
        n
    } else if let Some(f) = value.as_f64().filter(|f| f.fract() == 0.0) {
        f as i64
    } else {
        return Err(AssessmentError::MalformedResponse(format!(
            "score is not an integer: {}",
            value
        )));
    };

    if !(0..=100).contains(&score) {
        return Err(AssessmentError::MalformedResponse(format!(
            "score {} outside 0-100",
            score
        )));
    }
    Ok(score as u8)
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    config: GeminiConfig,
    instruction: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AssessmentError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssessmentError::Transport(e.to_string()))?;

        let instruction = inspection_instruction(&config.response_language);

        Ok(Self {
            http_client,
            config,
            instruction,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl RoomAssessor for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn assess(&self, image: &ImageUpload) -> Result<CleaningAnalysis, AssessmentError> {
        let body = build_request_body(image, &self.instruction);

        tracing::debug!(
            model = %self.config.model,
            mime_type = %image.mime_type,
            image_bytes = image.len(),
            "Sending assessment request"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssessmentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Assessment backend returned an error status");
            return Err(AssessmentError::Transport(format!(
                "backend returned HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| AssessmentError::Transport(e.to_string()))?;

        let envelope: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| AssessmentError::MalformedResponse(format!("unexpected envelope: {}", e)))?;

        let text = extract_text(&envelope).ok_or_else(|| {
            AssessmentError::MalformedResponse("no candidate text in response".to_string())
        })?;

        let analysis = parse_assessment(&text)?;

        tracing::info!(
            room_label = %analysis.room_label,
            score = analysis.score,
            issues = analysis.issues.len(),
            "Assessment successful"
        );

        Ok(analysis)
    }
}
