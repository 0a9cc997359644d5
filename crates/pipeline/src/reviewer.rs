//! AI creative review.
//!
//! [`CreativeReviewer`] is the seam the review queue calls; [`GeminiReviewer`]
//! implements it against the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use salesagent_core::approval::ReviewDecision;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::notify::CreativeRef;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Criteria used when the tenant configured none.
const DEFAULT_CRITERIA: &str = "Approve creatives that are brand-safe, legible and \
    free of misleading claims. Reject anything offensive, deceptive or illegal.";

/// What the reviewer needs to judge one creative.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub creative: CreativeRef,
    /// Stored `data` blob (urls, assets, preview).
    pub creative_data: Value,
    pub review_criteria: Option<String>,
    /// Tenant webhook notified once the review finishes.
    pub webhook_url: Option<String>,
}

/// A reviewer's verdict, before the confidence threshold is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewVerdict {
    pub decision: ReviewDecision,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Review request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Reviewer returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid reviewer response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait CreativeReviewer: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewVerdict, ReviewError>;
}

// ---------------------------------------------------------------------------
// GeminiReviewer
// ---------------------------------------------------------------------------

pub struct GeminiReviewer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiReviewer {
    pub fn new(api_key: String, model: String) -> Result<Self, ReviewError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CreativeReviewer for GeminiReviewer {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewVerdict, ReviewError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": review_prompt(request)}]}],
            "generationConfig": {"responseMimeType": "application/json", "temperature": 0.0},
        });

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReviewError::HttpStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let payload: Value = response.json().await?;
        parse_gemini_response(&payload)
    }
}

/// Prompt sent to the model. The model must answer with a JSON object.
pub fn review_prompt(request: &ReviewRequest) -> String {
    let criteria = request
        .review_criteria
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(DEFAULT_CRITERIA);
    let creative = json!({
        "name": request.creative.name,
        "format": request.creative.format_id,
        "url": request.creative_data.get("url"),
        "click_url": request.creative_data.get("click_url"),
        "preview_url": request.creative_data.get("preview_url"),
        "assets": request.creative_data.get("assets"),
    });
    format!(
        "You review advertising creatives for a publisher.\n\n\
         Review criteria:\n{criteria}\n\n\
         Creative:\n{creative}\n\n\
         Respond with JSON only: {{\"decision\": \"APPROVE\" | \"REJECT\" | \
         \"REQUIRE HUMAN APPROVAL\", \"confidence\": <0.0-1.0>, \"reason\": \"<one sentence>\"}}"
    )
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    decision: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

/// Extract the verdict from `candidates[0].content.parts[0].text`.
pub fn parse_gemini_response(payload: &Value) -> Result<ReviewVerdict, ReviewError> {
    let text = payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| ReviewError::InvalidResponse("no candidate text".to_string()))?;
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let raw: RawVerdict =
        serde_json::from_str(cleaned).map_err(|e| ReviewError::InvalidResponse(e.to_string()))?;

    Ok(ReviewVerdict {
        decision: parse_decision(&raw.decision),
        confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        reason: raw.reason.unwrap_or_default(),
    })
}

/// Anything other than a clear approve/reject escalates to a human.
fn parse_decision(value: &str) -> ReviewDecision {
    match value.trim().to_ascii_lowercase().as_str() {
        "approve" | "approved" => ReviewDecision::Approve,
        "reject" | "rejected" => ReviewDecision::Reject,
        _ => ReviewDecision::RequireHuman,
    }
}
