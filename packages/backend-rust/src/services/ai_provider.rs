//! Upstream AI collaborator client.
//!
//! The AI service owns quiz generation, free-text grading and narrative
//! performance analysis. Every call is a single `POST {base}/process` with
//! a `{type, data}` envelope; failures surface as typed errors, never as
//! fallback values.

use std::collections::HashMap;
use std::time::Duration;

use adaptiq_algo::{BloomsLevel, BloomsProgress};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI service HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("AI service JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("AI service rejected the request: {0}")]
    Rejected(String),
}

// ==================== Request / response DTOs ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileContext {
    pub ability_level: f64,
    pub blooms_progress: BloomsProgress,
    pub subject_abilities: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    pub user_id: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: String,
    pub num_questions: u32,
    pub target_blooms_levels: Vec<BloomsLevel>,
    pub student_profile: StudentProfileContext,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    pub difficulty: f64,
    pub blooms_level: BloomsLevel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub title: String,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingQuestion {
    pub id: String,
    pub difficulty: f64,
    pub discrimination: Option<f64>,
    pub guessing: Option<f64>,
    pub blooms_level: BloomsLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub user_id: String,
    pub quiz_id: String,
    pub question_id: String,
    pub answer: String,
    pub response_time: f64,
    pub is_adaptive: bool,
    pub remaining_questions: Vec<RemainingQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResponse {
    pub is_correct: bool,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub blooms_level: Option<BloomsLevel>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub next_question: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedQuestion {
    pub id: String,
    pub difficulty: f64,
    pub blooms_level: BloomsLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedResponse {
    pub question: AnalyzedQuestion,
    pub is_correct: bool,
    pub response_time: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub user_id: String,
    pub responses: Vec<AnalyzedResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(default)]
    pub blooms_analysis: serde_json::Value,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

// ==================== Client ====================

#[derive(Clone)]
pub struct AiProvider {
    config: AiConfig,
    client: reqwest::Client,
}

impl AiProvider {
    pub fn from_env() -> Self {
        let api_key = std::env::var("AI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let endpoint = std::env::var("AI_SERVICE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout = Duration::from_millis(
            std::env::var("AI_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config: AiConfig {
                api_key,
                endpoint,
                timeout,
            },
            client,
        }
    }

    pub async fn generate_quiz(
        &self,
        request: &GenerateQuizRequest,
    ) -> Result<GeneratedQuiz, AiError> {
        self.process("quiz/adaptive/generate", request).await
    }

    pub async fn grade_response(&self, request: &GradeRequest) -> Result<GradedResponse, AiError> {
        self.process("quiz/adaptive/response", request).await
    }

    pub async fn analyze_performance(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisReport, AiError> {
        self.process("quiz/adaptive/analyze", request).await
    }

    async fn process<Req, Resp>(&self, request_type: &str, data: &Req) -> Result<Resp, AiError>
    where
        Req: Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}/process", self.config.endpoint);
        let payload = serde_json::json!({
            "type": request_type,
            "data": data,
        });

        let envelope: Envelope<Resp> = self.post_with_retry(&url, &payload).await?;
        if !envelope.success {
            return Err(AiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "upstream reported failure".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| AiError::Rejected("upstream success without data".to_string()))
    }

    async fn post_with_retry<Resp>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Envelope<Resp>, AiError>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let mut last_error: Option<AiError> = None;

        for retry in 0..=MAX_RETRIES {
            let mut builder = self.client.post(url).json(payload);
            if let Some(key) = self.config.api_key.as_deref() {
                builder = builder.bearer_auth(key);
            }

            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        match serde_json::from_slice(&bytes) {
                            Ok(v) => return Ok(v),
                            Err(e) => {
                                let body = String::from_utf8_lossy(&bytes);
                                tracing::error!(
                                    "failed to parse AI response JSON: {e}. Body: {body}"
                                );
                                return Err(AiError::Json(e));
                            }
                        }
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = AiError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "AI request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = AiError::Request(e);
                    if retry < MAX_RETRIES {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "AI request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AiError::Rejected("retries exhausted".to_string())))
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_without_default_payload_types() {
        // GeneratedQuiz has no Default impl; the envelope must not need one.
        let raw = r#"{
            "success": true,
            "data": {
                "title": "Algebra basics",
                "questions": [{
                    "text": "Solve x + 1 = 2",
                    "difficulty": 0.0,
                    "bloomsLevel": "apply"
                }]
            }
        }"#;
        let envelope: Envelope<GeneratedQuiz> = serde_json::from_str(raw).unwrap();
        assert!(envelope.success);
        let quiz = envelope.data.unwrap();
        assert_eq!(quiz.title, "Algebra basics");
        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].blooms_level, BloomsLevel::Apply);
    }

    #[test]
    fn test_envelope_failure_without_data() {
        let raw = r#"{ "success": false, "message": "model overloaded" }"#;
        let envelope: Envelope<GradedResponse> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("model overloaded"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(reqwest::StatusCode::UNPROCESSABLE_ENTITY));
    }
}
