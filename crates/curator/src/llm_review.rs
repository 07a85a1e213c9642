//! LLM review client (C4) — PDF bytes + structured JSON full-text review.
//!
//! Higher temperature/token ceiling/timeout than C3; same retry/backoff
//! schedule, with `post_l3_max_retries` attempts (§4.4).

use crate::types::DetailReview;
use async_trait::async_trait;
use base64::Engine;
use curator_common::config::LlmConfig;
use curator_common::errors::{PipelineError, Result};
use curator_common::retry::backoff_delay;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Carried verbatim (in spirit) from the original's
/// `POST_L3_SYSTEM_PROMPT` constant.
pub const POST_L3_SYSTEM_PROMPT: &str = "\
You are writing a full-text review of an AI/ML research paper for a \
Japanese-speaking technical audience. Read the attached PDF and produce a \
structured review: a sectioned walkthrough of the paper's contribution, \
method, and results; three short takes from the perspective of an AI \
engineer, a mathematician, and a business stakeholder; a three-level \
explanation (beginner/intermediate/expert); a short note on each notable \
figure; and a one-line takeaway. Write every prose field in Japanese. \
Always respond with a single JSON object matching the requested schema.";

/// Carried verbatim (in spirit) from the original's
/// `POST_L3_USER_PROMPT_TEMPLATE` constant.
pub fn post_l3_user_prompt(title: &str, arxiv_id: &str) -> String {
    format!(
        "Paper title: {title}\n\
         arXiv id: {arxiv_id}\n\n\
         Respond with JSON: {{\"sections\": [{{\"heading\": string, \
         \"body_ja\": string}}], \"perspectives\": {{\"ai_engineer\": \
         string, \"mathematician\": string, \"business\": string}}, \
         \"levels\": {{\"beginner\": string, \"intermediate\": string, \
         \"expert\": string}}, \"figure_analysis\": [{{\"figure_index\": \
         int, \"description_ja\": string}}], \"one_line_takeaway\": \
         string}}"
    )
}

#[async_trait]
pub trait ReviewClient: Send + Sync {
    async fn review(&self, title: &str, arxiv_id: &str, pdf_bytes: &[u8]) -> Result<Option<DetailReview>>;
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}
#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}
#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}
#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

pub struct GeminiReviewClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl GeminiReviewClient {
    pub fn new(config: LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.post_l3_timeout_secs))
            .build()
            .expect("failed to build Post-L3 review HTTP client");
        Self { client, config }
    }

    async fn call_once(&self, title: &str, arxiv_id: &str, pdf_bytes: &[u8]) -> Result<DetailReview> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.gemini_api_base,
            self.config.model,
            self.config.gemini_api_key.as_deref().unwrap_or_default(),
        );

        let pdf_b64 = base64::engine::general_purpose::STANDARD.encode(pdf_bytes);

        let body = serde_json::json!({
            "system_instruction": {"parts": [{"text": POST_L3_SYSTEM_PROMPT}]},
            "contents": [{"parts": [
                {"text": post_l3_user_prompt(title, arxiv_id)},
                {"inline_data": {"mime_type": "application/pdf", "data": pdf_b64}},
            ]}],
            "generationConfig": {
                "temperature": self.config.post_l3_temperature,
                "maxOutputTokens": self.config.post_l3_max_output_tokens,
                "responseMimeType": "application/json",
            }
        });

        let call_start = std::time::Instant::now();
        let response = self.client.post(&url).json(&body).send().await;
        let ok = response.is_ok();
        curator_common::metrics::record_external_call(
            "post_l3_review",
            call_start.elapsed().as_secs_f64(),
            ok,
        );
        let response = response.map_err(|e| PipelineError::TransientNetwork {
            target: "gemini Post-L3".into(),
            message: e.to_string(),
        })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
            || response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
        {
            return Err(PipelineError::RateLimited {
                target: "gemini Post-L3".into(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::TransientNetwork {
                target: "gemini Post-L3".into(),
                message: format!("status {status}"),
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::parse("gemini Post-L3 response envelope", e))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| PipelineError::validation("Post-L3 review", "empty response"))?;

        serde_json::from_str(text.trim())
            .map_err(|e| PipelineError::validation("Post-L3 review JSON", e))
    }
}

#[async_trait]
impl ReviewClient for GeminiReviewClient {
    async fn review(
        &self,
        title: &str,
        arxiv_id: &str,
        pdf_bytes: &[u8],
    ) -> Result<Option<DetailReview>> {
        for attempt in 0..self.config.post_l3_max_retries {
            if attempt > 0 {
                curator_common::metrics::record_retry("post_l3_review");
                let delay = backoff_delay(
                    Duration::from_secs(self.config.backoff_base_secs),
                    attempt - 1,
                    Duration::from_secs(self.config.backoff_max_secs),
                );
                tokio::time::sleep(delay).await;
            }
            match self.call_once(title, arxiv_id, pdf_bytes).await {
                Ok(review) => return Ok(Some(review)),
                Err(e) => {
                    warn!(
                        arxiv_id,
                        attempt = attempt + 1,
                        max_retries = self.config.post_l3_max_retries,
                        error = %e,
                        "Post-L3 review call failed"
                    );
                }
            }
        }
        Ok(None)
    }
}

/// Deterministic fake for tests.
pub struct MockReviewClient {
    pub review: Option<DetailReview>,
}

#[async_trait]
impl ReviewClient for MockReviewClient {
    async fn review(&self, _title: &str, _arxiv_id: &str, _pdf_bytes: &[u8]) -> Result<Option<DetailReview>> {
        Ok(self.review.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_includes_title_and_id() {
        let prompt = post_l3_user_prompt("A Great Paper", "2402.11111");
        assert!(prompt.contains("A Great Paper"));
        assert!(prompt.contains("2402.11111"));
    }

    #[tokio::test]
    async fn mock_client_returns_configured_review() {
        let client = MockReviewClient { review: None };
        let result = client.review("t", "id", b"%PDF").await.unwrap();
        assert!(result.is_none());
    }
}
