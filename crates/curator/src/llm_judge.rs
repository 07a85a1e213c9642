//! LLM judgement client (C3) — structured JSON relevance verdict.
//!
//! Fixed system prompt, templated user prompt; retried up to `max_retries`
//! with the shared exponential backoff on parse failure or an empty
//! response. All retries exhausted returns `Ok(None)`, not an error — the
//! calling paper's verdict is simply absent (§4.3).

use crate::types::{JudgementVerdict, ScoredPaper};
use async_trait::async_trait;
use curator_common::config::LlmConfig;
use curator_common::errors::{PipelineError, Result};
use curator_common::retry::backoff_delay;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Carried verbatim (in spirit) from the original's `L3_SYSTEM_PROMPT`
/// constant: curator role, category taxonomy, evaluation criteria, output
/// rules.
pub const L3_SYSTEM_PROMPT: &str = "\
You are a research curator for a daily AI/ML paper digest. Your job is to \
judge whether a candidate paper is worth surfacing to a technical reader, \
given the category it was pre-filtered into by vector similarity. Use the \
six-category taxonomy: (1) large language models, (2) reinforcement \
learning, (3) computer vision, (4) autonomous/LLM agents, (5) multimodal \
learning, (6) robotics. Judge relevance on novelty, technical depth, and \
likely reader interest, not on topic popularity alone. Always respond with \
a single JSON object matching the requested schema, and nothing else.";

/// Carried verbatim (in spirit) from the original's
/// `L3_USER_PROMPT_TEMPLATE` constant.
pub fn l3_user_prompt(paper: &ScoredPaper) -> String {
    format!(
        "Title: {}\n\
         Abstract: {}\n\
         Pre-filter best category: {} ({})\n\
         Pre-filter max similarity: {:.4}\n\
         Pre-filter anchor hit count: {}\n\n\
         Respond with JSON: {{\"is_relevant\": bool, \"category_id\": 1-6, \
         \"secondary_category_ids\": int[], \"confidence\": 0-1, \
         \"importance\": 1-5, \"summary_ja\": string, \"reasoning\": string}}",
        paper.fetched.title,
        paper.fetched.abstract_text,
        paper.best_category_id,
        paper.best_category_name,
        paper.max_score,
        paper.hit_count,
    )
}

#[async_trait]
pub trait JudgementClient: Send + Sync {
    async fn judge(&self, paper: &ScoredPaper) -> Result<Option<JudgementVerdict>>;
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

pub struct GeminiJudgementClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl GeminiJudgementClient {
    pub fn new(config: LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.l3_timeout_secs))
            .build()
            .expect("failed to build L3 judgement HTTP client");
        Self { client, config }
    }

    async fn call_once(&self, paper: &ScoredPaper) -> Result<JudgementVerdict> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.gemini_api_base,
            self.config.model,
            self.config
                .gemini_api_key
                .as_deref()
                .unwrap_or_default(),
        );

        let body = serde_json::json!({
            "system_instruction": {"parts": [{"text": L3_SYSTEM_PROMPT}]},
            "contents": [{"parts": [{"text": l3_user_prompt(paper)}]}],
            "generationConfig": {
                "temperature": self.config.l3_temperature,
                "maxOutputTokens": self.config.l3_max_output_tokens,
                "responseMimeType": "application/json",
            }
        });

        let call_start = std::time::Instant::now();
        let response = self.client.post(&url).json(&body).send().await;
        let ok = response.is_ok();
        curator_common::metrics::record_external_call(
            "l3_judge",
            call_start.elapsed().as_secs_f64(),
            ok,
        );
        let response = response.map_err(|e| PipelineError::TransientNetwork {
            target: "gemini L3".into(),
            message: e.to_string(),
        })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
            || response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
        {
            return Err(PipelineError::RateLimited {
                target: "gemini L3".into(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::TransientNetwork {
                target: "gemini L3".into(),
                message: format!("status {status}"),
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::parse("gemini L3 response envelope", e))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| PipelineError::validation("L3 verdict", "empty response"))?;

        let verdict: JudgementVerdict = serde_json::from_str(text.trim())
            .map_err(|e| PipelineError::validation("L3 verdict JSON", e))?;

        if !(1..=6).contains(&verdict.category_id) {
            return Err(PipelineError::validation(
                "L3 verdict",
                format!("category_id {} out of range", verdict.category_id),
            ));
        }
        if !(1..=5).contains(&verdict.importance) {
            return Err(PipelineError::validation(
                "L3 verdict",
                format!("importance {} out of range", verdict.importance),
            ));
        }
        if !(0.0..=1.0).contains(&verdict.confidence) {
            return Err(PipelineError::validation(
                "L3 verdict",
                format!("confidence {} out of range", verdict.confidence),
            ));
        }

        Ok(verdict)
    }
}

#[async_trait]
impl JudgementClient for GeminiJudgementClient {
    async fn judge(&self, paper: &ScoredPaper) -> Result<Option<JudgementVerdict>> {
        for attempt in 0..self.config.l3_max_retries {
            if attempt > 0 {
                curator_common::metrics::record_retry("l3_judge");
                let delay = backoff_delay(
                    Duration::from_secs(self.config.backoff_base_secs),
                    attempt - 1,
                    Duration::from_secs(self.config.backoff_max_secs),
                );
                tokio::time::sleep(delay).await;
            }
            match self.call_once(paper).await {
                Ok(verdict) => return Ok(Some(verdict)),
                Err(e) => {
                    warn!(
                        arxiv_id = %paper.fetched.arxiv_id,
                        attempt = attempt + 1,
                        max_retries = self.config.l3_max_retries,
                        error = %e,
                        "L3 judgement call failed"
                    );
                }
            }
        }
        Ok(None)
    }
}

/// Deterministic fake used by unit/integration tests, in the style of the
/// shared `MockEmbedder`.
pub struct MockJudgementClient {
    pub verdict: Option<JudgementVerdict>,
}

#[async_trait]
impl JudgementClient for MockJudgementClient {
    async fn judge(&self, _paper: &ScoredPaper) -> Result<Option<JudgementVerdict>> {
        Ok(self.verdict.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchedPaper;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn sample_paper() -> ScoredPaper {
        ScoredPaper {
            paper_id: 1,
            fetched: FetchedPaper {
                arxiv_id: "2402.11111".into(),
                title: "A Great Paper".into(),
                abstract_text: "An abstract.".into(),
                authors: vec!["Alice".into()],
                pdf_url: "http://arxiv.org/pdf/2402.11111".into(),
                primary_category: "cs.CL".into(),
                all_categories: vec!["cs.CL".into()],
                published_at: Utc::now(),
                matched_queries: BTreeSet::from([1]),
            },
            best_category_id: 4,
            best_category_name: "AIエージェント".into(),
            max_score: 0.55,
            hit_count: 1,
        }
    }

    #[test]
    fn user_prompt_contains_title_and_abstract() {
        let prompt = l3_user_prompt(&sample_paper());
        assert!(prompt.contains("A Great Paper"));
        assert!(prompt.contains("An abstract."));
        assert!(prompt.contains("0.5500"));
    }

    #[tokio::test]
    async fn mock_client_returns_configured_verdict() {
        let verdict = JudgementVerdict {
            is_relevant: true,
            category_id: 4,
            secondary_category_ids: vec![],
            confidence: 0.9,
            importance: 3,
            summary_ja: "要約".into(),
            reasoning: "理由".into(),
        };
        let client = MockJudgementClient {
            verdict: Some(verdict.clone()),
        };
        let result = client.judge(&sample_paper()).await.unwrap();
        assert!(result.unwrap().is_relevant);
    }
}
