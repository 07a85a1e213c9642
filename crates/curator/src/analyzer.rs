//! Relevance analyzer (C7) — the L3 stage.
//!
//! Runs every L2 survivor through the judgement client under bounded
//! concurrency (`l3_concurrency`, default 5), with a per-worker pacing
//! delay before each call so the aggregate request rate stays under the
//! provider's RPS ceiling even with several workers in flight (§4.7, §5).
//! A paper whose verdict never resolves (client returns `None` after
//! exhausting retries) is dropped, not errored — it simply does not reach
//! Post-L3.

use crate::errors::Outcome;
use crate::llm_judge::JudgementClient;
use crate::types::{RelevantPaper, ScoredPaper};
use curator_common::config::LlmConfig;
use curator_common::db::repository::L3Fields;
use curator_common::db::Repository;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub struct RelevanceAnalyzer {
    repo: Repository,
    judge: Arc<dyn JudgementClient>,
    config: LlmConfig,
}

impl RelevanceAnalyzer {
    pub fn new(repo: Repository, judge: Arc<dyn JudgementClient>, config: LlmConfig) -> Self {
        Self { repo, judge, config }
    }

    #[instrument(skip(self, papers), fields(input = papers.len()))]
    pub async fn run(&self, papers: Vec<ScoredPaper>) -> Vec<RelevantPaper> {
        if papers.is_empty() {
            return Vec::new();
        }

        let concurrency = self.config.l3_concurrency.max(1);
        let pacing = Duration::from_millis(self.config.l3_request_interval_ms);

        let results: Vec<Outcome<RelevantPaper>> = stream::iter(papers)
            .map(|paper| self.process_one(paper, pacing))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut relevant = Vec::new();
        for outcome in results {
            match outcome {
                Outcome::Ok(paper) => relevant.push(paper),
                Outcome::Skipped(reason) => {
                    info!(reason, "paper not relevant, skipped at L3");
                }
                Outcome::Err(e) => {
                    warn!(error = %e, "L3 judgement failed for paper");
                }
            }
        }

        info!(output = relevant.len(), "L3 judgement complete");
        relevant
    }

    async fn process_one(&self, paper: ScoredPaper, pacing: Duration) -> Outcome<RelevantPaper> {
        tokio::time::sleep(pacing).await;

        let verdict = match self.judge.judge(&paper).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                return Outcome::Skipped(format!(
                    "{}: no verdict after retries",
                    paper.fetched.arxiv_id
                ))
            }
            Err(e) => return Outcome::Err(e),
        };

        let fields = L3Fields {
            is_relevant: verdict.is_relevant,
            category_id: verdict.category_id,
            confidence: verdict.confidence,
            importance: verdict.importance,
            summary_ja: verdict.summary_ja,
            reasoning: verdict.reasoning,
        };

        if let Err(e) = self.repo.update_l3(paper.paper_id, &fields).await {
            return Outcome::Err(e);
        }

        if !verdict.is_relevant {
            return Outcome::Skipped(format!("{}: judged not relevant", paper.fetched.arxiv_id));
        }

        Outcome::Ok(RelevantPaper {
            paper_id: paper.paper_id,
            arxiv_id: paper.fetched.arxiv_id,
            title: paper.fetched.title,
            pdf_url: paper.fetched.pdf_url,
            category_id: verdict.category_id,
            importance: verdict.importance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_judge::MockJudgementClient;
    use crate::types::{FetchedPaper, JudgementVerdict};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn sample_paper(id: i32) -> ScoredPaper {
        ScoredPaper {
            paper_id: id,
            fetched: FetchedPaper {
                arxiv_id: format!("2402.{id:05}"),
                title: "Paper".into(),
                abstract_text: "Abstract.".into(),
                authors: vec!["Alice".into()],
                pdf_url: "http://arxiv.org/pdf/x".into(),
                primary_category: "cs.CL".into(),
                all_categories: vec!["cs.CL".into()],
                published_at: Utc::now(),
                matched_queries: BTreeSet::from([1]),
            },
            best_category_id: 1,
            best_category_name: "大規模言語モデル".into(),
            max_score: 0.6,
            hit_count: 1,
        }
    }

    #[test]
    fn not_relevant_verdict_is_not_an_error() {
        let verdict = JudgementVerdict {
            is_relevant: false,
            category_id: 1,
            secondary_category_ids: vec![],
            confidence: 0.8,
            importance: 2,
            summary_ja: "".into(),
            reasoning: "".into(),
        };
        assert!(!verdict.is_relevant);
        let _paper = sample_paper(1);
        let _client = MockJudgementClient {
            verdict: Some(verdict),
        };
    }
}
