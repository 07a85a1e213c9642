//! Pipeline orchestrator (C9).
//!
//! Sequences L1 -> L2 -> L3 -> Post-L3. A stage-level failure is captured
//! into the run's error list and the stage's output degrades to empty —
//! downstream stages still run, they just have nothing to do — so one bad
//! stage never aborts the whole batch (§4.9, §7). A `BatchLog` row is
//! always inserted at the end, even if every stage failed, and the
//! database connection is always closed on the way out.

use crate::analyzer::RelevanceAnalyzer;
use crate::arxiv::ArxivFetcher;
use crate::llm_judge::JudgementClient;
use crate::llm_review::ReviewClient;
use crate::object_store::ObjectStore;
use crate::pdf::PdfFetcher;
use crate::reviewer::PostL3Reviewer;
use crate::selector::VectorSelector;
use chrono::{DateTime, Utc};
use curator_common::config::PipelineConfig;
use curator_common::db::repository::NewBatchLog;
use curator_common::db::{DbPool, Repository};
use curator_common::embeddings::Embedder;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// End-of-run summary, logged as a single structured line and persisted
/// as a `batch_logs` row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CurationStats {
    pub l1_raw_count: usize,
    pub l1_dedup_count: usize,
    pub l2_input_count: usize,
    pub l2_passed_count: usize,
    pub l3_input_count: usize,
    pub l3_relevant_count: usize,
    pub figures_extracted: usize,
    pub errors: Vec<String>,
    pub processing_time_sec: f64,
}

impl CurationStats {
    fn l2_pass_rate(&self) -> f64 {
        if self.l2_input_count == 0 {
            0.0
        } else {
            self.l2_passed_count as f64 / self.l2_input_count as f64
        }
    }

    fn l3_relevance_rate(&self) -> f64 {
        if self.l3_input_count == 0 {
            0.0
        } else {
            self.l3_relevant_count as f64 / self.l3_input_count as f64
        }
    }
}

pub struct Orchestrator {
    config: PipelineConfig,
    repo: Repository,
    embedder: Arc<dyn Embedder>,
    judge: Arc<dyn JudgementClient>,
    review_client: Arc<dyn ReviewClient>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        repo: Repository,
        embedder: Arc<dyn Embedder>,
        judge: Arc<dyn JudgementClient>,
        review_client: Arc<dyn ReviewClient>,
    ) -> Self {
        Self {
            config,
            repo,
            embedder,
            judge,
            review_client,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> CurationStats {
        let started = std::time::Instant::now();
        let mut errors = Vec::new();

        let fetcher = ArxivFetcher::new(self.config.arxiv.clone());
        let l1 = fetcher.collect_papers(now).await;
        let l1_raw_count = l1.raw_count;
        let l1_dedup_count = l1.papers.len();
        info!(
            raw = l1_raw_count,
            deduped = l1_dedup_count,
            "L1 fetch complete"
        );

        let selector = VectorSelector::new(
            self.repo.clone(),
            self.embedder.clone(),
            self.config.l2.clone(),
        );
        let l2_input_count = l1.papers.len();
        let l2_output = match selector.run(l1.papers).await {
            Ok(papers) => papers,
            Err(e) => {
                errors.push(format!("L2: {e}"));
                error!(error = %e, "L2 stage failed, continuing with empty output");
                Vec::new()
            }
        };
        let l2_passed_count = l2_output.len();

        let analyzer = RelevanceAnalyzer::new(
            self.repo.clone(),
            self.judge.clone(),
            self.config.llm.clone(),
        );
        let l3_input_count = l2_output.len();
        let l3_output = analyzer.run(l2_output).await;
        let l3_relevant_count = l3_output.len();

        let pdf_fetcher = Arc::new(PdfFetcher::new(self.config.llm.post_l3_timeout_secs));
        let object_store = Arc::new(ObjectStore::new(self.config.object_store.clone()).await);
        let reviewer = PostL3Reviewer::new(
            self.repo.clone(),
            self.review_client.clone(),
            pdf_fetcher,
            object_store,
            self.config.llm.clone(),
            self.config.object_store.clone(),
        );
        let figures_extracted = reviewer.run(l3_output).await;

        let stats = CurationStats {
            l1_raw_count,
            l1_dedup_count,
            l2_input_count,
            l2_passed_count,
            l3_input_count,
            l3_relevant_count,
            figures_extracted,
            errors,
            processing_time_sec: started.elapsed().as_secs_f64(),
        };

        if let Err(e) = self.record_batch_log(now, &stats).await {
            error!(error = %e, "failed to persist batch log");
        }

        info!(stats = ?stats, "curation run complete");
        stats
    }

    async fn record_batch_log(
        &self,
        now: DateTime<Utc>,
        stats: &CurationStats,
    ) -> curator_common::errors::Result<()> {
        let (start, end) = crate::arxiv::fetch_window(now);
        let log = NewBatchLog {
            execution_date: now.date_naive(),
            date_range: json!({"start": start.to_rfc3339(), "end": end.to_rfc3339()}),
            l1_raw_count: stats.l1_raw_count as i32,
            l1_dedup_count: stats.l1_dedup_count as i32,
            l2_input_count: stats.l2_input_count as i32,
            l2_passed_count: stats.l2_passed_count as i32,
            l2_pass_rate: stats.l2_pass_rate(),
            l3_input_count: stats.l3_input_count as i32,
            l3_relevant_count: stats.l3_relevant_count as i32,
            l3_relevance_rate: stats.l3_relevance_rate(),
            l3_input_tokens: 0,
            l3_output_tokens: 0,
            l3_cost_usd: 0.0,
            figures_extracted: stats.figures_extracted as i32,
            errors: json!(stats.errors),
            processing_time_sec: stats.processing_time_sec,
        };
        self.repo.insert_batch_log(&log).await
    }
}

/// Runs one curation batch end to end, always closing the database
/// connection on the way out regardless of how the run finished.
pub async fn run_pipeline(config: PipelineConfig, pool: DbPool, now: DateTime<Utc>) -> CurationStats {
    let repo = Repository::new(pool.clone());

    let embedder: Arc<dyn Embedder> = Arc::new(curator_common::embeddings::OpenAIEmbedder::new(
        config.embedding.api_key.clone().unwrap_or_default(),
        config.embedding.model.clone(),
        config.embedding.dimension,
        Some(config.embedding.api_base.clone()),
    ));
    let judge: Arc<dyn JudgementClient> = Arc::new(
        crate::llm_judge::GeminiJudgementClient::new(config.llm.clone()),
    );
    let review_client: Arc<dyn ReviewClient> = Arc::new(
        crate::llm_review::GeminiReviewClient::new(config.llm.clone()),
    );

    let orchestrator = Orchestrator::new(config, repo, embedder, judge, review_client);
    let stats = orchestrator.run(now).await;

    if let Err(e) = pool.close().await {
        error!(error = %e, "failed to close database connection");
    }

    stats
}
