//! Post-L3 reviewer (C8).
//!
//! For every L3-relevant paper: download the PDF once, then fan out the
//! LLM full-text review (I/O-bound, on the async runtime) and figure
//! extraction (CPU-bound, on a blocking-task executor) concurrently.
//! Figures are upserted unconditionally once extracted and uploaded —
//! idempotent by `(paper_id, figure_index)` — while the review is only
//! persisted when the client actually returned one (§4.8, §5).

use crate::errors::Outcome;
use crate::llm_review::ReviewClient;
use crate::object_store::{content_type_for, ObjectStore};
use crate::pdf::{extract_images, PdfFetcher};
use crate::types::RelevantPaper;
use curator_common::config::{LlmConfig, ObjectStoreConfig};
use curator_common::db::repository::NewFigure;
use curator_common::db::Repository;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct PostL3Reviewer {
    repo: Repository,
    review_client: Arc<dyn ReviewClient>,
    pdf_fetcher: Arc<PdfFetcher>,
    object_store: Arc<ObjectStore>,
    llm_config: LlmConfig,
    store_config: ObjectStoreConfig,
}

impl PostL3Reviewer {
    pub fn new(
        repo: Repository,
        review_client: Arc<dyn ReviewClient>,
        pdf_fetcher: Arc<PdfFetcher>,
        object_store: Arc<ObjectStore>,
        llm_config: LlmConfig,
        store_config: ObjectStoreConfig,
    ) -> Self {
        Self {
            repo,
            review_client,
            pdf_fetcher,
            object_store,
            llm_config,
            store_config,
        }
    }

    #[instrument(skip(self, papers), fields(input = papers.len()))]
    pub async fn run(&self, papers: Vec<RelevantPaper>) -> usize {
        if papers.is_empty() {
            return 0;
        }

        let concurrency = self.llm_config.post_l3_concurrency.max(1);

        let figures_total: Vec<Outcome<usize>> = stream::iter(papers)
            .map(|paper| self.process_one(paper))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut reviewed = 0;
        let mut figure_count = 0;
        for outcome in figures_total {
            match outcome {
                Outcome::Ok(n) => {
                    reviewed += 1;
                    figure_count += n;
                }
                Outcome::Skipped(reason) => info!(reason, "Post-L3 skipped"),
                Outcome::Err(e) => warn!(error = %e, "Post-L3 review failed for paper"),
            }
        }

        curator_common::metrics::record_figures_extracted(figure_count);
        info!(reviewed, figure_count, "Post-L3 review complete");
        figure_count
    }

    async fn process_one(&self, paper: RelevantPaper) -> Outcome<usize> {
        let pdf_bytes = match self.pdf_fetcher.fetch(&paper.pdf_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Outcome::Skipped(format!(
                    "{}: pdf fetch failed: {e}",
                    paper.arxiv_id
                ))
            }
        };

        let (review_result, images) = {
            let review_fut = self
                .review_client
                .review(&paper.title, &paper.arxiv_id, &pdf_bytes);

            let min_w = self.store_config.figure_min_width;
            let min_h = self.store_config.figure_min_height;
            let pdf_for_blocking = pdf_bytes.clone();
            let extract_fut = tokio::task::spawn_blocking(move || {
                extract_images(&pdf_for_blocking, min_w, min_h)
            });

            let (review_result, extract_result) = tokio::join!(review_fut, extract_fut);
            let images = extract_result.unwrap_or_else(|e| {
                warn!(arxiv_id = %paper.arxiv_id, error = %e, "figure extraction task panicked");
                Vec::new()
            });
            (review_result, images)
        };

        let review = match review_result {
            Ok(review) => review,
            Err(e) => {
                warn!(arxiv_id = %paper.arxiv_id, error = %e, "Post-L3 review call errored");
                None
            }
        };

        if let Some(review) = &review {
            let value = match serde_json::to_value(review) {
                Ok(v) => v,
                Err(e) => return Outcome::Err(curator_common::errors::PipelineError::parse(
                    "detail review",
                    e,
                )),
            };
            if let Err(e) = self.repo.update_detail_review(paper.paper_id, &value).await {
                return Outcome::Err(e);
            }
        }

        let mut uploaded_figures = Vec::with_capacity(images.len());
        for image in &images {
            let key = self
                .object_store
                .object_key(&paper.arxiv_id, image.figure_index, image.extension);
            let content_type = content_type_for(image.extension);
            if let Err(e) = self
                .object_store
                .put(&key, image.bytes.clone(), content_type)
                .await
            {
                warn!(arxiv_id = %paper.arxiv_id, figure_index = image.figure_index, error = %e, "figure upload failed, skipping");
                continue;
            }

            let caption = review.as_ref().and_then(|r| {
                r.figure_analysis
                    .iter()
                    .find(|f| f.figure_index == image.figure_index)
                    .map(|f| f.description_ja.clone())
            });

            uploaded_figures.push(NewFigure {
                figure_index: image.figure_index,
                s3_key: key.clone(),
                s3_url: self.object_store.public_url(&key),
                width: image.width as i32,
                height: image.height as i32,
                file_size_bytes: image.bytes.len() as i32,
                caption,
            });
        }

        if !uploaded_figures.is_empty() {
            if let Err(e) = self.repo.upsert_figures(paper.paper_id, &uploaded_figures).await {
                return Outcome::Err(e);
            }
        }

        Outcome::Ok(uploaded_figures.len())
    }
}
