//! Vector selector (C6) — L2.
//!
//! Embeds every paper's `title + " " + abstract`, upserts paper + vector,
//! scores against every active anchor, computes the importance composite,
//! and keeps only papers whose max similarity clears the pass threshold.

use crate::errors::Outcome;
use crate::types::{FetchedPaper, ScoredPaper};
use curator_common::config::L2Config;
use curator_common::db::repository::{L2Fields, NewPaper, Repository};
use curator_common::embeddings::Embedder;
use curator_common::errors::PipelineError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct VectorSelector {
    repo: Repository,
    embedder: Arc<dyn Embedder>,
    config: L2Config,
}

impl VectorSelector {
    pub fn new(repo: Repository, embedder: Arc<dyn Embedder>, config: L2Config) -> Self {
        Self {
            repo,
            embedder,
            config,
        }
    }

    #[instrument(skip(self, papers), fields(input = papers.len()))]
    pub async fn run(&self, papers: Vec<FetchedPaper>) -> Result<Vec<ScoredPaper>, PipelineError> {
        if papers.is_empty() {
            return Ok(Vec::new());
        }

        let anchors = self.repo.list_active_anchors().await?;
        let anchor_count = anchors.len().max(1) as f64;
        let anchor_names: HashMap<i16, String> = anchors.into_iter().collect();

        // Embed: chunk failure is fatal to the whole stage, per §4.2/§4.6.
        let texts: Vec<String> = papers.iter().map(|p| p.embedding_input()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != papers.len() {
            return Err(PipelineError::fatal(
                "L2 embed",
                format!(
                    "embedder returned {} vectors for {} inputs",
                    embeddings.len(),
                    papers.len()
                ),
            ));
        }

        let mut output = Vec::with_capacity(papers.len());

        for (paper, embedding) in papers.into_iter().zip(embeddings.into_iter()) {
            match self
                .process_one(&paper, &embedding, &anchor_names, anchor_count)
                .await
            {
                Outcome::Ok(scored) => output.push(scored),
                Outcome::Skipped(reason) => {
                    warn!(arxiv_id = %paper.arxiv_id, reason, "L2: paper skipped")
                }
                Outcome::Err(e) => {
                    warn!(arxiv_id = %paper.arxiv_id, error = %e, "L2: per-paper failure")
                }
            }
        }

        info!(
            input = output.capacity(),
            passed = output.len(),
            threshold = self.config.threshold,
            "L2 complete"
        );
        Ok(output)
    }

    async fn process_one(
        &self,
        paper: &FetchedPaper,
        embedding: &[f32],
        anchor_names: &HashMap<i16, String>,
        anchor_count: f64,
    ) -> Outcome<ScoredPaper> {
        let new_paper = NewPaper {
            arxiv_id: paper.arxiv_id.clone(),
            title: paper.title.clone(),
            abstract_text: paper.abstract_text.clone(),
            authors: paper.authors.clone(),
            pdf_url: paper.pdf_url.clone(),
            primary_category: paper.primary_category.clone(),
            all_categories: paper.all_categories.clone(),
            published_at: paper.published_at,
            matched_queries: paper.matched_queries.iter().copied().collect(),
        };

        let paper_id = match self
            .repo
            .upsert_paper_with_embedding(&new_paper, embedding)
            .await
        {
            Ok(id) => id,
            Err(e) => return Outcome::Err(e),
        };

        let scores = match self.repo.score_paper_against_anchors(paper_id).await {
            Ok(s) => s,
            Err(e) => return Outcome::Err(e),
        };

        if scores.is_empty() {
            return Outcome::Skipped("zero active anchors returned".to_string());
        }

        // Ordered by category id ascending (the repository guarantees
        // this), so the first max found wins ties — smallest id wins.
        let mut best_category_id = scores[0].0;
        let mut max_score = scores[0].1;
        for &(category_id, score) in &scores[1..] {
            if score > max_score {
                max_score = score;
                best_category_id = category_id;
            }
        }

        let hit_count = scores.iter().filter(|&&(_, s)| s >= self.config.threshold).count() as i32;
        let matched_query_count = paper.matched_queries.len() as f64;

        let importance = self.config.weight_max_score * max_score
            + self.config.weight_hit_count * (hit_count as f64 / anchor_count)
            + self.config.weight_matched_queries * (matched_query_count / anchor_count);

        let all_scores: serde_json::Map<String, serde_json::Value> = scores
            .iter()
            .map(|&(cat, s)| (cat.to_string(), round4(s).into()))
            .collect();

        let fields = L2Fields {
            best_category_id,
            max_score: round4(max_score),
            hit_count,
            importance_score: round4(importance),
            all_scores: serde_json::Value::Object(all_scores),
        };

        if let Err(e) = self.repo.update_l2(paper_id, &fields).await {
            return Outcome::Err(e);
        }

        if max_score < self.config.threshold {
            return Outcome::Skipped(format!("max_score {max_score:.4} below threshold"));
        }

        let best_category_name = anchor_names
            .get(&best_category_id)
            .cloned()
            .unwrap_or_default();

        Outcome::Ok(ScoredPaper {
            paper_id,
            fetched: paper.clone(),
            best_category_id,
            best_category_name,
            max_score: fields.max_score,
            hit_count,
        })
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_four_decimals() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.4), 0.4);
    }

    #[test]
    fn importance_composite_matches_worked_example() {
        // Scenario 1 from §8: max_score=0.55, hit_count=1, matched_queries=1, A=6.
        let config = L2Config {
            threshold: 0.40,
            anchor_count: 6,
            weight_max_score: 0.6,
            weight_hit_count: 0.3,
            weight_matched_queries: 0.1,
        };
        let importance =
            config.weight_max_score * 0.55 + config.weight_hit_count * (1.0 / 6.0)
                + config.weight_matched_queries * (1.0 / 6.0);
        assert!((round4(importance) - 0.3967).abs() < 0.0001);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // max_score == threshold exactly must pass, per §8 boundary behaviors.
        let threshold = 0.40;
        let max_score = 0.40;
        assert!(max_score >= threshold);
    }
}
