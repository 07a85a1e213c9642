//! Repository pattern for the curation pipeline's persistence gateway (C1).
//!
//! sea-orm has no first-class `vector` column type, so every operation that
//! reads or writes `papers.embedding` / `anchors.embedding` goes through raw
//! SQL with the value cast to `::vector` — the same pattern the teacher
//! uses for its chunk embeddings, just with `papers`/`anchors` in place of
//! `chunks`. Everything else goes through the generated entities.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement,
};
use std::collections::HashMap;

/// Filters accepted by the read API's paper listing (§2.2, §6).
#[derive(Debug, Clone, Default)]
pub struct PaperListFilter {
    pub category_id: Option<i16>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub limit: u64,
    pub offset: u64,
}

fn vector_literal(v: &[f32]) -> String {
    let mut s = String::with_capacity(v.len() * 8 + 2);
    s.push('[');
    for (i, f) in v.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&f.to_string());
    }
    s.push(']');
    s
}

/// Fields needed to upsert a paper discovered by L1, before L2 has run.
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub pdf_url: String,
    pub primary_category: String,
    pub all_categories: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub matched_queries: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct L2Fields {
    pub best_category_id: i16,
    pub max_score: f64,
    pub hit_count: i32,
    pub importance_score: f64,
    pub all_scores: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct L3Fields {
    pub is_relevant: bool,
    pub category_id: i16,
    pub confidence: f64,
    pub importance: i16,
    pub summary_ja: String,
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub struct NewFigure {
    pub figure_index: i16,
    pub s3_key: String,
    pub s3_url: String,
    pub width: i32,
    pub height: i32,
    pub file_size_bytes: i32,
    pub caption: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaperSummary {
    pub id: i32,
    pub arxiv_id: String,
    pub title: String,
    pub is_relevant: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewBatchLog {
    pub execution_date: NaiveDate,
    pub date_range: serde_json::Value,
    pub l1_raw_count: i32,
    pub l1_dedup_count: i32,
    pub l2_input_count: i32,
    pub l2_passed_count: i32,
    pub l2_pass_rate: f64,
    pub l3_input_count: i32,
    pub l3_relevant_count: i32,
    pub l3_relevance_rate: f64,
    pub l3_input_tokens: i32,
    pub l3_output_tokens: i32,
    pub l3_cost_usd: f64,
    pub figures_extracted: i32,
    pub errors: serde_json::Value,
    pub processing_time_sec: f64,
}

#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        &self.pool.conn
    }

    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    pub async fn close(self) -> Result<()> {
        self.pool.close().await
    }

    // ------------------------------------------------------------------
    // Papers (C1: UpsertPaperWithEmbedding, ScorePaperAgainstAnchors)
    // ------------------------------------------------------------------

    /// Insert a paper with its L1 metadata and L2 embedding. On conflict by
    /// `arxiv_id`, `matched_queries` is merged as a set union and
    /// `updated_at` is bumped; the vector itself is never overwritten on
    /// conflict, so a re-run reuses the original embedding.
    pub async fn upsert_paper_with_embedding(
        &self,
        paper: &NewPaper,
        embedding: &[f32],
    ) -> Result<i32> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO papers (
                arxiv_id, title, "abstract", authors, pdf_url, primary_category,
                all_categories, published_at, matched_queries, embedding,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::vector, NOW(), NOW())
            ON CONFLICT (arxiv_id) DO UPDATE SET
                matched_queries = (
                    SELECT array_agg(DISTINCT q) FROM unnest(
                        papers.matched_queries || EXCLUDED.matched_queries
                    ) AS q
                ),
                updated_at = NOW()
            RETURNING id
            "#,
            vec![
                paper.arxiv_id.clone().into(),
                paper.title.clone().into(),
                paper.abstract_text.clone().into(),
                paper.authors.clone().into(),
                paper.pdf_url.clone().into(),
                paper.primary_category.clone().into(),
                paper.all_categories.clone().into(),
                paper.published_at.into(),
                paper.matched_queries.clone().into(),
                vector_literal(embedding).into(),
            ],
        );

        let row = self
            .conn()
            .query_one(stmt)
            .await
            .map_err(PipelineError::Database)?
            .ok_or_else(|| PipelineError::fatal("upsert_paper_with_embedding", "no row returned"))?;

        row.try_get_by_index::<i32>(0)
            .map_err(|e| PipelineError::fatal("upsert_paper_with_embedding", e))
    }

    /// Cosine similarity of `paper_id`'s embedding against every active
    /// anchor, ordered by category id ascending (so the smallest id wins an
    /// argmax tie upstream in the L2 stage).
    pub async fn score_paper_against_anchors(&self, paper_id: i32) -> Result<Vec<(i16, f64)>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT a.category_id, 1 - (p.embedding <=> a.embedding) AS similarity
            FROM papers p, anchors a
            WHERE p.id = $1 AND a.is_active = true
            ORDER BY a.category_id ASC
            "#,
            vec![paper_id.into()],
        );

        let rows = self
            .conn()
            .query_all(stmt)
            .await
            .map_err(PipelineError::Database)?;

        rows.into_iter()
            .map(|row| {
                let category_id = row
                    .try_get_by_index::<i16>(0)
                    .map_err(|e| PipelineError::fatal("score_paper_against_anchors", e))?;
                let similarity = row
                    .try_get_by_index::<f64>(1)
                    .map_err(|e| PipelineError::fatal("score_paper_against_anchors", e))?;
                Ok((category_id, similarity))
            })
            .collect()
    }

    pub async fn update_l2(&self, paper_id: i32, fields: &L2Fields) -> Result<()> {
        let mut model: PaperActiveModel = PaperEntity::find_by_id(paper_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| PipelineError::ResourceMissing {
                resource: "paper".into(),
                id: paper_id.to_string(),
            })?
            .into();

        model.best_category_id = Set(Some(fields.best_category_id));
        model.max_score = Set(Some(fields.max_score));
        model.hit_count = Set(Some(fields.hit_count));
        model.importance_score = Set(Some(fields.importance_score));
        model.all_scores = Set(Some(fields.all_scores.clone()));
        model.updated_at = Set(Utc::now().into());

        model.update(self.conn()).await?;
        Ok(())
    }

    pub async fn update_l3(&self, paper_id: i32, fields: &L3Fields) -> Result<()> {
        let mut model: PaperActiveModel = PaperEntity::find_by_id(paper_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| PipelineError::ResourceMissing {
                resource: "paper".into(),
                id: paper_id.to_string(),
            })?
            .into();

        model.is_relevant = Set(Some(fields.is_relevant));
        model.category_id = Set(Some(fields.category_id));
        model.confidence = Set(Some(fields.confidence));
        model.importance = Set(Some(fields.importance));
        model.summary_ja = Set(Some(fields.summary_ja.clone()));
        model.reasoning = Set(Some(fields.reasoning.clone()));
        model.updated_at = Set(Utc::now().into());

        model.update(self.conn()).await?;
        Ok(())
    }

    pub async fn update_detail_review(
        &self,
        paper_id: i32,
        review: &serde_json::Value,
    ) -> Result<()> {
        let mut model: PaperActiveModel = PaperEntity::find_by_id(paper_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| PipelineError::ResourceMissing {
                resource: "paper".into(),
                id: paper_id.to_string(),
            })?
            .into();

        model.detail_review = Set(Some(review.clone()));
        model.updated_at = Set(Utc::now().into());

        model.update(self.conn()).await?;
        Ok(())
    }

    /// Idempotent on `(paper_id, figure_index)`. Refreshes every other
    /// column on conflict, including `caption` — the original excludes
    /// caption from the refresh, but a re-extracted figure's caption is
    /// exactly as fresh as its dimensions, so there is no reason to pin it.
    pub async fn upsert_figures(&self, paper_id: i32, figures: &[NewFigure]) -> Result<()> {
        for fig in figures {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO paper_figures (
                    paper_id, figure_index, s3_key, s3_url, width, height,
                    file_size_bytes, caption, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
                ON CONFLICT (paper_id, figure_index) DO UPDATE SET
                    s3_key = EXCLUDED.s3_key,
                    s3_url = EXCLUDED.s3_url,
                    width = EXCLUDED.width,
                    height = EXCLUDED.height,
                    file_size_bytes = EXCLUDED.file_size_bytes,
                    caption = EXCLUDED.caption
                "#,
                vec![
                    paper_id.into(),
                    fig.figure_index.into(),
                    fig.s3_key.clone().into(),
                    fig.s3_url.clone().into(),
                    fig.width.into(),
                    fig.height.into(),
                    fig.file_size_bytes.into(),
                    fig.caption.clone().into(),
                ],
            );
            self.conn()
                .execute(stmt)
                .await
                .map_err(PipelineError::Database)?;
        }
        Ok(())
    }

    /// Used by the orchestrator between L3 and Post-L3 to pass identifiers
    /// (not full rows) down to the reviewer stage.
    pub async fn fetch_summaries(
        &self,
        arxiv_ids: &[String],
    ) -> Result<HashMap<String, PaperSummary>> {
        let papers = PaperEntity::find()
            .filter(PaperColumn::ArxivId.is_in(arxiv_ids.to_vec()))
            .all(self.conn())
            .await?;

        Ok(papers
            .into_iter()
            .map(|p| {
                (
                    p.arxiv_id.clone(),
                    PaperSummary {
                        id: p.id,
                        arxiv_id: p.arxiv_id,
                        title: p.title,
                        is_relevant: p.is_relevant,
                    },
                )
            })
            .collect())
    }

    pub async fn insert_batch_log(&self, log: &NewBatchLog) -> Result<()> {
        let model = BatchLogActiveModel {
            id: sea_orm::NotSet,
            execution_date: Set(log.execution_date),
            date_range: Set(log.date_range.clone()),
            l1_raw_count: Set(log.l1_raw_count),
            l1_dedup_count: Set(log.l1_dedup_count),
            l2_input_count: Set(log.l2_input_count),
            l2_passed_count: Set(log.l2_passed_count),
            l2_pass_rate: Set(log.l2_pass_rate),
            l3_input_count: Set(log.l3_input_count),
            l3_relevant_count: Set(log.l3_relevant_count),
            l3_relevance_rate: Set(log.l3_relevance_rate),
            l3_input_tokens: Set(log.l3_input_tokens),
            l3_output_tokens: Set(log.l3_output_tokens),
            l3_cost_usd: Set(log.l3_cost_usd),
            figures_extracted: Set(log.figures_extracted),
            errors: Set(log.errors.clone()),
            processing_time_sec: Set(log.processing_time_sec),
            created_at: Set(Utc::now().into()),
        };

        model.insert(self.conn()).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    pub async fn active_anchor_count(&self) -> Result<u64> {
        use sea_orm::PaginatorTrait;
        AnchorEntity::find()
            .filter(AnchorColumn::IsActive.eq(true))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Active anchors' `(category_id, category_name)`, ordered by category
    /// id ascending — the same order `score_paper_against_anchors` returns,
    /// so callers can zip the two without re-sorting.
    pub async fn list_active_anchors(&self) -> Result<Vec<(i16, String)>> {
        use sea_orm::{QueryOrder, QuerySelect};
        let anchors = AnchorEntity::find()
            .filter(AnchorColumn::IsActive.eq(true))
            .order_by_asc(AnchorColumn::CategoryId)
            .select_only()
            .column(AnchorColumn::CategoryId)
            .column(AnchorColumn::CategoryName)
            .into_tuple::<(i16, String)>()
            .all(self.conn())
            .await?;
        Ok(anchors)
    }

    // ------------------------------------------------------------------
    // Read API (thin `GET /papers`, `GET /papers/{arxiv_id}`, §2.2/§6)
    // ------------------------------------------------------------------

    /// Relevant papers only, newest first, paginated and optionally
    /// narrowed by category and publish-date window.
    pub async fn list_papers(&self, filter: &PaperListFilter) -> Result<Vec<Paper>> {
        let mut query = PaperEntity::find().filter(PaperColumn::IsRelevant.eq(true));

        if let Some(category_id) = filter.category_id {
            query = query.filter(PaperColumn::CategoryId.eq(category_id));
        }
        if let Some(after) = filter.published_after {
            query = query.filter(PaperColumn::PublishedAt.gte(after));
        }
        if let Some(before) = filter.published_before {
            query = query.filter(PaperColumn::PublishedAt.lt(before));
        }

        query
            .order_by(PaperColumn::PublishedAt, Order::Desc)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_paper_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::ArxivId.eq(arxiv_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_figures_by_paper_id(&self, paper_id: i32) -> Result<Vec<Figure>> {
        FigureEntity::find()
            .filter(FigureColumn::PaperId.eq(paper_id))
            .order_by_asc(FigureColumn::FigureIndex)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_formats_as_postgres_array() {
        assert_eq!(vector_literal(&[1.0, 2.5, -3.0]), "[1,2.5,-3]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
