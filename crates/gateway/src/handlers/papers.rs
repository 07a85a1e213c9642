//! Paper read handlers — `GET /papers` and `GET /papers/{arxiv_id}` (§2.2).
//!
//! Read-only, unauthenticated, relevant papers only: the listing always
//! filters to `is_relevant = true` at the repository layer, matching the
//! curated-digest framing the thin API exists to serve.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use curator_common::db::repository::PaperListFilter;
use curator_common::errors::PipelineError;
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListPapersQuery {
    pub category_id: Option<i16>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PaperSummaryResponse {
    pub arxiv_id: String,
    pub title: String,
    pub primary_category: String,
    pub category_id: Option<i16>,
    pub importance: Option<i16>,
    pub summary_ja: Option<String>,
    pub published_at: String,
}

#[derive(Debug, Serialize)]
pub struct FigureResponse {
    pub figure_index: i16,
    pub s3_url: String,
    pub width: i32,
    pub height: i32,
    pub caption: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaperDetailResponse {
    pub arxiv_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub pdf_url: String,
    pub primary_category: String,
    pub all_categories: Vec<String>,
    pub category_id: Option<i16>,
    pub confidence: Option<f64>,
    pub importance: Option<i16>,
    pub summary_ja: Option<String>,
    pub reasoning: Option<String>,
    pub detail_review: Option<serde_json::Value>,
    pub figures: Vec<FigureResponse>,
    pub published_at: String,
}

/// `GET /papers` — paginated, optionally filtered by category and publish
/// date window; always scoped to `is_relevant = true`.
pub async fn list_papers(
    State(state): State<AppState>,
    Query(query): Query<ListPapersQuery>,
) -> Result<Json<Vec<PaperSummaryResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let filter = PaperListFilter {
        category_id: query.category_id,
        published_after: query.published_after,
        published_before: query.published_before,
        limit,
        offset: query.offset.unwrap_or(0),
    };

    let papers = state.repo.list_papers(&filter).await?;

    Ok(Json(
        papers
            .into_iter()
            .map(|p| PaperSummaryResponse {
                arxiv_id: p.arxiv_id,
                title: p.title,
                primary_category: p.primary_category,
                category_id: p.category_id,
                importance: p.importance,
                summary_ja: p.summary_ja,
                published_at: p.published_at.to_rfc3339(),
            })
            .collect(),
    ))
}

/// `GET /papers/{arxiv_id}` — full record plus its extracted figures.
pub async fn get_paper(
    State(state): State<AppState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<PaperDetailResponse>, ApiError> {
    let paper = state
        .repo
        .find_paper_by_arxiv_id(&arxiv_id)
        .await?
        .ok_or_else(|| PipelineError::ResourceMissing {
            resource: "paper".into(),
            id: arxiv_id.clone(),
        })?;

    let figures = state.repo.find_figures_by_paper_id(paper.id).await?;

    Ok(Json(PaperDetailResponse {
        arxiv_id: paper.arxiv_id,
        title: paper.title,
        abstract_text: paper.abstract_text,
        authors: paper.authors,
        pdf_url: paper.pdf_url,
        primary_category: paper.primary_category,
        all_categories: paper.all_categories,
        category_id: paper.category_id,
        confidence: paper.confidence,
        importance: paper.importance,
        summary_ja: paper.summary_ja,
        reasoning: paper.reasoning,
        detail_review: paper.detail_review,
        figures: figures
            .into_iter()
            .map(|f| FigureResponse {
                figure_index: f.figure_index,
                s3_url: f.s3_url,
                width: f.width,
                height: f.height,
                caption: f.caption,
            })
            .collect(),
        published_at: paper.published_at.to_rfc3339(),
    }))
}
