//! Domain types passed between pipeline stages.
//!
//! These are the in-memory shapes L1-Post-L3 actually operate on; they are
//! deliberately distinct from `curator_common::db::models::Paper` (the
//! persisted row), since most stages only need a slice of it and some
//! fields (the embedding vector) never round-trip through sea-orm at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Output of L1: one deduplicated preprint entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPaper {
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub pdf_url: String,
    pub primary_category: String,
    pub all_categories: Vec<String>,
    pub published_at: DateTime<Utc>,
    /// Category ids of every L1 query whose search hit this paper.
    pub matched_queries: BTreeSet<i32>,
}

impl FetchedPaper {
    /// Text embedded at L2: `title + " " + abstract`, per §4.2.
    pub fn embedding_input(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// Output of L2: a paper that passed the similarity threshold, carrying
/// the persisted row id the later stages key off of.
#[derive(Debug, Clone)]
pub struct ScoredPaper {
    pub paper_id: i32,
    pub fetched: FetchedPaper,
    pub best_category_id: i16,
    pub best_category_name: String,
    pub max_score: f64,
    pub hit_count: i32,
}

/// Output of L3: a paper C3 judged relevant.
#[derive(Debug, Clone)]
pub struct RelevantPaper {
    pub paper_id: i32,
    pub arxiv_id: String,
    pub title: String,
    pub pdf_url: String,
    pub category_id: i16,
    pub importance: i16,
}

/// An active category anchor, read-only input to L2 scoring.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub category_id: i16,
    pub name: String,
}

/// C3's structured verdict (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgementVerdict {
    pub is_relevant: bool,
    pub category_id: i16,
    #[serde(default)]
    pub secondary_category_ids: Vec<i16>,
    pub confidence: f64,
    pub importance: i16,
    pub summary_ja: String,
    pub reasoning: String,
}

/// C4's structured review (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailReview {
    pub sections: Vec<ReviewSection>,
    pub perspectives: Perspectives,
    pub levels: Levels,
    pub figure_analysis: Vec<FigureAnalysis>,
    pub one_line_takeaway: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSection {
    pub heading: String,
    pub body_ja: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perspectives {
    pub ai_engineer: String,
    pub mathematician: String,
    pub business: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Levels {
    pub beginner: String,
    pub intermediate: String,
    pub expert: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureAnalysis {
    pub figure_index: i16,
    pub description_ja: String,
}

/// A raster image extracted from a PDF page, before upload.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub figure_index: i16,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub extension: &'static str,
}
