//! `papers` entity — the central record carried from L1 fetch through
//! Post-L3 review. `embedding` has no column here: sea-orm has no
//! first-class `vector` type, so every read/write that touches it goes
//! through the raw-SQL helpers in `repository.rs`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique, column_type = "Text")]
    pub arxiv_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_name = "abstract", column_type = "Text")]
    pub abstract_text: String,

    pub authors: Vec<String>,

    #[sea_orm(column_type = "Text")]
    pub pdf_url: String,

    #[sea_orm(column_type = "Text")]
    pub primary_category: String,

    pub all_categories: Vec<String>,
    pub published_at: DateTimeWithTimeZone,
    pub matched_queries: Vec<i32>,

    // L2 vector-filter outputs
    pub best_category_id: Option<i16>,
    pub max_score: Option<f64>,
    pub hit_count: Option<i32>,
    pub importance_score: Option<f64>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub all_scores: Option<serde_json::Value>,

    // L3 judgement outputs
    pub is_relevant: Option<bool>,
    pub category_id: Option<i16>,
    pub confidence: Option<f64>,
    pub importance: Option<i16>,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary_ja: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub reasoning: Option<String>,

    // Post-L3 structured review
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub detail_review: Option<serde_json::Value>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::figure::Entity")]
    Figures,
}

impl Related<super::figure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Figures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
