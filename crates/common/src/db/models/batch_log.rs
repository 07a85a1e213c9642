//! `batch_logs` entity — one row per orchestrator run, the audit trail an
//! operator reads to see what a given day's curation run actually did.
//! Token/cost columns are carried forward from the original schema even
//! though nothing in this pipeline populates them yet; they default to
//! zero rather than being dropped, so a future LLM-usage accounting pass
//! has a column to write into without a migration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub execution_date: Date,

    #[sea_orm(column_type = "JsonBinary")]
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

    #[sea_orm(column_type = "JsonBinary")]
    pub errors: serde_json::Value,

    pub processing_time_sec: f64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("batch_logs has no relations")
    }
}

impl ActiveModelBehavior for ActiveModel {}
