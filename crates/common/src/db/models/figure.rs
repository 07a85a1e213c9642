//! `paper_figures` entity — one row per extracted figure image, uploaded to
//! object storage by the Post-L3 stage. `(paper_id, figure_index)` is
//! unique so re-running the stage on an already-reviewed paper upserts
//! rather than duplicates.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_figures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub paper_id: i32,
    pub figure_index: i16,

    #[sea_orm(column_type = "Text")]
    pub s3_key: String,

    #[sea_orm(column_type = "Text")]
    pub s3_url: String,

    pub width: i32,
    pub height: i32,
    pub file_size_bytes: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub caption: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
