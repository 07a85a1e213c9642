//! `anchors` entity — the six fixed category centroids L2 scores every
//! paper embedding against. `embedding` is `NOT NULL` here (unlike papers,
//! an anchor without a vector is meaningless) and, like `papers.embedding`,
//! is read and written through raw SQL rather than a derived column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "anchors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub category_id: i16,

    #[sea_orm(column_type = "Text")]
    pub category_name: String,

    #[sea_orm(column_type = "Text")]
    pub definition_en: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub definition_ja: Option<String>,

    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("anchors has no relations")
    }
}

impl ActiveModelBehavior for ActiveModel {}
