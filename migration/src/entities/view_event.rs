//! 浏览事件实体（只追加）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "view_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// "comic" 或 "chapter"
    pub entity_type: String,
    pub entity_id: i64,
    pub viewed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
