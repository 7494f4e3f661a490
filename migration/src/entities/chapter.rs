//! 章节实体（含浏览量汇总字段）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chapters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub comic_id: i64,
    pub title: String,
    pub chapter_number: f64,
    pub daily_views: i64,
    pub weekly_views: i64,
    pub monthly_views: i64,
    /// 章节总浏览量（与漫画的 total_views 分开计数）
    pub view_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
