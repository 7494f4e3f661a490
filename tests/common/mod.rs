//! 集成测试公共工具：临时 SQLite 数据库与数据准备

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};
use tempfile::TempDir;

use mangarank::config::DatabaseConfig;
use mangarank::storage::SeaOrmStorage;
use migration::entities::{chapter, comic, rating, view_event};

/// 创建临时数据库（TempDir 需要在测试期间保持存活）
pub async fn create_temp_storage(name: &str) -> (Arc<SeaOrmStorage>, TempDir) {
    let td = TempDir::new().unwrap();
    let p = td.path().join(format!("{}.db", name));
    let u = format!("sqlite://{}?mode=rwc", p.display());
    let s = SeaOrmStorage::with_config(&u, "sqlite", &DatabaseConfig::default())
        .await
        .unwrap();
    (Arc::new(s), td)
}

#[derive(Debug, Clone)]
pub struct ComicSeed {
    pub id: i64,
    pub daily: i64,
    pub weekly: i64,
    pub monthly: i64,
    pub total: i64,
    pub favorites: i64,
    pub updated_days_ago: i64,
}

impl ComicSeed {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            daily: 0,
            weekly: 0,
            monthly: 0,
            total: 0,
            favorites: 0,
            updated_days_ago: 0,
        }
    }
}

pub async fn insert_comic(db: &DatabaseConnection, seed: ComicSeed) {
    let now = Utc::now();
    let model = comic::ActiveModel {
        id: Set(seed.id),
        title: Set(format!("Comic {}", seed.id)),
        slug: Set(format!("comic-{}", seed.id)),
        cover_image_url: Set(Some(format!("https://img.example/{}.jpg", seed.id))),
        daily_views: Set(seed.daily),
        weekly_views: Set(seed.weekly),
        monthly_views: Set(seed.monthly),
        total_views: Set(seed.total),
        total_favorites: Set(seed.favorites),
        created_at: Set(now - Duration::days(seed.updated_days_ago)),
        updated_at: Set(now - Duration::days(seed.updated_days_ago)),
    };
    comic::Entity::insert(model).exec(db).await.unwrap();
}

pub async fn insert_chapter(db: &DatabaseConnection, id: i64, comic_id: i64) {
    let now = Utc::now();
    let model = chapter::ActiveModel {
        id: Set(id),
        comic_id: Set(comic_id),
        title: Set(format!("Chapter {}", id)),
        chapter_number: Set(id as f64),
        daily_views: Set(0),
        weekly_views: Set(0),
        monthly_views: Set(0),
        view_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    chapter::Entity::insert(model).exec(db).await.unwrap();
}

pub async fn insert_rating(db: &DatabaseConnection, comic_id: i64, user_id: i64, value: i32) {
    let model = rating::ActiveModel {
        comic_id: Set(comic_id),
        user_id: Set(user_id),
        rating: Set(value),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    rating::Entity::insert(model).exec(db).await.unwrap();
}

/// 在指定时间点写入若干浏览事件
pub async fn insert_views(
    db: &DatabaseConnection,
    entity_type: &str,
    entity_id: i64,
    viewed_at: DateTime<Utc>,
    count: usize,
) {
    if count == 0 {
        return;
    }
    let models = (0..count).map(|i| view_event::ActiveModel {
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        viewed_at: Set(viewed_at - Duration::seconds(i as i64)),
        ..Default::default()
    });
    view_event::Entity::insert_many(models)
        .exec_without_returning(db)
        .await
        .unwrap();
}

pub async fn load_comic(db: &DatabaseConnection, id: i64) -> comic::Model {
    comic::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
}
