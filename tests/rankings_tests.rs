//! 排行查询集成测试
//!
//! 覆盖分页连续性与完整性、各类别的过滤和排序、
//! 评分均值的 null 语义、以及名次变化。

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use mangarank::services::{RankingQuery, RankingService, RankingSettings, TrendDirection};
use mangarank::storage::{RankingCategory, RankingPeriod, SeaOrmStorage};

use common::{ComicSeed, create_temp_storage, insert_comic, insert_rating};

fn service(storage: &Arc<SeaOrmStorage>) -> RankingService {
    RankingService::new(storage.clone(), RankingSettings::default())
}

fn query(category: &str, period: &str, page: u64, limit: u64) -> RankingQuery {
    RankingQuery::parse(
        Some(category),
        Some(period),
        Some(page.to_string().as_str()),
        Some(limit.to_string().as_str()),
        &RankingSettings::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_pages_are_contiguous_and_complete() {
    let (storage, _td) = create_temp_storage("pagination").await;
    let db = storage.get_db();

    for id in 1..=25 {
        insert_comic(
            db,
            ComicSeed {
                weekly: 1000 - id * 10,
                ..ComicSeed::new(id)
            },
        )
        .await;
    }
    // weekly = 0 的漫画不参与排行
    insert_comic(db, ComicSeed::new(99)).await;

    let svc = service(&storage);
    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut ranks = Vec::new();
    let mut last_views = u64::MAX;

    for page in 1..=3 {
        let result = svc
            .load_page(&query("most_viewed", "weekly", page, 10), now)
            .await
            .unwrap();
        assert_eq!(result.total, 25);
        assert_eq!(result.pagination.total_pages, 3);
        assert_eq!(result.pagination.has_previous, page > 1);
        assert_eq!(result.pagination.has_next, page < 3);

        for item in &result.rankings {
            assert!(item.weekly_views <= last_views);
            last_views = item.weekly_views;
            assert!(seen.insert(item.id), "duplicate comic {}", item.id);
            ranks.push(item.rank);
        }
    }

    assert_eq!(seen.len(), 25);
    assert!(!seen.contains(&99));
    assert_eq!(ranks, (1..=25).collect::<Vec<u64>>());

    // 超出范围的页返回空列表，总数不变
    let beyond = svc
        .load_page(&query("most_viewed", "weekly", 9, 10), now)
        .await
        .unwrap();
    assert!(beyond.rankings.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn test_ties_break_on_total_views_then_id() {
    let (storage, _td) = create_temp_storage("tie_break").await;
    let db = storage.get_db();

    insert_comic(db, ComicSeed { daily: 5, total: 10, ..ComicSeed::new(3) }).await;
    insert_comic(db, ComicSeed { daily: 5, total: 50, ..ComicSeed::new(2) }).await;
    insert_comic(db, ComicSeed { daily: 5, total: 10, ..ComicSeed::new(1) }).await;

    let result = service(&storage)
        .load_page(&query("most_viewed", "daily", 1, 20), Utc::now())
        .await
        .unwrap();
    let ids: Vec<i64> = result.rankings.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[tokio::test]
async fn test_average_rating_null_versus_value() {
    let (storage, _td) = create_temp_storage("rating_null").await;
    let db = storage.get_db();

    insert_comic(db, ComicSeed { total: 20, ..ComicSeed::new(1) }).await;
    insert_comic(db, ComicSeed { total: 10, ..ComicSeed::new(2) }).await;
    insert_rating(db, 2, 1, 5).await;

    let result = service(&storage)
        .load_page(&query("most_viewed", "all_time", 1, 20), Utc::now())
        .await
        .unwrap();

    let unrated = &result.rankings[0];
    assert_eq!(unrated.id, 1);
    assert_eq!(unrated.average_rating, None);
    assert_eq!(unrated.rating_count, 0);

    let rated = &result.rankings[1];
    assert_eq!(rated.average_rating, Some(5.0));
    assert_eq!(rated.rating_count, 1);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["rankings"][0]["average_rating"].is_null());
}

#[tokio::test]
async fn test_highest_rated_orders_by_rating_count() {
    let (storage, _td) = create_temp_storage("highest_rated").await;
    let db = storage.get_db();

    for id in 1..=3 {
        insert_comic(db, ComicSeed::new(id)).await;
    }
    insert_rating(db, 1, 1, 5).await;
    for user in 1..=3 {
        insert_rating(db, 2, user, 4).await;
    }
    insert_rating(db, 2, 4, 5).await;

    let result = service(&storage)
        .load_page(&query("highest_rated", "weekly", 1, 20), Utc::now())
        .await
        .unwrap();

    let ids: Vec<i64> = result.rankings.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(result.total, 2);
    assert_eq!(result.rankings[0].rating_count, 4);
    // (4 * 3 + 5) / 4 = 4.25
    assert_eq!(result.rankings[0].average_rating, Some(4.3));
}

#[tokio::test]
async fn test_most_bookmarked_and_trending_filters() {
    let (storage, _td) = create_temp_storage("filters").await;
    let db = storage.get_db();

    insert_comic(db, ComicSeed { favorites: 3, monthly: 5, ..ComicSeed::new(1) }).await;
    insert_comic(db, ComicSeed { favorites: 9, ..ComicSeed::new(2) }).await;
    insert_comic(
        db,
        ComicSeed {
            monthly: 500,
            updated_days_ago: 45,
            ..ComicSeed::new(3)
        },
    )
    .await;

    let svc = service(&storage);
    let now = Utc::now();

    let bookmarked = svc
        .load_page(&query("most_bookmarked", "daily", 1, 20), now)
        .await
        .unwrap();
    let ids: Vec<i64> = bookmarked.rankings.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1]);

    // 45 天没有更新的漫画不进入 trending，但仍在 most_viewed 中
    let trending = svc
        .load_page(&query("trending", "monthly", 1, 20), now)
        .await
        .unwrap();
    let ids: Vec<i64> = trending.rankings.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);

    let viewed = svc
        .load_page(&query("most_viewed", "monthly", 1, 20), now)
        .await
        .unwrap();
    let ids: Vec<i64> = viewed.rankings.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 1]);
}

#[tokio::test]
async fn test_trend_from_captured_positions() {
    let (storage, _td) = create_temp_storage("trend").await;
    let db = storage.get_db();

    insert_comic(db, ComicSeed { weekly: 100, ..ComicSeed::new(1) }).await;
    insert_comic(db, ComicSeed { weekly: 50, ..ComicSeed::new(2) }).await;

    let svc = service(&storage);
    let q = query("most_viewed", "weekly", 1, 20);

    // 没有任何记录时全部为 stable
    let before = svc.load_page(&q, Utc::now()).await.unwrap();
    assert!(
        before
            .rankings
            .iter()
            .all(|r| r.trend_direction == TrendDirection::Stable && r.previous_rank.is_none())
    );

    svc.capture_positions().await.unwrap();

    // 名次变化：2 号超过 1 号，新增 3 号
    use migration::entities::comic;
    use sea_orm::{ActiveValue::Set, EntityTrait};
    comic::Entity::update(comic::ActiveModel {
        id: Set(2),
        weekly_views: Set(200),
        ..Default::default()
    })
    .exec(db)
    .await
    .unwrap();
    insert_comic(db, ComicSeed { weekly: 10, ..ComicSeed::new(3) }).await;

    let after = svc.load_page(&q, Utc::now()).await.unwrap();
    let by_id = |id: i64| after.rankings.iter().find(|r| r.id == id).unwrap();

    assert_eq!(by_id(2).rank, 1);
    assert_eq!(by_id(2).previous_rank, Some(2));
    assert_eq!(by_id(2).trend_direction, TrendDirection::Up);
    assert_eq!(by_id(1).trend_direction, TrendDirection::Down);
    assert_eq!(by_id(3).trend_direction, TrendDirection::New);
    assert_eq!(by_id(3).previous_rank, None);
}

#[tokio::test]
async fn test_unchanged_comics_past_capture_depth_stay_stable() {
    let (storage, _td) = create_temp_storage("trend_depth").await;
    let db = storage.get_db();

    for id in 1..=5 {
        insert_comic(db, ComicSeed { weekly: 100 - id, ..ComicSeed::new(id) }).await;
    }

    let settings = RankingSettings {
        capture_depth: 2,
        ..RankingSettings::default()
    };
    let svc = RankingService::new(storage.clone(), settings);
    svc.capture_positions().await.unwrap();

    let page = svc
        .load_page(&query("most_viewed", "weekly", 1, 20), Utc::now())
        .await
        .unwrap();
    assert_eq!(page.rankings.len(), 5);

    for item in &page.rankings {
        assert_eq!(item.trend_direction, TrendDirection::Stable, "rank {}", item.rank);
        if item.rank <= 2 {
            assert_eq!(item.previous_rank, Some(item.rank as u32));
        } else {
            assert_eq!(item.previous_rank, None);
        }
    }
}

#[tokio::test]
async fn test_huge_page_returns_empty_page_with_real_total() {
    let (storage, _td) = create_temp_storage("huge_page").await;
    let db = storage.get_db();

    for id in 1..=3 {
        insert_comic(db, ComicSeed { weekly: 10 * id, ..ComicSeed::new(id) }).await;
    }

    let svc = service(&storage);
    for raw in ["200000000000000000", "9223372036854775807"] {
        let q = RankingQuery::parse(
            Some("most_viewed"),
            Some("weekly"),
            Some(raw),
            Some("50"),
            &RankingSettings::default(),
        )
        .unwrap();

        let result = svc.load_page(&q, Utc::now()).await.unwrap();
        assert!(result.rankings.is_empty(), "page {}", raw);
        assert_eq!(result.total, 3);
        assert!(!result.pagination.has_next);
    }
}

#[tokio::test]
async fn test_cached_page_until_invalidated() {
    let (storage, _td) = create_temp_storage("ranking_cache").await;
    let db = storage.get_db();

    insert_comic(db, ComicSeed { weekly: 10, ..ComicSeed::new(1) }).await;

    let svc = service(&storage);
    let q = query("most_viewed", "weekly", 1, 20);
    let first = svc.rankings(&q).await.unwrap();
    assert_eq!(first.total, 1);

    insert_comic(db, ComicSeed { weekly: 20, ..ComicSeed::new(2) }).await;
    let cached = svc.rankings(&q).await.unwrap();
    assert_eq!(cached.total, 1);

    svc.invalidate_cache();
    let fresh = svc.rankings(&q).await.unwrap();
    assert_eq!(fresh.total, 2);
    assert_eq!(fresh.rankings[0].id, 2);
}

#[test]
fn test_period_and_category_enumerations() {
    use strum::IntoEnumIterator;
    assert_eq!(RankingCategory::iter().count(), 4);
    assert_eq!(RankingPeriod::iter().count(), 4);
}
