//! 排行榜 API
//!
//! - GET /rankings?category=&period=&page=&limit=
//! - POST /rankings 清空进程内排行缓存（CDN 刷新由外部负责）

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

use crate::services::{CacheTier, RankingPage, RankingQuery, RankingService};

use super::helpers::{check_refresh_secret, error_response, error_response_with, json_response};
use super::types::{ApiResponse, RankingsQueryParams};

pub async fn get_rankings(
    service: web::Data<Arc<RankingService>>,
    params: web::Query<RankingsQueryParams>,
) -> impl Responder {
    trace!("Received rankings request: {:?}", params);

    let category = params.category.as_deref();
    let period = params.period.as_deref();
    let page = params.page.as_deref();
    let limit = params.limit.as_deref();

    // 参数非法时直接 400，不访问数据库；data 仍是空的结果页
    let query = match RankingQuery::parse(category, period, page, limit, service.settings()) {
        Ok(query) => query,
        Err(e) => {
            warn!("Rejected rankings request: {}", e);
            let fallback =
                RankingQuery::lenient(category, period, page, limit, service.settings());
            return error_response_with(&e, Some(RankingPage::empty(&fallback)));
        }
    };

    match service.rankings(&query).await {
        Ok(page) => {
            let tier = CacheTier::for_period(query.period);
            json_response(
                StatusCode::OK,
                &tier.header_value(),
                ApiResponse {
                    success: true,
                    data: Some(page.as_ref().clone()),
                    message: None,
                    error: None,
                },
            )
        }
        Err(e) => {
            error!("Failed to load rankings for {:?}: {}", query, e);
            error_response_with(&e, Some(RankingPage::empty(&query)))
        }
    }
}

pub async fn refresh_rankings(
    req: HttpRequest,
    service: web::Data<Arc<RankingService>>,
) -> impl Responder {
    if let Err(e) = check_refresh_secret(
        service.settings().refresh_secret.as_deref(),
        req.headers(),
    ) {
        warn!("Rejected rankings refresh: {}", e);
        return error_response(&e);
    }

    service.invalidate_cache();
    info!("Rankings refresh requested");

    HttpResponse::Ok().json(ApiResponse::<()> {
        success: true,
        data: None,
        message: Some("Rankings cache invalidated".to_string()),
        error: None,
    })
}

/// 排行路由 `/rankings`
pub fn rankings_routes() -> actix_web::Scope {
    web::scope("/rankings")
        .route("", web::get().to(get_rankings))
        .route("", web::post().to(refresh_rankings))
}
