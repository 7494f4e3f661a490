//! 单实体浏览统计 API
//!
//! - GET  /view-statistics/{entity_type}/{entity_id}?period=current|historical&days=N
//! - POST /view-statistics/{entity_type}/{entity_id} 立即重算
//! - POST /views/{entity_type}/{entity_id} 记录一次浏览

use actix_web::{Responder, web};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::errors::{AppError, Result};
use crate::services::{StatisticsPeriod, ViewStatisticsService, clamp_history_days};
use crate::storage::EntityType;

use super::helpers::{api_result, error_response, success_response};
use super::types::ViewStatisticsQueryParams;

/// 解析路径参数，校验失败时为 400
fn parse_target(path: &(String, String)) -> Result<(EntityType, i64)> {
    let entity_type: EntityType = path.0.parse()?;
    let entity_id = path
        .1
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation(format!("Invalid entity id: '{}'", path.1)))?;
    Ok((entity_type, entity_id))
}

pub async fn get_view_statistics(
    service: web::Data<Arc<ViewStatisticsService>>,
    path: web::Path<(String, String)>,
    params: web::Query<ViewStatisticsQueryParams>,
) -> impl Responder {
    trace!("Received view statistics request: {:?} {:?}", path, params);

    let parsed = parse_target(&path).and_then(|target| {
        let period = match params.period.as_deref() {
            Some(raw) => raw.parse::<StatisticsPeriod>()?,
            None => StatisticsPeriod::Current,
        };
        Ok((target, period))
    });
    let ((entity_type, entity_id), period) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Rejected view statistics request: {}", e);
            return error_response(&e);
        }
    };

    match period {
        StatisticsPeriod::Current => api_result(service.current(entity_type, entity_id).await),
        StatisticsPeriod::Historical => {
            let days = clamp_history_days(params.days.as_deref());
            api_result(service.historical(entity_type, entity_id, days).await)
        }
    }
}

pub async fn recompute_view_statistics(
    service: web::Data<Arc<ViewStatisticsService>>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (entity_type, entity_id) = match parse_target(&path) {
        Ok(target) => target,
        Err(e) => return error_response(&e),
    };

    match service.recompute(entity_type, entity_id).await {
        Ok(stats) => success_response(stats, Some("View statistics updated".to_string())),
        Err(e) => error_response(&e),
    }
}

pub async fn record_view(
    service: web::Data<Arc<ViewStatisticsService>>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (entity_type, entity_id) = match parse_target(&path) {
        Ok(target) => target,
        Err(e) => return error_response(&e),
    };

    match service.record_view(entity_type, entity_id).await {
        Ok(()) => success_response((), Some("View recorded".to_string())),
        Err(e) => error_response(&e),
    }
}

/// 统计路由 `/view-statistics`
pub fn view_statistics_routes() -> actix_web::Scope {
    web::scope("/view-statistics")
        .route(
            "/{entity_type}/{entity_id}",
            web::get().to(get_view_statistics),
        )
        .route(
            "/{entity_type}/{entity_id}",
            web::post().to(recompute_view_statistics),
        )
}

/// 浏览记录路由 `/views`
pub fn views_routes() -> actix_web::Scope {
    web::scope("/views").route("/{entity_type}/{entity_id}", web::post().to(record_view))
}
