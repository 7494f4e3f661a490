//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CACHE_CONTROL, HeaderMap};
use actix_web::HttpResponse;
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::services::NO_STORE;

use super::types::ApiResponse;

pub const REFRESH_SECRET_HEADER: &str = "x-refresh-secret";

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    cache_control: &str,
    body: ApiResponse<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .append_header((CACHE_CONTROL, cache_control.to_string()))
        .json(body)
}

/// 构建成功响应（不可缓存）
pub fn success_response<T: Serialize>(data: T, message: Option<String>) -> HttpResponse {
    json_response(
        StatusCode::OK,
        NO_STORE,
        ApiResponse {
            success: true,
            data: Some(data),
            message,
            error: None,
        },
    )
}

/// 从 AppError 构建错误响应，状态码由错误类型决定
pub fn error_response(err: &AppError) -> HttpResponse {
    error_response_with::<()>(err, None)
}

/// 带空结构数据的错误响应，客户端不用为错误单独解析
pub fn error_response_with<T: Serialize>(err: &AppError, data: Option<T>) -> HttpResponse {
    json_response(
        err.http_status(),
        NO_STORE,
        ApiResponse {
            success: false,
            data,
            message: None,
            error: Some(err.message().to_string()),
        },
    )
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: Result<T, AppError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(data, None),
        Err(e) => error_response(&e),
    }
}

/// 常量时间比较两个字符串
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// 从 `Authorization: Bearer <secret>` 或 `x-refresh-secret` 取出密钥
pub fn extract_refresh_secret(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());

    bearer.or_else(|| {
        headers
            .get(REFRESH_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
    })
}

/// 校验刷新密钥；未配置密钥时放行
pub fn check_refresh_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match extract_refresh_secret(headers) {
        Some(provided) if constant_time_compare(&provided, expected) => Ok(()),
        _ => Err(AppError::unauthorized("Invalid refresh secret")),
    }
}
