mod helpers;
pub mod health;
pub mod rankings;
pub mod types;
pub mod view_statistics;

pub use health::{AppStartTime, HealthService, health_routes};
pub use rankings::rankings_routes;
pub use types::ApiResponse;
pub use view_statistics::{view_statistics_routes, views_routes};

/// 注册全部路由
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(health_routes())
        .service(rankings_routes())
        .service(view_statistics_routes())
        .service(views_routes());
}
