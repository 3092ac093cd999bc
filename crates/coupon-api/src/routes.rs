//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 构建核销引擎的全部业务路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 校验（只读）
        .route("/validate/qr/{qr_token}", get(handlers::validate::by_qr_token))
        .route(
            "/validate/customer/qr/{qr_token}",
            get(handlers::validate::for_customer),
        )
        .route("/validate/code/{code}", get(handlers::validate::by_code))
        // 核销（写路径）
        .route("/redeem/qr/{qr_token}", post(handlers::redeem::by_qr_token))
        .route("/redeem/code/{code}", post(handlers::redeem::by_code))
        // 审计查询
        .route("/history", get(handlers::history::list_by_tenant))
        .route(
            "/history/campaign/{id}",
            get(handlers::history::list_by_campaign),
        )
        .route(
            "/history/date-range",
            get(handlers::history::list_by_date_range),
        )
        .route("/history/recent", get(handlers::history::list_recent))
        // 内部发放
        .route("/coupons/issue", post(handlers::issue::issue_coupon))
}
