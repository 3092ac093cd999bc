//! 核销接口
//!
//! 写路径：成功返回 200 + 核销结果，业务失败返回 400 + 结构化错误
//! （由 `ApiError` 的 `IntoResponse` 统一处理）。

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use coupon_core::models::RedemptionChannel;
use coupon_core::service::dto::RedemptionSuccess;
use coupon_shared::observability::metrics;
use validator::Validate;

use crate::dto::{ApiResponse, RedeemBody, TenantQuery};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// POST /redeem/qr/{qr_token} - 扫码核销
pub async fn by_qr_token(
    State(state): State<AppState>,
    Path(qr_token): Path<String>,
    Query(query): Query<TenantQuery>,
    Json(body): Json<RedeemBody>,
) -> Result<Json<ApiResponse<RedemptionSuccess>>> {
    body.validate()?;
    let request = body.into_request(RedemptionChannel::QrAdmin);
    let channel = request.channel;

    let start = Instant::now();
    let result = state
        .redemption_service
        .redeem_by_qr_token(query.tenant_id, &qr_token, request)
        .await;

    respond(channel, start, result)
}

/// POST /redeem/code/{code} - 券码核销
pub async fn by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<TenantQuery>,
    Json(body): Json<RedeemBody>,
) -> Result<Json<ApiResponse<RedemptionSuccess>>> {
    body.validate()?;
    let request = body.into_request(RedemptionChannel::Manual);
    let channel = request.channel;

    let start = Instant::now();
    let result = state
        .redemption_service
        .redeem_by_code(query.tenant_id, &code, request)
        .await;

    respond(channel, start, result)
}

fn respond(
    channel: RedemptionChannel,
    start: Instant,
    result: coupon_core::Result<RedemptionSuccess>,
) -> Result<Json<ApiResponse<RedemptionSuccess>>> {
    let outcome = match &result {
        Ok(_) => "SUCCESS",
        Err(e) => e.error_code(),
    };
    metrics::record_redemption(channel.as_str(), outcome, start.elapsed().as_secs_f64());

    let success = result.map_err(ApiError::from)?;
    Ok(Json(ApiResponse::success_with_message(
        success,
        "核销成功",
    )))
}
