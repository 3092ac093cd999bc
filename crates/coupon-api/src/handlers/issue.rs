//! 发放接口（内部）
//!
//! 由平台内部的活动触达流程调用，不对商家或客户开放。

use axum::extract::State;
use axum::Json;
use coupon_shared::observability::metrics;
use validator::Validate;

use crate::dto::{ApiResponse, IssueBody, IssuedCouponDto};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// POST /coupons/issue - 为客户发放优惠券
pub async fn issue_coupon(
    State(state): State<AppState>,
    Json(body): Json<IssueBody>,
) -> Result<Json<ApiResponse<IssuedCouponDto>>> {
    body.validate()?;

    let coupon = state
        .issue_service
        .issue(body.into())
        .await
        .map_err(ApiError::from)?;

    metrics::record_issuance();

    Ok(Json(ApiResponse::success_with_message(
        coupon.into(),
        "发放成功",
    )))
}
