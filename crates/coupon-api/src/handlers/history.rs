//! 核销审计查询接口
//!
//! 全部租户隔离：查询条件始终包含请求方的 tenant_id。

use axum::extract::{Path, Query, State};
use axum::Json;
use coupon_core::models::CouponRedemption;
use coupon_core::repository::RedemptionRepositoryTrait;

use crate::dto::{ApiResponse, DateRangeQuery, HistoryQuery, TenantQuery};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// GET /history - 租户的核销流水（按时间倒序）
pub async fn list_by_tenant(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<CouponRedemption>>>> {
    let redemptions = state
        .redemption_repo
        .list_by_tenant(query.tenant_id, query.effective_limit())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(redemptions)))
}

/// GET /history/campaign/{id} - 某活动的核销流水
pub async fn list_by_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<i64>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<ApiResponse<Vec<CouponRedemption>>>> {
    let redemptions = state
        .redemption_repo
        .list_by_campaign(query.tenant_id, campaign_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(redemptions)))
}

/// GET /history/date-range - 按时间范围查询核销流水
pub async fn list_by_date_range(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<Vec<CouponRedemption>>>> {
    if query.end_date < query.start_date {
        return Err(ApiError::Validation(
            "endDate 不能早于 startDate".to_string(),
        ));
    }

    let redemptions = state
        .redemption_repo
        .list_by_date_range(query.tenant_id, query.start_date, query.end_date)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(redemptions)))
}

/// GET /history/recent - 最近核销流水
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<CouponRedemption>>>> {
    let redemptions = state
        .redemption_repo
        .list_recent(query.tenant_id, query.effective_limit())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(redemptions)))
}
