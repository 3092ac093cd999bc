//! 校验接口
//!
//! 只读路径：返回可核销性结论和券面摘要。可核销返回 200，
//! 其余结论返回 400 + 结构化说明，系统故障才是 500。

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coupon_core::service::dto::ValidationOutcome;
use coupon_shared::observability::metrics;

use crate::dto::{TenantQuery, ValidationResponse};
use crate::error::Result;
use crate::state::AppState;

/// GET /validate/qr/{qr_token} - 商家侧按 QR 令牌校验
pub async fn by_qr_token(
    State(state): State<AppState>,
    Path(qr_token): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Response> {
    let outcome = state
        .validation_service
        .validate_by_qr_token(query.tenant_id, &qr_token)
        .await?;

    Ok(outcome_response(outcome))
}

/// GET /validate/code/{code} - 商家侧按券码校验
pub async fn by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Response> {
    let outcome = state
        .validation_service
        .validate_by_code(query.tenant_id, &code)
        .await?;

    Ok(outcome_response(outcome))
}

/// GET /validate/customer/qr/{qr_token} - 客户侧查看自己的券
pub async fn for_customer(
    State(state): State<AppState>,
    Path(qr_token): Path<String>,
) -> Result<Response> {
    let outcome = state.validation_service.validate_for_customer(&qr_token).await?;

    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: ValidationOutcome) -> Response {
    metrics::record_validation(outcome.code());

    let status = if outcome.is_valid() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (status, Json(ValidationResponse::from(outcome))).into_response()
}
