//! API 响应体定义

use chrono::{DateTime, Utc};
use coupon_core::models::{Coupon, CouponStatus};
use coupon_core::service::dto::ValidationOutcome;
use serde::Serialize;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 校验通过时返回的券面摘要
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSummary {
    pub coupon_id: i64,
    pub coupon_code: String,
    pub campaign_id: i64,
    pub campaign_name: String,
    pub tenant_name: String,
    pub customer_name: String,
    pub benefit_description: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 校验响应
///
/// `valid = true` 对应 200，`valid = false` 对应 400；
/// 结论码和提示语直接来自校验结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponSummary>,
}

impl From<ValidationOutcome> for ValidationResponse {
    fn from(outcome: ValidationOutcome) -> Self {
        let valid = outcome.is_valid();
        let code = outcome.code().to_string();
        let message = outcome.message();

        let coupon = match outcome {
            ValidationOutcome::Valid {
                coupon_id,
                coupon_code,
                campaign_id,
                campaign_name,
                tenant_name,
                customer_name,
                benefit_description,
                expires_at,
            } => Some(CouponSummary {
                coupon_id,
                coupon_code,
                campaign_id,
                campaign_name,
                tenant_name,
                customer_name,
                benefit_description,
                expires_at,
            }),
            _ => None,
        };

        Self {
            valid,
            code,
            message,
            coupon,
        }
    }
}

/// 发放成功返回的券信息
///
/// 发放方需要 `qrToken` 用于制作二维码，这是唯一返回该令牌的接口。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCouponDto {
    pub coupon_id: i64,
    pub campaign_id: i64,
    pub customer_id: i64,
    pub code: String,
    pub qr_token: String,
    pub status: CouponStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Coupon> for IssuedCouponDto {
    fn from(coupon: Coupon) -> Self {
        Self {
            coupon_id: coupon.id,
            campaign_id: coupon.campaign_id,
            customer_id: coupon.customer_id,
            code: coupon.code,
            qr_token: coupon.qr_token,
            status: coupon.status,
            expires_at: coupon.expires_at,
            created_at: coupon.created_at,
        }
    }
}
