//! 优惠券服务错误类型
//!
//! 定义服务层的业务错误和系统错误。业务错误全部作为结构化结果返回，
//! 不会以 500 的形式穿透 HTTP 边界。

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::CouponStatus;

/// 优惠券服务错误类型
#[derive(Debug, Error)]
pub enum CouponError {
    // === 查找类错误 ===
    #[error("优惠券不存在")]
    CouponNotFound,

    #[error("活动不存在: {0}")]
    CampaignNotFound(i64),

    #[error("客户不存在: {0}")]
    CustomerNotFound(i64),

    #[error("租户不存在: {0}")]
    TenantNotFound(i64),

    #[error("权益不存在: {0}")]
    RewardNotFound(i64),

    // === 核销类错误 ===
    #[error("优惠券所属活动不属于当前租户")]
    TenantMismatch,

    #[error("优惠券已核销: redeemed_at={redeemed_at}")]
    AlreadyRedeemed { redeemed_at: DateTime<Utc> },

    #[error("优惠券已过期: expires_at={expires_at}")]
    Expired { expires_at: DateTime<Utc> },

    #[error("优惠券当前状态不可核销: {status:?}")]
    InvalidState { status: CouponStatus },

    #[error("权益使用次数已达上限: reward_id={reward_id}")]
    UsageLimitReached { reward_id: i64 },

    // === 发放类错误 ===
    #[error("业务规则校验失败: {0}")]
    BusinessRuleViolation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 优惠券服务 Result 类型别名
pub type Result<T> = std::result::Result<T, CouponError>;

impl CouponError {
    /// 检查是否为业务错误（非系统错误）
    ///
    /// 业务错误通过 400 + 结构化响应体返回，系统错误返回 500
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_)
        )
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CouponNotFound => "COUPON_NOT_FOUND",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            Self::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            Self::TenantNotFound(_) => "TENANT_NOT_FOUND",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::TenantMismatch => "TENANT_MISMATCH",
            Self::AlreadyRedeemed { .. } => "ALREADY_REDEEMED",
            Self::Expired { .. } => "EXPIRED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::UsageLimitReached { .. } => "USAGE_LIMIT_REACHED",
            Self::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
