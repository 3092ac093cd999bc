//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    CampaignSnapshot, Coupon, CouponRedemption, CustomerSnapshot, PromotionReward, TenantSnapshot,
};

/// 优惠券仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CouponRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Coupon>>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>>;
    async fn find_by_qr_token(&self, qr_token: &str) -> Result<Option<Coupon>>;
    /// 查找客户在某活动下的有效（非终态）优惠券
    async fn find_active_for_campaign(
        &self,
        campaign_id: i64,
        customer_id: i64,
    ) -> Result<Option<Coupon>>;
    async fn code_exists(&self, code: &str) -> Result<bool>;
    async fn update(&self, coupon: &Coupon) -> Result<()>;
}

/// 核销审计仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionRepositoryTrait: Send + Sync {
    async fn find_by_coupon_id(&self, coupon_id: i64) -> Result<Option<CouponRedemption>>;
    async fn list_by_tenant(&self, tenant_id: i64, limit: i64) -> Result<Vec<CouponRedemption>>;
    async fn list_by_campaign(
        &self,
        tenant_id: i64,
        campaign_id: i64,
    ) -> Result<Vec<CouponRedemption>>;
    async fn list_by_date_range(
        &self,
        tenant_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CouponRedemption>>;
    async fn list_recent(&self, tenant_id: i64, limit: i64) -> Result<Vec<CouponRedemption>>;
}

/// 权益仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<PromotionReward>>;
    async fn find_by_campaign(&self, campaign_id: i64) -> Result<Option<PromotionReward>>;
    /// 原子扣减一次使用量；达到上限时返回 false，不做任何变更
    async fn try_increment_usage(&self, reward_id: i64) -> Result<bool>;
}

/// 外部协作方（租户 / 活动 / 客户）查询接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryRepositoryTrait: Send + Sync {
    async fn get_campaign(&self, id: i64) -> Result<Option<CampaignSnapshot>>;
    async fn get_customer(&self, id: i64) -> Result<Option<CustomerSnapshot>>;
    async fn get_tenant(&self, id: i64) -> Result<Option<TenantSnapshot>>;
    /// 活动核销计数 +1（成功核销后的旁路通知，尽力而为）
    async fn increment_redemption_count(&self, campaign_id: i64) -> Result<()>;
}
