//! 优惠券校验服务（只读路径）
//!
//! 收银台在扫码后、确认核销前调用，用于展示券面信息和可核销性。
//! 不加行锁、不改任何数据，结论对随后的核销不构成保证：
//! 最终判定以核销事务内的检查为准。对同一不变的数据重复调用
//! 得到相同结论。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use super::dto::{CouponLookup, ValidationOutcome};
use super::resolve_benefit_description;
use crate::error::{CouponError, Result};
use crate::models::{Coupon, CouponStatus};
use crate::repository::traits::{
    CouponRepositoryTrait, DirectoryRepositoryTrait, RedemptionRepositoryTrait,
    RewardRepositoryTrait,
};

/// 优惠券校验服务
#[derive(Clone)]
pub struct ValidationService {
    coupon_repo: Arc<dyn CouponRepositoryTrait>,
    redemption_repo: Arc<dyn RedemptionRepositoryTrait>,
    reward_repo: Arc<dyn RewardRepositoryTrait>,
    directory_repo: Arc<dyn DirectoryRepositoryTrait>,
}

impl ValidationService {
    pub fn new(
        coupon_repo: Arc<dyn CouponRepositoryTrait>,
        redemption_repo: Arc<dyn RedemptionRepositoryTrait>,
        reward_repo: Arc<dyn RewardRepositoryTrait>,
        directory_repo: Arc<dyn DirectoryRepositoryTrait>,
    ) -> Self {
        Self {
            coupon_repo,
            redemption_repo,
            reward_repo,
            directory_repo,
        }
    }

    /// 商家侧按 QR 令牌校验（带租户归属检查）
    pub async fn validate_by_qr_token(
        &self,
        tenant_id: i64,
        qr_token: &str,
    ) -> Result<ValidationOutcome> {
        self.validate(
            Some(tenant_id),
            &CouponLookup::QrToken(qr_token.to_string()),
        )
        .await
    }

    /// 商家侧按券码校验（带租户归属检查）
    pub async fn validate_by_code(&self, tenant_id: i64, code: &str) -> Result<ValidationOutcome> {
        self.validate(Some(tenant_id), &CouponLookup::Code(code.to_string()))
            .await
    }

    /// 客户侧按 QR 令牌校验（客户查看自己的券，不做租户检查）
    pub async fn validate_for_customer(&self, qr_token: &str) -> Result<ValidationOutcome> {
        self.validate(None, &CouponLookup::QrToken(qr_token.to_string()))
            .await
    }

    /// 校验一张券是否可核销
    ///
    /// 判定优先级固定：不存在 > 归属不符 > 已核销 > 已过期 > 状态不可用。
    /// 已核销的判定以审计表为准（审计行缺失时退回券状态字段）；
    /// 归属不符的结论不附带券的任何信息。
    #[instrument(skip(self, lookup), fields(tenant_id = ?tenant_id))]
    async fn validate(
        &self,
        tenant_id: Option<i64>,
        lookup: &CouponLookup,
    ) -> Result<ValidationOutcome> {
        let coupon = match self.find_coupon(lookup).await? {
            Some(coupon) => coupon,
            None => return Ok(ValidationOutcome::NotFound),
        };

        let campaign = self
            .directory_repo
            .get_campaign(coupon.campaign_id)
            .await?
            .ok_or(CouponError::CampaignNotFound(coupon.campaign_id))?;

        if let Some(tenant_id) = tenant_id {
            if campaign.tenant_id != tenant_id {
                info!(coupon_id = coupon.id, "校验被拒：券不属于当前租户");
                return Ok(ValidationOutcome::TenantMismatch);
            }
        }

        if let Some(redemption) = self.redemption_repo.find_by_coupon_id(coupon.id).await? {
            return Ok(ValidationOutcome::AlreadyRedeemed {
                redeemed_at: redemption.redeemed_at,
            });
        }
        if coupon.status == CouponStatus::Redeemed {
            return Ok(ValidationOutcome::AlreadyRedeemed {
                redeemed_at: coupon.redeemed_at.unwrap_or(coupon.updated_at),
            });
        }

        let now = Utc::now();
        // 状态为 EXPIRED，或已到期但扫描尚未落账，都按已过期报告
        if coupon.status == CouponStatus::Expired || coupon.is_expired(now) {
            return Ok(ValidationOutcome::Expired {
                expires_at: coupon.expires_at.unwrap_or(coupon.updated_at),
            });
        }

        if coupon.status != CouponStatus::Active {
            return Ok(ValidationOutcome::NotAvailable {
                status: coupon.status,
            });
        }

        let tenant_name = self
            .directory_repo
            .get_tenant(campaign.tenant_id)
            .await?
            .map(|t| t.name)
            .ok_or(CouponError::TenantNotFound(campaign.tenant_id))?;

        let customer_name = self
            .directory_repo
            .get_customer(coupon.customer_id)
            .await?
            .map(|c| c.display_name())
            .unwrap_or_else(|| format!("客户 {}", coupon.customer_id));

        let reward = self.reward_repo.find_by_campaign(campaign.id).await?;
        let benefit_description = resolve_benefit_description(&campaign, reward.as_ref());

        Ok(ValidationOutcome::Valid {
            coupon_id: coupon.id,
            coupon_code: coupon.code,
            campaign_id: campaign.id,
            campaign_name: campaign.name,
            tenant_name,
            customer_name,
            benefit_description,
            expires_at: coupon.expires_at,
        })
    }

    async fn find_coupon(&self, lookup: &CouponLookup) -> Result<Option<Coupon>> {
        match lookup {
            CouponLookup::QrToken(token) => self.coupon_repo.find_by_qr_token(token).await,
            CouponLookup::Code(code) => self.coupon_repo.find_by_code(code).await,
        }
    }
}
