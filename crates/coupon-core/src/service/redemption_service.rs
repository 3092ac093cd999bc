//! 核销服务（写路径编排）
//!
//! 单个数据库事务覆盖"定位 + 检查 + 变更"的完整区间：
//!
//! 1. `FOR UPDATE` 行锁定位优惠券（不存在即收尾）
//! 2. 活动归属校验（租户不符不泄露券信息）
//! 3. 幂等检查（审计表已有记录则报告首次核销时间）
//! 4. 内存状态机流转（`lifecycle::redeem`）
//! 5. 权益用量原子扣减 + 金额计算（活动配置了权益时）
//! 6. 券状态落库 + 审计记录插入
//! 7. 提交；之后旁路更新活动统计（尽力而为，不影响结果）
//!
//! 任何一步失败整个事务回滚，券保持原状。并发核销同一张券时，
//! 行锁将后来者串行化；极端情况下（锁外竞争）审计表 `coupon_id`
//! 唯一约束兜底，失败方回滚后查出胜者的核销时间报告 `AlreadyRedeemed`。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::codes;
use super::dto::{CouponLookup, RedeemCouponRequest, RedemptionSuccess};
use super::{lifecycle, resolve_benefit_description};
use crate::error::{CouponError, Result};
use crate::models::{CouponRedemption, PromotionReward};
use crate::repository::traits::{DirectoryRepositoryTrait, RedemptionRepositoryTrait};
use crate::repository::{
    CouponRepository, DirectoryRepository, REDEMPTION_COUPON_UNIQUE, RedemptionRepository,
    RewardRepository, is_unique_violation,
};

/// 核销服务
#[derive(Clone)]
pub struct RedemptionService {
    pool: PgPool,
}

impl RedemptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 QR 令牌核销（扫码路径）
    pub async fn redeem_by_qr_token(
        &self,
        tenant_id: i64,
        qr_token: &str,
        request: RedeemCouponRequest,
    ) -> Result<RedemptionSuccess> {
        self.redeem(tenant_id, CouponLookup::QrToken(qr_token.to_string()), request)
            .await
    }

    /// 按券码核销（人工输入路径）
    pub async fn redeem_by_code(
        &self,
        tenant_id: i64,
        code: &str,
        request: RedeemCouponRequest,
    ) -> Result<RedemptionSuccess> {
        self.redeem(tenant_id, CouponLookup::Code(code.to_string()), request)
            .await
    }

    /// 核销一张优惠券
    ///
    /// 成功时返回面向收银台的结果对象；所有业务失败以 `CouponError`
    /// 返回且不产生任何持久化变更。
    #[instrument(skip(self, lookup, request), fields(tenant_id = tenant_id, channel = ?request.channel))]
    async fn redeem(
        &self,
        tenant_id: i64,
        lookup: CouponLookup,
        request: RedeemCouponRequest,
    ) -> Result<RedemptionSuccess> {
        let mut tx = self.pool.begin().await?;

        let mut coupon = match &lookup {
            CouponLookup::QrToken(token) => {
                CouponRepository::find_by_qr_token_for_update(&mut tx, token).await?
            }
            CouponLookup::Code(code) => {
                CouponRepository::find_by_code_for_update(&mut tx, code).await?
            }
        }
        .ok_or(CouponError::CouponNotFound)?;

        let campaign = DirectoryRepository::get_campaign_in_tx(&mut tx, coupon.campaign_id)
            .await?
            .ok_or(CouponError::CampaignNotFound(coupon.campaign_id))?;

        if campaign.tenant_id != tenant_id {
            warn!(
                coupon_id = coupon.id,
                campaign_id = campaign.id,
                "核销被拒：券不属于当前租户"
            );
            return Err(CouponError::TenantMismatch);
        }

        if let Some(existing) =
            RedemptionRepository::find_by_coupon_id_in_tx(&mut tx, coupon.id).await?
        {
            return Err(CouponError::AlreadyRedeemed {
                redeemed_at: existing.redeemed_at,
            });
        }

        let tenant_name = DirectoryRepository::get_tenant_in_tx(&mut tx, campaign.tenant_id)
            .await?
            .map(|t| t.name)
            .ok_or(CouponError::TenantNotFound(campaign.tenant_id))?;

        let customer_name = DirectoryRepository::get_customer_in_tx(&mut tx, coupon.customer_id)
            .await?
            .map(|c| c.display_name())
            .unwrap_or_else(|| format!("客户 {}", coupon.customer_id));

        let now = Utc::now();
        lifecycle::redeem(
            &mut coupon,
            Some(request.redeemed_by.clone()),
            request.metadata.clone(),
            now,
        )?;

        let reward = RewardRepository::find_by_campaign_in_tx(&mut tx, campaign.id).await?;
        let discount_amount =
            Self::consume_reward(&mut tx, reward.as_ref(), request.original_amount).await?;
        let benefit_description = resolve_benefit_description(&campaign, reward.as_ref());

        let final_amount = match (request.original_amount, discount_amount) {
            (Some(original), Some(discount)) => Some(original - discount),
            _ => None,
        };

        CouponRepository::update_in_tx(&mut tx, &coupon).await?;

        let redemption = CouponRedemption {
            id: codes::generate_redemption_id(),
            coupon_id: coupon.id,
            tenant_id,
            campaign_id: campaign.id,
            redeemed_by: request.redeemed_by,
            channel: request.channel,
            ip_address: request.ip_address,
            user_agent: request.user_agent,
            location: request.location,
            metadata: request.metadata,
            original_amount: request.original_amount,
            discount_amount,
            final_amount,
            redeemed_at: now,
        };

        if let Err(e) = RedemptionRepository::insert_in_tx(&mut tx, &redemption).await {
            if let CouponError::Database(db_err) = &e {
                if is_unique_violation(db_err, REDEMPTION_COUPON_UNIQUE) {
                    // 事务已不可用，回滚后用池连接查出胜者的真实核销时间
                    drop(tx);
                    return Err(self.already_redeemed_by_winner(coupon.id, now).await);
                }
            }
            return Err(e);
        }

        tx.commit().await?;

        info!(
            coupon_id = coupon.id,
            redemption_id = %redemption.id,
            campaign_id = campaign.id,
            "优惠券核销成功"
        );

        self.spawn_stats_update(campaign.id);

        Ok(RedemptionSuccess {
            redemption_id: redemption.id,
            coupon_id: coupon.id,
            coupon_code: coupon.code,
            campaign_id: campaign.id,
            campaign_name: campaign.name,
            tenant_name,
            customer_name,
            benefit_description,
            original_amount: request.original_amount,
            discount_amount,
            final_amount,
            redeemed_at: now,
        })
    }

    /// 在事务中消耗权益用量并计算优惠金额
    ///
    /// 活动未配置权益时不扣减，金额字段为空。设置了最低消费门槛
    /// 且携带了订单金额时，在扣减前检查门槛。
    async fn consume_reward(
        tx: &mut sqlx::PgConnection,
        reward: Option<&PromotionReward>,
        original_amount: Option<Decimal>,
    ) -> Result<Option<Decimal>> {
        let Some(reward) = reward else {
            return Ok(None);
        };

        if let (Some(min), Some(original)) = (reward.min_purchase_amount, original_amount) {
            if original < min {
                return Err(CouponError::BusinessRuleViolation(format!(
                    "订单金额 {original} 未达到权益最低消费门槛 {min}"
                )));
            }
        }

        let consumed = RewardRepository::try_increment_usage_in_tx(tx, reward.id).await?;
        if !consumed {
            return Err(CouponError::UsageLimitReached {
                reward_id: reward.id,
            });
        }

        let kind = reward.kind()?;
        Ok(original_amount.map(|original| kind.discount_for(original)))
    }

    /// 审计表唯一冲突后查出胜者，报告真实的首次核销时间
    async fn already_redeemed_by_winner(
        &self,
        coupon_id: i64,
        fallback: DateTime<Utc>,
    ) -> CouponError {
        let repo = RedemptionRepository::new(self.pool.clone());
        let redeemed_at = match repo.find_by_coupon_id(coupon_id).await {
            Ok(Some(winner)) => winner.redeemed_at,
            _ => fallback,
        };

        CouponError::AlreadyRedeemed { redeemed_at }
    }

    /// 旁路更新活动统计（尽力而为，失败只记日志）
    fn spawn_stats_update(&self, campaign_id: i64) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let repo = DirectoryRepository::new(pool);
            if let Err(e) = repo.increment_redemption_count(campaign_id).await {
                warn!(campaign_id, error = %e, "活动核销统计更新失败");
            }
        });
    }
}
