//! 核销审计仓储
//!
//! 审计表仅追加：只有插入和查询，没有更新和删除。
//! `coupon_id` 上的唯一约束是"恰好核销一次"的权威闸门。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::traits::RedemptionRepositoryTrait;
use crate::error::Result;
use crate::models::CouponRedemption;

/// 审计表 `coupon_id` 唯一约束名
///
/// N 个并发核销中数据库只允许一个插入成功，失败方据此约束名
/// 被翻译为 `AlreadyRedeemed`。
pub const REDEMPTION_COUPON_UNIQUE: &str = "uq_coupon_redemptions_coupon_id";

const REDEMPTION_COLUMNS: &str = "id, coupon_id, tenant_id, campaign_id, redeemed_by, channel, \
     ip_address, user_agent, location, metadata, original_amount, discount_amount, final_amount, \
     redeemed_at";

/// 核销审计仓储
pub struct RedemptionRepository {
    pool: PgPool,
}

impl RedemptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务内操作 ====================

    /// 在事务中按券 ID 查找核销记录（幂等检查）
    pub async fn find_by_coupon_id_in_tx(
        tx: &mut PgConnection,
        coupon_id: i64,
    ) -> Result<Option<CouponRedemption>> {
        let redemption = sqlx::query_as::<_, CouponRedemption>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM coupon_redemptions WHERE coupon_id = $1"
        ))
        .bind(coupon_id)
        .fetch_optional(tx)
        .await?;

        Ok(redemption)
    }

    /// 在事务中写入核销记录
    ///
    /// 唯一冲突不在这里翻译：调用方需要用真实的首次核销时间构造
    /// `AlreadyRedeemed`，而失败事务内已无法查询。
    pub async fn insert_in_tx(tx: &mut PgConnection, redemption: &CouponRedemption) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO coupon_redemptions
                (id, coupon_id, tenant_id, campaign_id, redeemed_by, channel,
                 ip_address, user_agent, location, metadata, original_amount,
                 discount_amount, final_amount, redeemed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&redemption.id)
        .bind(redemption.coupon_id)
        .bind(redemption.tenant_id)
        .bind(redemption.campaign_id)
        .bind(&redemption.redeemed_by)
        .bind(redemption.channel)
        .bind(&redemption.ip_address)
        .bind(&redemption.user_agent)
        .bind(&redemption.location)
        .bind(&redemption.metadata)
        .bind(redemption.original_amount)
        .bind(redemption.discount_amount)
        .bind(redemption.final_amount)
        .bind(redemption.redeemed_at)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RedemptionRepositoryTrait for RedemptionRepository {
    async fn find_by_coupon_id(&self, coupon_id: i64) -> Result<Option<CouponRedemption>> {
        let redemption = sqlx::query_as::<_, CouponRedemption>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM coupon_redemptions WHERE coupon_id = $1"
        ))
        .bind(coupon_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redemption)
    }

    async fn list_by_tenant(&self, tenant_id: i64, limit: i64) -> Result<Vec<CouponRedemption>> {
        let redemptions = sqlx::query_as::<_, CouponRedemption>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM coupon_redemptions \
             WHERE tenant_id = $1 ORDER BY redeemed_at DESC LIMIT $2"
        ))
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }

    async fn list_by_campaign(
        &self,
        tenant_id: i64,
        campaign_id: i64,
    ) -> Result<Vec<CouponRedemption>> {
        let redemptions = sqlx::query_as::<_, CouponRedemption>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM coupon_redemptions \
             WHERE tenant_id = $1 AND campaign_id = $2 ORDER BY redeemed_at DESC"
        ))
        .bind(tenant_id)
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }

    async fn list_by_date_range(
        &self,
        tenant_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CouponRedemption>> {
        let redemptions = sqlx::query_as::<_, CouponRedemption>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM coupon_redemptions \
             WHERE tenant_id = $1 AND redeemed_at >= $2 AND redeemed_at <= $3 \
             ORDER BY redeemed_at DESC"
        ))
        .bind(tenant_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }

    async fn list_recent(&self, tenant_id: i64, limit: i64) -> Result<Vec<CouponRedemption>> {
        self.list_by_tenant(tenant_id, limit).await
    }
}
