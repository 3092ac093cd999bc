//! 优惠券仓储
//!
//! 提供优惠券的数据访问。核销路径上的读取走 `FOR UPDATE` 行锁版本，
//! 锁的持有范围覆盖"检查 + 变更"的完整区间。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::is_unique_violation;
use super::traits::CouponRepositoryTrait;
use crate::error::{CouponError, Result};
use crate::models::Coupon;

/// "每活动每客户至多一张有效券"的部分唯一索引名
///
/// 发放时的查重预检查只提供友好报错，真正的防重闸门是该索引。
pub const ACTIVE_COUPON_UNIQUE_INDEX: &str = "uq_coupons_active_per_customer";

const COUPON_COLUMNS: &str = "id, campaign_id, customer_id, code, qr_token, status, \
     expires_at, redeemed_at, redeemed_by, redemption_metadata, created_at, updated_at";

/// 优惠券仓储
pub struct CouponRepository {
    pool: PgPool,
}

impl CouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务内操作 ====================

    /// 在事务中按 QR 令牌查找并锁定优惠券
    pub async fn find_by_qr_token_for_update(
        tx: &mut PgConnection,
        qr_token: &str,
    ) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE qr_token = $1 FOR UPDATE"
        ))
        .bind(qr_token)
        .fetch_optional(tx)
        .await?;

        Ok(coupon)
    }

    /// 在事务中按券码查找并锁定优惠券
    pub async fn find_by_code_for_update(
        tx: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 FOR UPDATE"
        ))
        .bind(code)
        .fetch_optional(tx)
        .await?;

        Ok(coupon)
    }

    /// 在事务中插入新优惠券，返回新券 ID
    ///
    /// 命中"有效券唯一"部分索引时翻译为业务规则错误：
    /// 并发的重复发放只有一个事务能成功。
    pub async fn insert_in_tx(tx: &mut PgConnection, coupon: &Coupon) -> Result<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO coupons (campaign_id, customer_id, code, qr_token, status,
                                 expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(coupon.campaign_id)
        .bind(coupon.customer_id)
        .bind(&coupon.code)
        .bind(&coupon.qr_token)
        .bind(coupon.status)
        .bind(coupon.expires_at)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .fetch_one(tx)
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e, ACTIVE_COUPON_UNIQUE_INDEX) => {
                Err(CouponError::BusinessRuleViolation(format!(
                    "客户 {} 在活动 {} 下已持有有效优惠券",
                    coupon.customer_id, coupon.campaign_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 在事务中持久化优惠券的状态变更
    pub async fn update_in_tx(tx: &mut PgConnection, coupon: &Coupon) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE coupons
            SET status = $2, redeemed_at = $3, redeemed_by = $4,
                redemption_metadata = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(coupon.id)
        .bind(coupon.status)
        .bind(coupon.redeemed_at)
        .bind(&coupon.redeemed_by)
        .bind(&coupon.redemption_metadata)
        .bind(coupon.updated_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 在事务中查找客户在某活动下的有效券（预检查用）
    pub async fn find_active_for_campaign_in_tx(
        tx: &mut PgConnection,
        campaign_id: i64,
        customer_id: i64,
    ) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons \
             WHERE campaign_id = $1 AND customer_id = $2 \
               AND status IN ('CREATED', 'SENT', 'ACTIVE')"
        ))
        .bind(campaign_id)
        .bind(customer_id)
        .fetch_optional(tx)
        .await?;

        Ok(coupon)
    }
}

#[async_trait]
impl CouponRepositoryTrait for CouponRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn find_by_qr_token(&self, qr_token: &str) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE qr_token = $1"
        ))
        .bind(qr_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn find_active_for_campaign(
        &self,
        campaign_id: i64,
        customer_id: i64,
    ) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons \
             WHERE campaign_id = $1 AND customer_id = $2 \
               AND status IN ('CREATED', 'SENT', 'ACTIVE')"
        ))
        .bind(campaign_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM coupons WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    async fn update(&self, coupon: &Coupon) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE coupons
            SET status = $2, redeemed_at = $3, redeemed_by = $4,
                redemption_metadata = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(coupon.id)
        .bind(coupon.status)
        .bind(coupon.redeemed_at)
        .bind(&coupon.redeemed_by)
        .bind(&coupon.redemption_metadata)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
