//! 发放服务
//!
//! 欢迎类场景的内部发放入口：校验活动与客户、生成券码和 QR 令牌，
//! 在单个事务内完成防重预检查和插入。预检查只提供友好报错，
//! 真正的防重闸门是"每活动每客户至多一张有效券"的部分唯一索引，
//! 并发重复发放的失败方由约束冲突翻译为 `BusinessRuleViolation`。

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use super::codes;
use super::dto::IssueCouponRequest;
use super::lifecycle;
use crate::error::{CouponError, Result};
use crate::models::Coupon;
use crate::repository::{CouponRepository, DirectoryRepository};

/// 发放服务
#[derive(Clone)]
pub struct IssueService {
    pool: PgPool,
}

impl IssueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 为客户发放一张优惠券
    ///
    /// 客户与活动必须属于同一租户。成功时返回已持久化的券
    /// （携带数据库分配的 ID）。
    #[instrument(skip(self, request), fields(campaign_id = request.campaign_id, customer_id = request.customer_id))]
    pub async fn issue(&self, request: IssueCouponRequest) -> Result<Coupon> {
        let repo = CouponRepository::new(self.pool.clone());
        let code = codes::generate_unique_code(&repo).await?;
        let qr_token = codes::generate_qr_token();

        let mut tx = self.pool.begin().await?;

        let campaign = DirectoryRepository::get_campaign_in_tx(&mut tx, request.campaign_id)
            .await?
            .ok_or(CouponError::CampaignNotFound(request.campaign_id))?;

        let customer = DirectoryRepository::get_customer_in_tx(&mut tx, request.customer_id)
            .await?
            .ok_or(CouponError::CustomerNotFound(request.customer_id))?;

        if customer.tenant_id != campaign.tenant_id {
            return Err(CouponError::BusinessRuleViolation(format!(
                "客户 {} 与活动 {} 不属于同一租户",
                customer.id, campaign.id
            )));
        }

        if CouponRepository::find_active_for_campaign_in_tx(&mut tx, campaign.id, customer.id)
            .await?
            .is_some()
        {
            return Err(CouponError::BusinessRuleViolation(format!(
                "客户 {} 在活动 {} 下已持有有效优惠券",
                customer.id, campaign.id
            )));
        }

        let now = Utc::now();
        let mut coupon = lifecycle::build_coupon(
            &campaign,
            customer.id,
            code,
            qr_token,
            request.activate_immediately,
            now,
        );

        coupon.id = CouponRepository::insert_in_tx(&mut tx, &coupon).await?;
        tx.commit().await?;

        info!(
            coupon_id = coupon.id,
            campaign_id = campaign.id,
            customer_id = customer.id,
            status = ?coupon.status,
            "优惠券发放成功"
        );

        Ok(coupon)
    }
}
