//! 外部协作方仓储
//!
//! 租户 / 活动 / 客户由外围子系统维护，这里只做按 ID 的只读快照查询，
//! 以及成功核销后的活动计数自增（尽力而为的旁路通知）。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::DirectoryRepositoryTrait;
use crate::error::Result;
use crate::models::{CampaignSnapshot, CustomerSnapshot, TenantSnapshot};

/// 外部协作方仓储
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中按 ID 查找活动快照
    pub async fn get_campaign_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<CampaignSnapshot>> {
        let campaign = sqlx::query_as::<_, CampaignSnapshot>(
            "SELECT id, tenant_id, name, description, start_date, end_date \
             FROM campaigns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(campaign)
    }

    /// 在事务中按 ID 查找客户快照
    pub async fn get_customer_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<CustomerSnapshot>> {
        let customer = sqlx::query_as::<_, CustomerSnapshot>(
            "SELECT id, tenant_id, first_name, last_name, email FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(customer)
    }

    /// 在事务中按 ID 查找租户快照
    pub async fn get_tenant_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<TenantSnapshot>> {
        let tenant =
            sqlx::query_as::<_, TenantSnapshot>("SELECT id, name FROM tenants WHERE id = $1")
                .bind(id)
                .fetch_optional(tx)
                .await?;

        Ok(tenant)
    }
}

#[async_trait]
impl DirectoryRepositoryTrait for DirectoryRepository {
    async fn get_campaign(&self, id: i64) -> Result<Option<CampaignSnapshot>> {
        let campaign = sqlx::query_as::<_, CampaignSnapshot>(
            "SELECT id, tenant_id, name, description, start_date, end_date \
             FROM campaigns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(campaign)
    }

    async fn get_customer(&self, id: i64) -> Result<Option<CustomerSnapshot>> {
        let customer = sqlx::query_as::<_, CustomerSnapshot>(
            "SELECT id, tenant_id, first_name, last_name, email FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn get_tenant(&self, id: i64) -> Result<Option<TenantSnapshot>> {
        let tenant =
            sqlx::query_as::<_, TenantSnapshot>("SELECT id, name FROM tenants WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(tenant)
    }

    async fn increment_redemption_count(&self, campaign_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO campaign_stats (campaign_id, view_count, click_count, redemption_count)
            VALUES ($1, 0, 0, 1)
            ON CONFLICT (campaign_id)
            DO UPDATE SET redemption_count = campaign_stats.redemption_count + 1
            "#,
        )
        .bind(campaign_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
