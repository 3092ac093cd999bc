//! 权益仓储
//!
//! 用量扣减使用单条条件 UPDATE 完成"检查 + 自增"，单次数据库往返内
//! 即是原子的，不存在先读后写的窗口。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::RewardRepositoryTrait;
use crate::error::Result;
use crate::models::PromotionReward;

const REWARD_COLUMNS: &str = "id, campaign_id, reward_config, description, min_purchase_amount, \
     usage_limit, usage_count, created_at, updated_at";

const CONSUME_USAGE_SQL: &str = r#"
    UPDATE promotion_rewards
    SET usage_count = usage_count + 1, updated_at = NOW()
    WHERE id = $1
      AND (usage_limit IS NULL OR usage_count < usage_limit)
"#;

/// 权益仓储
pub struct RewardRepository {
    pool: PgPool,
}

impl RewardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中原子扣减一次使用量
    ///
    /// 返回 false 表示已达上限（或权益不存在），未做任何变更
    pub async fn try_increment_usage_in_tx(tx: &mut PgConnection, reward_id: i64) -> Result<bool> {
        let result = sqlx::query(CONSUME_USAGE_SQL)
            .bind(reward_id)
            .execute(tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 在事务中按活动查找权益
    pub async fn find_by_campaign_in_tx(
        tx: &mut PgConnection,
        campaign_id: i64,
    ) -> Result<Option<PromotionReward>> {
        let reward = sqlx::query_as::<_, PromotionReward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM promotion_rewards WHERE campaign_id = $1"
        ))
        .bind(campaign_id)
        .fetch_optional(tx)
        .await?;

        Ok(reward)
    }
}

#[async_trait]
impl RewardRepositoryTrait for RewardRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<PromotionReward>> {
        let reward = sqlx::query_as::<_, PromotionReward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM promotion_rewards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    async fn find_by_campaign(&self, campaign_id: i64) -> Result<Option<PromotionReward>> {
        let reward = sqlx::query_as::<_, PromotionReward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM promotion_rewards WHERE campaign_id = $1"
        ))
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    async fn try_increment_usage(&self, reward_id: i64) -> Result<bool> {
        let result = sqlx::query(CONSUME_USAGE_SQL)
            .bind(reward_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
