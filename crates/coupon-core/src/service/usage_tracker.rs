//! 权益用量追踪
//!
//! 用量上限的真正执行点在数据库的条件 UPDATE（见 `RewardRepository`），
//! 这里只是薄封装：把"未扣到"翻译为 `UsageLimitReached`，并提供
//! 只读的余量查询。

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{CouponError, Result};
use crate::models::PromotionReward;
use crate::repository::traits::RewardRepositoryTrait;

/// 权益用量追踪服务
#[derive(Clone)]
pub struct UsageTracker {
    reward_repo: Arc<dyn RewardRepositoryTrait>,
}

impl UsageTracker {
    pub fn new(reward_repo: Arc<dyn RewardRepositoryTrait>) -> Self {
        Self { reward_repo }
    }

    /// 消耗一次权益用量
    ///
    /// 扣减由单条条件 UPDATE 完成，并发扣减不会超限。
    /// 上限已满时返回 `UsageLimitReached`，不产生任何变更。
    #[instrument(skip(self))]
    pub async fn increment_usage(&self, reward_id: i64) -> Result<()> {
        let consumed = self.reward_repo.try_increment_usage(reward_id).await?;

        if !consumed {
            // 区分"不存在"与"已达上限"
            match self.reward_repo.find_by_id(reward_id).await? {
                Some(_) => return Err(CouponError::UsageLimitReached { reward_id }),
                None => return Err(CouponError::RewardNotFound(reward_id)),
            }
        }

        info!(reward_id, "权益用量扣减成功");
        Ok(())
    }

    /// 查询权益是否已达使用上限（只读，不保证随后扣减成功）
    pub async fn is_usage_limit_reached(&self, reward_id: i64) -> Result<bool> {
        let reward = self
            .reward_repo
            .find_by_id(reward_id)
            .await?
            .ok_or(CouponError::RewardNotFound(reward_id))?;

        Ok(reward.is_usage_limit_reached())
    }

    /// 查询活动配置的权益
    pub async fn reward_for_campaign(&self, campaign_id: i64) -> Result<Option<PromotionReward>> {
        self.reward_repo.find_by_campaign(campaign_id).await
    }
}
