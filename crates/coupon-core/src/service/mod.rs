//! 业务服务层
//!
//! - `lifecycle`: 单张优惠券的状态机与转换规则
//! - `issue_service`: 发放（查重 + 生成码/令牌 + 事务插入）
//! - `redemption_service`: 核销编排（写路径，单事务）
//! - `validation_service`: 可核销性校验（只读路径）
//! - `usage_tracker`: 权益用量上限的原子扣减
//! - `codes`: 券码 / QR 令牌 / 审计短 ID 的生成

pub mod codes;
pub mod dto;
pub mod issue_service;
pub mod lifecycle;
pub mod redemption_service;
pub mod usage_tracker;
pub mod validation_service;

pub use issue_service::IssueService;
pub use redemption_service::RedemptionService;
pub use usage_tracker::UsageTracker;
pub use validation_service::ValidationService;

use crate::models::{CampaignSnapshot, PromotionReward};

/// 解析面向客户的权益描述
///
/// 权益描述 > 活动描述 > 活动名称
pub(crate) fn resolve_benefit_description(
    campaign: &CampaignSnapshot,
    reward: Option<&PromotionReward>,
) -> String {
    reward
        .and_then(|r| r.description.clone())
        .or_else(|| campaign.description.clone())
        .unwrap_or_else(|| campaign.name.clone())
}
