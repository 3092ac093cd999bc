//! 实体模型定义
//!
//! 所有实体都支持数据库（sqlx）和 JSON（serde）序列化。
//! 活动 / 客户 / 租户来自外部协作方，在请求期间作为不可变快照使用，
//! 不建模为双向关联。

mod coupon;
mod directory;
mod redemption;
mod reward;

pub use coupon::{Coupon, CouponStatus};
pub use directory::{CampaignSnapshot, CustomerSnapshot, TenantSnapshot};
pub use redemption::{CouponRedemption, RedemptionChannel};
pub use reward::{PromotionReward, RewardKind};
