//! 优惠券核心服务
//!
//! 实现多租户营销活动平台的优惠券生命周期与核销引擎：
//!
//! - **生命周期管理**：发放、过期、作废、核销的状态机与转换规则
//! - **核销编排**：租户归属校验、幂等核销、审计记录写入（单事务）
//! - **校验服务**：只读的可核销性判断，供前端在核销前展示状态
//! - **权益用量追踪**：使用上限的原子扣减，防止超发
//!
//! ## 并发模型
//!
//! 核销的恰好一次语义由审计表 `coupon_redemptions.coupon_id` 的唯一约束保证，
//! 优惠券行在核销事务内加 `FOR UPDATE` 行锁；权益用量扣减使用单条条件 UPDATE，
//! 不做先读后写。

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{CouponError, Result};
pub use models::{
    CampaignSnapshot, Coupon, CouponRedemption, CouponStatus, CustomerSnapshot, PromotionReward,
    RedemptionChannel, RewardKind, TenantSnapshot,
};
pub use repository::{
    CouponRepository, DirectoryRepository, RedemptionRepository, RewardRepository,
};
pub use service::{
    IssueService, RedemptionService, UsageTracker, ValidationService,
    dto::{CouponLookup, IssueCouponRequest, RedeemCouponRequest, RedemptionSuccess, ValidationOutcome},
};
