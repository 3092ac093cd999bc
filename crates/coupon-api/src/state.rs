//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use coupon_core::repository::{
    CouponRepository, DirectoryRepository, RedemptionRepository, RewardRepository,
};
use coupon_core::service::{IssueService, RedemptionService, ValidationService};
use sqlx::PgPool;

/// Axum 应用共享状态
///
/// 服务实例在启动时装配一次，通过 Clone 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// 只读校验服务
    pub validation_service: ValidationService,
    /// 核销服务（写路径）
    pub redemption_service: RedemptionService,
    /// 发放服务
    pub issue_service: IssueService,
    /// 核销审计查询
    pub redemption_repo: Arc<RedemptionRepository>,
}

impl AppState {
    /// 装配全部服务
    pub fn new(pool: PgPool) -> Self {
        let validation_service = ValidationService::new(
            Arc::new(CouponRepository::new(pool.clone())),
            Arc::new(RedemptionRepository::new(pool.clone())),
            Arc::new(RewardRepository::new(pool.clone())),
            Arc::new(DirectoryRepository::new(pool.clone())),
        );

        Self {
            validation_service,
            redemption_service: RedemptionService::new(pool.clone()),
            issue_service: IssueService::new(pool.clone()),
            redemption_repo: Arc::new(RedemptionRepository::new(pool.clone())),
            pool,
        }
    }
}
