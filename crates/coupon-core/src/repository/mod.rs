//! 数据访问层
//!
//! 服务层依赖 trait 抽象而非具体实现，便于 mock 测试；
//! 需要参与事务的操作以 `_in_tx` 关联函数形式提供，接收 `&mut PgConnection`。

mod coupon_repo;
mod directory_repo;
mod redemption_repo;
mod reward_repo;
pub mod traits;

pub use coupon_repo::{ACTIVE_COUPON_UNIQUE_INDEX, CouponRepository};
pub use directory_repo::DirectoryRepository;
pub use redemption_repo::{REDEMPTION_COUPON_UNIQUE, RedemptionRepository};
pub use reward_repo::RewardRepository;
pub use traits::{
    CouponRepositoryTrait, DirectoryRepositoryTrait, RedemptionRepositoryTrait,
    RewardRepositoryTrait,
};

/// 判断数据库错误是否为指定约束上的唯一冲突
///
/// 并发核销 / 发放的失败方通过该判断被翻译为业务错误，而不是
/// 作为通用数据库错误冒泡。
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
