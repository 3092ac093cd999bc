//! 优惠券实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 优惠券状态
///
/// 状态机：`CREATED → SENT → ACTIVE → {REDEEMED | EXPIRED | CANCELLED}`。
/// 欢迎券在创建时直接进入 ACTIVE；CANCELLED 可从任意非终态到达。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    /// 已创建 - 尚未送达客户
    #[default]
    Created,
    /// 已发送 - 已通过渠道送达客户
    Sent,
    /// 已激活 - 可被核销
    Active,
    /// 已核销 - 终态
    Redeemed,
    /// 已过期 - 终态
    Expired,
    /// 已作废 - 终态，可从任意非终态到达
    Cancelled,
}

impl CouponStatus {
    /// 是否为终态
    ///
    /// 任何操作都不能将优惠券转出终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Expired | Self::Cancelled)
    }
}

/// 优惠券实体
///
/// 一张券绑定一个活动和一个客户；`code` 供人工输入，`qr_token` 供扫码核销，
/// 两者全局唯一且一经分配不可变更。券不做物理删除，生命周期通过状态流转表达。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i64,
    /// 所属活动 ID
    pub campaign_id: i64,
    /// 持有客户 ID
    pub customer_id: i64,
    /// 人工输入码（12 位大写字母数字，全局唯一）
    pub code: String,
    /// 扫码核销令牌（128 位十六进制字符，不可由 code 推导）
    pub qr_token: String,
    pub status: CouponStatus,
    /// 过期时间（来自活动结束日 23:59:59；为空表示永不过期）
    #[sqlx(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// 核销时间，当且仅当 status == REDEEMED 时有值
    #[sqlx(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// 核销操作人（自由文本）
    #[sqlx(default)]
    pub redeemed_by: Option<String>,
    /// 核销附加信息（自由文本）
    #[sqlx(default)]
    pub redemption_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// 是否已过期
    ///
    /// 没有过期时间的券永不过期。一旦返回 true，时间不会倒流，
    /// 后续判断恒为 true。
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// 是否当前可核销（ACTIVE 且未过期）
    pub fn can_be_redeemed(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Active && !self.is_expired(now)
    }
}
