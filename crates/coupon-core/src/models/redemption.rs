//! 核销审计记录实体定义
//!
//! 核销记录是仅追加的审计事实：每张券至多一行（`coupon_id` 唯一约束），
//! 这一约束是"恰好核销一次"的真正执行点，独立于券自身的状态字段。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 核销渠道
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionChannel {
    /// 客户扫码（C 端网页）
    #[default]
    QrWeb,
    /// 商家扫码（B 端后台）
    QrAdmin,
    /// 人工输入券码
    Manual,
    /// 开放 API 调用
    Api,
}

impl RedemptionChannel {
    /// 持久化 / 指标标签用的规范名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QrWeb => "QR_WEB",
            Self::QrAdmin => "QR_ADMIN",
            Self::Manual => "MANUAL",
            Self::Api => "API",
        }
    }
}

/// 核销审计记录
///
/// 创建后不再更新或删除。主键为 10 位无元音字母数字短 ID，
/// 避免随机生成出冒犯性字符串。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CouponRedemption {
    /// 短 ID（10 位无元音字母数字）
    pub id: String,
    /// 被核销的优惠券 ID（唯一约束，恰好一次的执行点）
    pub coupon_id: i64,
    pub tenant_id: i64,
    pub campaign_id: i64,
    /// 核销操作人
    pub redeemed_by: String,
    pub channel: RedemptionChannel,
    #[sqlx(default)]
    pub ip_address: Option<String>,
    #[sqlx(default)]
    pub user_agent: Option<String>,
    #[sqlx(default)]
    pub location: Option<String>,
    #[sqlx(default)]
    pub metadata: Option<String>,
    /// 原始金额（可选的财务字段）
    #[sqlx(default)]
    pub original_amount: Option<Decimal>,
    /// 优惠金额
    #[sqlx(default)]
    pub discount_amount: Option<Decimal>,
    /// 实付金额
    #[sqlx(default)]
    pub final_amount: Option<Decimal>,
    pub redeemed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serialization() {
        assert_eq!(
            serde_json::to_value(RedemptionChannel::QrWeb).unwrap(),
            "QR_WEB"
        );
        assert_eq!(
            serde_json::to_value(RedemptionChannel::QrAdmin).unwrap(),
            "QR_ADMIN"
        );

        let back: RedemptionChannel = serde_json::from_value("MANUAL".into()).unwrap();
        assert_eq!(back, RedemptionChannel::Manual);
    }

    #[test]
    fn test_redemption_serialization_shape() {
        let redemption = CouponRedemption {
            id: "BCDFGHJKLM".to_string(),
            coupon_id: 1,
            tenant_id: 2,
            campaign_id: 3,
            redeemed_by: "clerk-01".to_string(),
            channel: RedemptionChannel::Api,
            ip_address: None,
            user_agent: None,
            location: Some("门店 A".to_string()),
            metadata: None,
            original_amount: None,
            discount_amount: None,
            final_amount: None,
            redeemed_at: Utc::now(),
        };

        let json = serde_json::to_value(&redemption).unwrap();
        assert_eq!(json["couponId"], 1);
        assert_eq!(json["channel"], "API");
        assert_eq!(json["redeemedBy"], "clerk-01");
    }
}
