//! 权益（奖励）配置实体定义
//!
//! 每个活动最多挂载一个权益配置；权益类型使用带标签的联合类型表达，
//! 各变体只携带自身相关的字段，由类型系统保证穷尽匹配。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// 权益类型（带标签联合）
///
/// 以 JSON 形式持久化在 `promotion_rewards.reward_config` 列中，
/// 标签为 `type` 字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardKind {
    /// 百分比折扣（value 为折扣百分比，如 15 表示 85 折）
    PercentDiscount { value: Decimal },
    /// 固定金额减免
    FixedAmount { value: Decimal },
    /// 免费商品
    FreeProduct { product_id: String },
    /// 买 X 赠 Y
    BuyXGetY {
        buy_quantity: i32,
        free_quantity: i32,
    },
    /// 自定义权益（配置结构由外部系统解释）
    Custom { config: Value },
}

impl RewardKind {
    /// 生成面向客户的权益描述
    pub fn describe(&self) -> String {
        match self {
            Self::PercentDiscount { value } => format!("{}% 折扣", value),
            Self::FixedAmount { value } => format!("立减 {}", value),
            Self::FreeProduct { product_id } => format!("免费商品: {}", product_id),
            Self::BuyXGetY {
                buy_quantity,
                free_quantity,
            } => format!("买 {} 赠 {}", buy_quantity, free_quantity),
            Self::Custom { .. } => "自定义权益".to_string(),
        }
    }

    /// 计算给定原始金额下的优惠金额
    ///
    /// 非金额类权益（免费商品 / 买赠 / 自定义）返回 0，
    /// 优惠金额不会超过原始金额。
    pub fn discount_for(&self, original_amount: Decimal) -> Decimal {
        let discount = match self {
            Self::PercentDiscount { value } => original_amount * *value / Decimal::from(100),
            Self::FixedAmount { value } => *value,
            Self::FreeProduct { .. } | Self::BuyXGetY { .. } | Self::Custom { .. } => {
                Decimal::ZERO
            }
        };
        discount.min(original_amount).max(Decimal::ZERO)
    }
}

/// 权益配置实体
///
/// 与活动 1:1 绑定；`usage_count` 单调递增，设置了 `usage_limit` 时
/// 永远不会超过上限（由数据库约束和原子扣减共同保证）。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PromotionReward {
    pub id: i64,
    /// 所属活动 ID（唯一）
    pub campaign_id: i64,
    /// 权益配置（JSON，RewardKind 的序列化形式）
    pub reward_config: Value,
    /// 权益描述（为空时回退到活动描述）
    #[sqlx(default)]
    pub description: Option<String>,
    /// 最低消费金额门槛
    #[sqlx(default)]
    pub min_purchase_amount: Option<Decimal>,
    /// 使用次数上限（为空表示不限量）
    #[sqlx(default)]
    pub usage_limit: Option<i32>,
    /// 已使用次数
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromotionReward {
    /// 解析权益类型
    pub fn kind(&self) -> Result<RewardKind> {
        Ok(serde_json::from_value(self.reward_config.clone())?)
    }

    /// 使用次数是否已达上限
    ///
    /// 不限量权益恒返回 false
    pub fn is_usage_limit_reached(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.usage_count >= limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;
    use serde_json::json;

    fn sample_reward(config: Value, usage_limit: Option<i32>, usage_count: i32) -> PromotionReward {
        let now = Utc::now();
        PromotionReward {
            id: 1,
            campaign_id: 10,
            reward_config: config,
            description: None,
            min_purchase_amount: None,
            usage_limit,
            usage_count,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reward_kind_tagged_serialization() {
        let kind = RewardKind::PercentDiscount {
            value: Decimal::from(15),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "PERCENT_DISCOUNT");

        let back: RewardKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn test_parse_kind_from_config() {
        let reward = sample_reward(
            json!({"type": "BUY_X_GET_Y", "buy_quantity": 2, "free_quantity": 1}),
            None,
            0,
        );
        let kind = reward.kind().unwrap();
        assert_eq!(
            kind,
            RewardKind::BuyXGetY {
                buy_quantity: 2,
                free_quantity: 1
            }
        );
    }

    #[test]
    fn test_parse_invalid_config_fails() {
        let reward = sample_reward(json!({"type": "UNKNOWN_KIND"}), None, 0);
        assert!(reward.kind().is_err());
    }

    #[test]
    fn test_percent_discount_amount() {
        let kind = RewardKind::PercentDiscount {
            value: Decimal::from(20),
        };
        let discount = kind.discount_for(Decimal::from(250));
        assert_eq!(discount, Decimal::from(50));
    }

    #[test]
    fn test_fixed_amount_capped_by_original() {
        let kind = RewardKind::FixedAmount {
            value: Decimal::from(100),
        };
        // 固定减免不会超过订单金额
        assert_eq!(
            kind.discount_for(Decimal::from_f64(30.5).unwrap()),
            Decimal::from_f64(30.5).unwrap()
        );
        assert_eq!(kind.discount_for(Decimal::from(200)), Decimal::from(100));
    }

    #[test]
    fn test_non_monetary_kinds_discount_zero() {
        let free = RewardKind::FreeProduct {
            product_id: "sku-1".to_string(),
        };
        assert_eq!(free.discount_for(Decimal::from(100)), Decimal::ZERO);

        let custom = RewardKind::Custom {
            config: json!({"points": 10}),
        };
        assert_eq!(custom.discount_for(Decimal::from(100)), Decimal::ZERO);
    }

    #[test]
    fn test_usage_limit_reached() {
        assert!(!sample_reward(json!({"type": "CUSTOM", "config": {}}), None, 1000)
            .is_usage_limit_reached());
        assert!(!sample_reward(json!({"type": "CUSTOM", "config": {}}), Some(5), 4)
            .is_usage_limit_reached());
        assert!(sample_reward(json!({"type": "CUSTOM", "config": {}}), Some(5), 5)
            .is_usage_limit_reached());
    }

    #[test]
    fn test_describe() {
        let kind = RewardKind::FreeProduct {
            product_id: "sku-42".to_string(),
        };
        assert!(kind.describe().contains("sku-42"));
    }
}
