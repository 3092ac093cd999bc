//! 服务层输入 / 输出对象
//!
//! 服务层不感知 HTTP：这里的类型由 API 层的请求对象转换而来，
//! 结果再由 API 层包装为响应体。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CouponStatus, RedemptionChannel};

/// 核销目标的定位方式
///
/// 扫码路径携带 QR 令牌，人工路径携带券码，两者互斥。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponLookup {
    /// 按 QR 令牌（扫码核销）
    QrToken(String),
    /// 按券码（人工输入）
    Code(String),
}

/// 核销请求
///
/// 租户和定位方式由入口方法单独携带，这里只是请求正文。
#[derive(Debug, Clone, Default)]
pub struct RedeemCouponRequest {
    /// 核销操作人（店员工号、系统账号等自由文本）
    pub redeemed_by: String,
    pub channel: RedemptionChannel,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
    pub metadata: Option<String>,
    /// 订单原始金额，提供时据此计算优惠和实付金额
    pub original_amount: Option<Decimal>,
}

/// 核销成功结果
///
/// 面向收银台展示：除标识信息外附带权益描述和金额拆分。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionSuccess {
    /// 核销审计记录短 ID
    pub redemption_id: String,
    pub coupon_id: i64,
    pub coupon_code: String,
    pub campaign_id: i64,
    pub campaign_name: String,
    pub tenant_name: String,
    /// 持券客户展示名
    pub customer_name: String,
    /// 权益描述（权益未配置描述时回退为活动描述，再回退为活动名称）
    pub benefit_description: String,
    pub original_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub redeemed_at: DateTime<Utc>,
}

/// 校验结果
///
/// 只读路径的产物：校验失败不是错误，是一种正常的业务结论，
/// 所以用枚举而不是 `Err` 表达。变体顺序即判定优先级。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationOutcome {
    /// 可核销
    #[serde(rename_all = "camelCase")]
    Valid {
        coupon_id: i64,
        coupon_code: String,
        campaign_id: i64,
        campaign_name: String,
        tenant_name: String,
        customer_name: String,
        benefit_description: String,
        expires_at: Option<DateTime<Utc>>,
    },
    /// 券不存在
    NotFound,
    /// 券不属于当前租户（不泄露任何券信息）
    TenantMismatch,
    /// 已核销
    #[serde(rename_all = "camelCase")]
    AlreadyRedeemed { redeemed_at: DateTime<Utc> },
    /// 已过期
    #[serde(rename_all = "camelCase")]
    Expired { expires_at: DateTime<Utc> },
    /// 状态不可核销（未激活或已作废）
    #[serde(rename_all = "camelCase")]
    NotAvailable { status: CouponStatus },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// 机读结论码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "VALID",
            Self::NotFound => "COUPON_NOT_FOUND",
            Self::TenantMismatch => "TENANT_MISMATCH",
            Self::AlreadyRedeemed { .. } => "ALREADY_REDEEMED",
            Self::Expired { .. } => "EXPIRED",
            Self::NotAvailable { .. } => "NOT_AVAILABLE",
        }
    }

    /// 人读说明
    ///
    /// 归属不匹配时与"不存在"同样不透露细节
    pub fn message(&self) -> String {
        match self {
            Self::Valid { .. } => "优惠券可以核销".to_string(),
            Self::NotFound => "优惠券不存在".to_string(),
            Self::TenantMismatch => "优惠券不存在或不属于当前商家".to_string(),
            Self::AlreadyRedeemed { redeemed_at } => {
                format!("优惠券已于 {} 核销", redeemed_at.format("%Y-%m-%d %H:%M:%S"))
            }
            Self::Expired { expires_at } => {
                format!("优惠券已于 {} 过期", expires_at.format("%Y-%m-%d %H:%M:%S"))
            }
            Self::NotAvailable { status } => format!("优惠券当前状态不可核销: {status:?}"),
        }
    }
}

/// 发放请求
#[derive(Debug, Clone)]
pub struct IssueCouponRequest {
    pub campaign_id: i64,
    pub customer_id: i64,
    /// 创建即激活（欢迎类场景），跳过 SENT 环节
    pub activate_immediately: bool,
}
