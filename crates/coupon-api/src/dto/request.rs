//! API 请求体与查询参数定义

use chrono::{DateTime, Utc};
use coupon_core::models::RedemptionChannel;
use coupon_core::service::dto::{IssueCouponRequest, RedeemCouponRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// 商家侧接口的租户标识查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    pub tenant_id: i64,
}

/// 核销请求体
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemBody {
    /// 核销操作人（店员工号、系统账号等）
    #[validate(length(min = 1, max = 255, message = "redeemedBy 长度需在 1-255 之间"))]
    pub redeemed_by: String,
    /// 核销渠道，缺省时由路由决定（扫码路由默认 QR_ADMIN，券码路由默认 MANUAL）
    pub channel: Option<RedemptionChannel>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    pub metadata: Option<String>,
    /// 订单原始金额，提供时据此计算优惠和实付金额
    pub original_amount: Option<Decimal>,
}

impl RedeemBody {
    /// 转换为服务层请求，渠道缺省时使用路由默认值
    pub fn into_request(self, default_channel: RedemptionChannel) -> RedeemCouponRequest {
        RedeemCouponRequest {
            redeemed_by: self.redeemed_by,
            channel: self.channel.unwrap_or(default_channel),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            location: self.location,
            metadata: self.metadata,
            original_amount: self.original_amount,
        }
    }
}

/// 审计查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub tenant_id: i64,
    /// 返回条数，缺省 50，上限 200
    pub limit: Option<i64>,
}

impl HistoryQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
}

/// 按时间范围的审计查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub tenant_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// 内部发放请求体
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueBody {
    #[validate(range(min = 1, message = "campaignId 必须为正数"))]
    pub campaign_id: i64,
    #[validate(range(min = 1, message = "customerId 必须为正数"))]
    pub customer_id: i64,
    /// 创建即激活（欢迎类场景），缺省为 true
    #[serde(default = "default_activate")]
    pub activate_immediately: bool,
}

fn default_activate() -> bool {
    true
}

impl From<IssueBody> for IssueCouponRequest {
    fn from(body: IssueBody) -> Self {
        Self {
            campaign_id: body.campaign_id,
            customer_id: body.customer_id,
            activate_immediately: body.activate_immediately,
        }
    }
}
