//! 外部协作方实体快照
//!
//! 租户 / 活动 / 客户由平台的外围 CRUD 子系统维护，核销引擎只按 ID
//! 查询只读快照，在单个请求的生命周期内视为不可变值。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 活动快照
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSnapshot {
    pub id: i64,
    /// 所属租户（商家）ID
    pub tenant_id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    #[sqlx(default)]
    pub start_date: Option<NaiveDate>,
    /// 活动结束日；发放时以该日 23:59:59 作为券的过期时间
    #[sqlx(default)]
    pub end_date: Option<NaiveDate>,
}

impl CampaignSnapshot {
    /// 活动结束日对应的券过期时间（当日 23:59:59 UTC）
    pub fn coupon_expiry(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
    }
}

/// 客户快照
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub id: i64,
    pub tenant_id: i64,
    pub first_name: String,
    #[sqlx(default)]
    pub last_name: Option<String>,
    #[sqlx(default)]
    pub email: Option<String>,
}

impl CustomerSnapshot {
    /// 展示用姓名
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// 租户快照
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantSnapshot {
    pub id: i64,
    pub name: String,
}
