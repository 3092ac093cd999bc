//! API 请求 / 响应 DTO 定义

pub mod request;
pub mod response;

pub use request::{DateRangeQuery, HistoryQuery, IssueBody, RedeemBody, TenantQuery};
pub use response::{ApiResponse, CouponSummary, IssuedCouponDto, ValidationResponse};
