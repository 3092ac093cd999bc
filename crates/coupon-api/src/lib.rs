//! 优惠券核销 API 服务
//!
//! 面向商家收银台和客户端的 REST API：校验、核销、审计查询、
//! 内部发放，以及过期扫描 Worker。

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod worker;

pub use error::{ApiError, Result};
pub use state::AppState;
