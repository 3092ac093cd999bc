//! HTTP 请求处理器

pub mod history;
pub mod issue;
pub mod redeem;
pub mod validate;
