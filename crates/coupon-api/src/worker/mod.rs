//! 后台 Worker

mod expire_worker;

pub use expire_worker::ExpireWorker;
