//! 优惠券过期扫描 Worker
//!
//! 定期将已过有效期的 ACTIVE 优惠券批量置为 EXPIRED。
//! 使用 `FOR UPDATE SKIP LOCKED` 保证多实例部署时不会重复处理，
//! 也不会与正在核销的行互相阻塞：核销事务持有行锁时本轮直接跳过，
//! 该行留给下一轮。

use std::time::Duration;

use coupon_shared::config::WorkerConfig;
use coupon_shared::observability::metrics;
use sqlx::PgPool;
use tracing::{error, info};

/// 过期扫描 Worker
///
/// 以固定间隔轮询数据库，设计为可在多实例环境中安全运行。
pub struct ExpireWorker {
    pool: PgPool,
    /// 轮询间隔
    poll_interval: Duration,
    /// 每批处理的最大记录数
    batch_size: i64,
}

impl ExpireWorker {
    pub fn new(pool: PgPool, poll_interval_secs: u64, batch_size: i64) -> Self {
        Self {
            pool,
            poll_interval: Duration::from_secs(poll_interval_secs),
            batch_size,
        }
    }

    /// 从 Worker 配置创建
    pub fn from_config(pool: PgPool, config: &WorkerConfig) -> Self {
        Self::new(
            pool,
            config.expire_poll_interval_seconds,
            config.expire_batch_size,
        )
    }

    /// 主循环：持续处理过期扫描直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            "ExpireWorker 已启动"
        );

        loop {
            match self.sweep_once().await {
                Ok(count) if count > 0 => {
                    info!(count, "过期优惠券已批量置为 EXPIRED");
                    metrics::record_expired(count);
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "过期扫描出错"),
            }

            // 记录 Worker 健康状态
            metrics::set_worker_last_run("expire_worker");

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 扫描一批并置为过期，返回处理数量
    ///
    /// 锁定与更新在同一事务内完成；同一批的行在提交前对其他
    /// 实例不可见（SKIP LOCKED），不会重复处理。
    pub async fn sweep_once(&self) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM coupons
            WHERE status = 'ACTIVE'
              AND expires_at IS NOT NULL
              AND expires_at < NOW()
            ORDER BY expires_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT $1
            "#,
        )
        .bind(self.batch_size)
        .fetch_all(&mut *tx)
        .await?;

        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET status = 'EXPIRED', updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
