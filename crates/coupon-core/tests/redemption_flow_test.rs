//! 核销流程集成测试
//!
//! 使用真实 PostgreSQL 测试核销服务的完整事务流程。
//! RedemptionService 内部通过 sqlx 直接操作数据库（行锁 + 唯一约束），
//! 无法通过纯 mock 覆盖，因此需要集成测试。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test --test redemption_flow_test -- --ignored
//! ```

use chrono::{Duration, Utc};
use coupon_core::error::CouponError;
use coupon_core::models::RedemptionChannel;
use coupon_core::service::dto::RedeemCouponRequest;
use coupon_core::service::RedemptionService;
use rust_decimal::Decimal;
use sqlx::PgPool;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

fn sample_request() -> RedeemCouponRequest {
    RedeemCouponRequest {
        redeemed_by: "clerk-001".to_string(),
        channel: RedemptionChannel::QrAdmin,
        ip_address: Some("10.0.0.1".to_string()),
        user_agent: None,
        location: Some("门店 A".to_string()),
        metadata: None,
        original_amount: None,
    }
}

/// 插入测试租户 / 活动 / 客户（幂等）
async fn seed_directory(pool: &PgPool, tenant_id: i64, campaign_id: i64, customer_id: i64) {
    sqlx::query(
        r#"
        INSERT INTO tenants (id, name)
        VALUES ($1, 'RedemptionTest Tenant')
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(tenant_id)
    .execute(pool)
    .await
    .expect("插入测试租户失败");

    sqlx::query(
        r#"
        INSERT INTO campaigns (id, tenant_id, name, description, start_date, end_date)
        VALUES ($1, $2, 'RedemptionTest Campaign', '测试活动', CURRENT_DATE,
                CURRENT_DATE + INTERVAL '30 days')
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(campaign_id)
    .bind(tenant_id)
    .execute(pool)
    .await
    .expect("插入测试活动失败");

    sqlx::query(
        r#"
        INSERT INTO customers (id, tenant_id, first_name, last_name, email)
        VALUES ($1, $2, '三', '张', 'zhangsan@example.com')
        ON CONFLICT (id) DO UPDATE SET first_name = EXCLUDED.first_name
        "#,
    )
    .bind(customer_id)
    .bind(tenant_id)
    .execute(pool)
    .await
    .expect("插入测试客户失败");
}

/// 插入一张可核销的测试券，返回券 ID
async fn seed_active_coupon(
    pool: &PgPool,
    campaign_id: i64,
    customer_id: i64,
    code: &str,
    qr_token: &str,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO coupons (campaign_id, customer_id, code, qr_token, status,
                             expires_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'ACTIVE', NOW() + INTERVAL '7 days', NOW(), NOW())
        RETURNING id
        "#,
    )
    .bind(campaign_id)
    .bind(customer_id)
    .bind(code)
    .bind(qr_token)
    .fetch_one(pool)
    .await
    .expect("插入测试优惠券失败")
}

/// 插入活动权益配置
async fn seed_reward(pool: &PgPool, reward_id: i64, campaign_id: i64, usage_limit: Option<i32>) {
    sqlx::query(
        r#"
        INSERT INTO promotion_rewards (id, campaign_id, reward_config, description,
                                       usage_limit, usage_count, created_at, updated_at)
        VALUES ($1, $2, '{"type": "PERCENT_DISCOUNT", "value": "20"}', '八折优惠',
                $3, 0, NOW(), NOW())
        ON CONFLICT (id) DO UPDATE SET usage_limit = EXCLUDED.usage_limit, usage_count = 0
        "#,
    )
    .bind(reward_id)
    .bind(campaign_id)
    .bind(usage_limit)
    .execute(pool)
    .await
    .expect("插入测试权益失败");
}

/// 清理测试数据（按外键依赖逆序）
async fn cleanup(pool: &PgPool, tenant_id: i64, campaign_id: i64, customer_id: i64) {
    for sql in [
        "DELETE FROM coupon_redemptions WHERE campaign_id = $1",
        "DELETE FROM coupons WHERE campaign_id = $1",
        "DELETE FROM promotion_rewards WHERE campaign_id = $1",
        "DELETE FROM campaign_stats WHERE campaign_id = $1",
    ] {
        sqlx::query(sql).bind(campaign_id).execute(pool).await.ok();
    }
    sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(customer_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM campaigns WHERE id = $1")
        .bind(campaign_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .execute(pool)
        .await
        .ok();
}

async fn coupon_status(pool: &PgPool, coupon_id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM coupons WHERE id = $1")
        .bind(coupon_id)
        .fetch_one(pool)
        .await
        .expect("查询优惠券状态失败")
}

async fn audit_row_count(pool: &PgPool, coupon_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = $1")
        .bind(coupon_id)
        .fetch_one(pool)
        .await
        .expect("查询审计记录数失败")
}

// ==================== 测试用例 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_redeem_active_coupon_success() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let (tenant_id, campaign_id, customer_id) = (88001, 88001, 88001);
    seed_directory(&pool, tenant_id, campaign_id, customer_id).await;
    let coupon_id = seed_active_coupon(
        &pool,
        campaign_id,
        customer_id,
        "RDTEST000001",
        &"1".repeat(128),
    )
    .await;

    let service = RedemptionService::new(pool.clone());
    let success = service
        .redeem_by_qr_token(tenant_id, &"1".repeat(128), sample_request())
        .await
        .expect("核销应成功");

    assert_eq!(success.coupon_id, coupon_id);
    assert_eq!(success.coupon_code, "RDTEST000001");
    assert_eq!(success.campaign_name, "RedemptionTest Campaign");
    assert_eq!(success.customer_name, "三 张");
    assert_eq!(success.redemption_id.len(), 10);

    assert_eq!(coupon_status(&pool, coupon_id).await, "REDEEMED");
    assert_eq!(audit_row_count(&pool, coupon_id).await, 1);

    cleanup(&pool, tenant_id, campaign_id, customer_id).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_redeem_with_reward_computes_discount() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let (tenant_id, campaign_id, customer_id) = (88002, 88002, 88002);
    seed_directory(&pool, tenant_id, campaign_id, customer_id).await;
    seed_reward(&pool, 88002, campaign_id, Some(100)).await;
    seed_active_coupon(
        &pool,
        campaign_id,
        customer_id,
        "RDTEST000002",
        &"2".repeat(128),
    )
    .await;

    let mut request = sample_request();
    request.original_amount = Some(Decimal::from(250));

    let service = RedemptionService::new(pool.clone());
    let success = service
        .redeem_by_qr_token(tenant_id, &"2".repeat(128), request)
        .await
        .expect("核销应成功");

    // 20% 折扣：250 - 50 = 200
    assert_eq!(success.discount_amount, Some(Decimal::from(50)));
    assert_eq!(success.final_amount, Some(Decimal::from(200)));
    assert_eq!(success.benefit_description, "八折优惠");

    let usage_count: i32 =
        sqlx::query_scalar("SELECT usage_count FROM promotion_rewards WHERE id = 88002")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(usage_count, 1);

    cleanup(&pool, tenant_id, campaign_id, customer_id).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_concurrent_redemptions_exactly_once() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let (tenant_id, campaign_id, customer_id) = (88003, 88003, 88003);
    seed_directory(&pool, tenant_id, campaign_id, customer_id).await;
    let coupon_id = seed_active_coupon(
        &pool,
        campaign_id,
        customer_id,
        "RDTEST000003",
        &"3".repeat(128),
    )
    .await;

    let service = RedemptionService::new(pool.clone());
    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let mut request = sample_request();
            request.redeemed_by = format!("clerk-{i:03}");
            service
                .redeem_by_qr_token(tenant_id, &"3".repeat(128), request)
                .await
        }));
    }

    let mut successes = 0;
    let mut already_redeemed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(CouponError::AlreadyRedeemed { .. }) => already_redeemed += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    // 恰好一次：1 个成功，其余全部 AlreadyRedeemed，审计表恰好一行
    assert_eq!(successes, 1);
    assert_eq!(already_redeemed, 7);
    assert_eq!(audit_row_count(&pool, coupon_id).await, 1);
    assert_eq!(coupon_status(&pool, coupon_id).await, "REDEEMED");

    cleanup(&pool, tenant_id, campaign_id, customer_id).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_redeem_foreign_tenant_rejected() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let (tenant_id, campaign_id, customer_id) = (88004, 88004, 88004);
    seed_directory(&pool, tenant_id, campaign_id, customer_id).await;
    let coupon_id = seed_active_coupon(
        &pool,
        campaign_id,
        customer_id,
        "RDTEST000004",
        &"4".repeat(128),
    )
    .await;

    let service = RedemptionService::new(pool.clone());
    let err = service
        .redeem_by_qr_token(tenant_id + 1, &"4".repeat(128), sample_request())
        .await
        .unwrap_err();

    assert!(matches!(err, CouponError::TenantMismatch));
    // 失败路径无副作用
    assert_eq!(coupon_status(&pool, coupon_id).await, "ACTIVE");
    assert_eq!(audit_row_count(&pool, coupon_id).await, 0);

    cleanup(&pool, tenant_id, campaign_id, customer_id).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_redeem_expired_coupon_rejected() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let (tenant_id, campaign_id, customer_id) = (88005, 88005, 88005);
    seed_directory(&pool, tenant_id, campaign_id, customer_id).await;
    let coupon_id = seed_active_coupon(
        &pool,
        campaign_id,
        customer_id,
        "RDTEST000005",
        &"5".repeat(128),
    )
    .await;
    sqlx::query("UPDATE coupons SET expires_at = $2 WHERE id = $1")
        .bind(coupon_id)
        .bind(Utc::now() - Duration::days(1))
        .execute(&pool)
        .await
        .unwrap();

    let service = RedemptionService::new(pool.clone());
    let err = service
        .redeem_by_qr_token(tenant_id, &"5".repeat(128), sample_request())
        .await
        .unwrap_err();

    assert!(matches!(err, CouponError::Expired { .. }));
    assert_eq!(coupon_status(&pool, coupon_id).await, "ACTIVE");

    cleanup(&pool, tenant_id, campaign_id, customer_id).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_second_redemption_reports_original_timestamp() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let (tenant_id, campaign_id, customer_id) = (88006, 88006, 88006);
    seed_directory(&pool, tenant_id, campaign_id, customer_id).await;
    seed_active_coupon(
        &pool,
        campaign_id,
        customer_id,
        "RDTEST000006",
        &"6".repeat(128),
    )
    .await;

    let service = RedemptionService::new(pool.clone());
    let first = service
        .redeem_by_code(tenant_id, "RDTEST000006", sample_request())
        .await
        .expect("首次核销应成功");

    let err = service
        .redeem_by_code(tenant_id, "RDTEST000006", sample_request())
        .await
        .unwrap_err();

    match err {
        CouponError::AlreadyRedeemed { redeemed_at } => {
            // 数据库时间戳为微秒精度，允许亚毫秒误差
            let delta = (redeemed_at - first.redeemed_at).num_milliseconds().abs();
            assert!(delta < 1, "报告的核销时间应为首次核销时间");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    cleanup(&pool, tenant_id, campaign_id, customer_id).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_redeem_missing_coupon() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let service = RedemptionService::new(pool.clone());

    let err = service
        .redeem_by_qr_token(1, &"f".repeat(128), sample_request())
        .await
        .unwrap_err();
    assert!(matches!(err, CouponError::CouponNotFound));
}
