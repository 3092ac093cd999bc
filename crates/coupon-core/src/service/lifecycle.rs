//! 优惠券状态机
//!
//! 所有状态转换集中在这里，纯函数实现，不触碰数据库。
//! 服务层在事务内取得行锁后调用这些函数完成内存中的流转，
//! 再将结果持久化。
//!
//! 合法转换：
//! - `CREATED → SENT`（送达客户）
//! - `SENT → ACTIVE`（客户激活）
//! - `ACTIVE → REDEEMED`（核销）
//! - `ACTIVE → EXPIRED`（过期扫描）
//! - `CREATED | SENT | ACTIVE → CANCELLED`（人工作废）
//!
//! 终态一经进入不可转出。

use chrono::{DateTime, Utc};

use crate::error::{CouponError, Result};
use crate::models::{CampaignSnapshot, Coupon, CouponStatus};

/// 创建一张新券的内存表示（尚未持久化，`id` 为占位值）
///
/// 欢迎类场景传 `activate_immediately = true`，券直接以 ACTIVE 状态落库，
/// 跳过 SENT 环节。过期时间取活动结束日的最后一秒。
pub fn build_coupon(
    campaign: &CampaignSnapshot,
    customer_id: i64,
    code: String,
    qr_token: String,
    activate_immediately: bool,
    now: DateTime<Utc>,
) -> Coupon {
    let status = if activate_immediately {
        CouponStatus::Active
    } else {
        CouponStatus::Created
    };

    Coupon {
        id: 0,
        campaign_id: campaign.id,
        customer_id,
        code,
        qr_token,
        status,
        expires_at: campaign.coupon_expiry(),
        redeemed_at: None,
        redeemed_by: None,
        redemption_metadata: None,
        created_at: now,
        updated_at: now,
    }
}

/// 标记为已发送（CREATED → SENT）
pub fn mark_sent(coupon: &mut Coupon, now: DateTime<Utc>) -> Result<()> {
    if coupon.status != CouponStatus::Created {
        return Err(CouponError::InvalidState {
            status: coupon.status,
        });
    }

    coupon.status = CouponStatus::Sent;
    coupon.updated_at = now;
    Ok(())
}

/// 激活（SENT → ACTIVE）
pub fn activate(coupon: &mut Coupon, now: DateTime<Utc>) -> Result<()> {
    if coupon.status != CouponStatus::Sent {
        return Err(CouponError::InvalidState {
            status: coupon.status,
        });
    }

    coupon.status = CouponStatus::Active;
    coupon.updated_at = now;
    Ok(())
}

/// 核销（ACTIVE → REDEEMED）
///
/// 检查顺序固定：先排除已核销，再排除过期，最后要求 ACTIVE。
/// 同一张过期的已核销券报告的是"已核销"而非"已过期"。
pub fn redeem(
    coupon: &mut Coupon,
    redeemed_by: Option<String>,
    metadata: Option<String>,
    now: DateTime<Utc>,
) -> Result<()> {
    if coupon.status == CouponStatus::Redeemed {
        return Err(CouponError::AlreadyRedeemed {
            redeemed_at: coupon.redeemed_at.unwrap_or(coupon.updated_at),
        });
    }

    if coupon.is_expired(now) {
        return Err(CouponError::Expired {
            // is_expired 为 true 时 expires_at 必然有值
            expires_at: coupon.expires_at.unwrap_or(now),
        });
    }

    if coupon.status != CouponStatus::Active {
        return Err(CouponError::InvalidState {
            status: coupon.status,
        });
    }

    coupon.status = CouponStatus::Redeemed;
    coupon.redeemed_at = Some(now);
    coupon.redeemed_by = redeemed_by;
    coupon.redemption_metadata = metadata;
    coupon.updated_at = now;
    Ok(())
}

/// 作废（任意非终态 → CANCELLED）
pub fn cancel(coupon: &mut Coupon, now: DateTime<Utc>) -> Result<()> {
    if coupon.status.is_terminal() {
        return Err(CouponError::InvalidState {
            status: coupon.status,
        });
    }

    coupon.status = CouponStatus::Cancelled;
    coupon.updated_at = now;
    Ok(())
}

/// 标记为已过期（ACTIVE → EXPIRED）
///
/// 仅供过期扫描调用；要求 `expires_at` 确已过去。
/// CREATED / SENT 的券不经过这条转换，作废走 `cancel`。
pub fn mark_expired(coupon: &mut Coupon, now: DateTime<Utc>) -> Result<()> {
    if coupon.status != CouponStatus::Active {
        return Err(CouponError::InvalidState {
            status: coupon.status,
        });
    }

    if !coupon.is_expired(now) {
        return Err(CouponError::BusinessRuleViolation(format!(
            "优惠券 {} 尚未到期，不能标记为过期",
            coupon.id
        )));
    }

    coupon.status = CouponStatus::Expired;
    coupon.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn campaign() -> CampaignSnapshot {
        CampaignSnapshot {
            id: 10,
            tenant_id: 1,
            name: "夏季大促".to_string(),
            description: None,
            start_date: Some(Utc::now().date_naive() - Duration::days(30)),
            end_date: Some(Utc::now().date_naive() + Duration::days(30)),
        }
    }

    fn coupon_in(status: CouponStatus) -> Coupon {
        let now = Utc::now();
        let mut c = build_coupon(
            &campaign(),
            20,
            "ABCD1234EFGH".to_string(),
            "0".repeat(128),
            false,
            now,
        );
        c.id = 1;
        c.status = status;
        if status == CouponStatus::Redeemed {
            c.redeemed_at = Some(now - Duration::hours(1));
        }
        c
    }

    #[test]
    fn test_build_coupon_default_status() {
        let c = build_coupon(
            &campaign(),
            20,
            "ABCD1234EFGH".into(),
            "0".repeat(128),
            false,
            Utc::now(),
        );
        assert_eq!(c.status, CouponStatus::Created);
        assert!(c.expires_at.is_some());
    }

    #[test]
    fn test_build_coupon_immediate_activation() {
        let c = build_coupon(
            &campaign(),
            20,
            "ABCD1234EFGH".into(),
            "0".repeat(128),
            true,
            Utc::now(),
        );
        assert_eq!(c.status, CouponStatus::Active);
    }

    #[test]
    fn test_happy_path_transitions() {
        let now = Utc::now();
        let mut c = coupon_in(CouponStatus::Created);

        mark_sent(&mut c, now).unwrap();
        assert_eq!(c.status, CouponStatus::Sent);

        activate(&mut c, now).unwrap();
        assert_eq!(c.status, CouponStatus::Active);

        redeem(&mut c, Some("店员-001".into()), None, now).unwrap();
        assert_eq!(c.status, CouponStatus::Redeemed);
        assert_eq!(c.redeemed_at, Some(now));
        assert_eq!(c.redeemed_by.as_deref(), Some("店员-001"));
    }

    #[test]
    fn test_redeem_rejects_non_active() {
        let now = Utc::now();
        for status in [CouponStatus::Created, CouponStatus::Sent] {
            let mut c = coupon_in(status);
            let err = redeem(&mut c, None, None, now).unwrap_err();
            assert!(matches!(err, CouponError::InvalidState { .. }));
            // 失败时不产生任何变更
            assert_eq!(c.status, status);
            assert!(c.redeemed_at.is_none());
        }
    }

    #[test]
    fn test_redeem_already_redeemed_reports_original_time() {
        let now = Utc::now();
        let mut c = coupon_in(CouponStatus::Redeemed);
        let original = c.redeemed_at.unwrap();

        let err = redeem(&mut c, None, None, now).unwrap_err();
        match err {
            CouponError::AlreadyRedeemed { redeemed_at } => assert_eq!(redeemed_at, original),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_redeem_expired() {
        let now = Utc::now();
        let mut c = coupon_in(CouponStatus::Active);
        c.expires_at = Some(now - Duration::days(1));

        let err = redeem(&mut c, None, None, now).unwrap_err();
        assert!(matches!(err, CouponError::Expired { .. }));
        assert_eq!(c.status, CouponStatus::Active);
    }

    #[test]
    fn test_expired_redeemed_coupon_reports_already_redeemed() {
        // 已核销优先于已过期
        let now = Utc::now();
        let mut c = coupon_in(CouponStatus::Redeemed);
        c.expires_at = Some(now - Duration::days(1));

        let err = redeem(&mut c, None, None, now).unwrap_err();
        assert!(matches!(err, CouponError::AlreadyRedeemed { .. }));
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        let now = Utc::now();
        for status in [
            CouponStatus::Created,
            CouponStatus::Sent,
            CouponStatus::Active,
        ] {
            let mut c = coupon_in(status);
            cancel(&mut c, now).unwrap();
            assert_eq!(c.status, CouponStatus::Cancelled);
        }
    }

    #[test]
    fn test_cancel_rejects_terminal() {
        let now = Utc::now();
        for status in [
            CouponStatus::Redeemed,
            CouponStatus::Expired,
            CouponStatus::Cancelled,
        ] {
            let mut c = coupon_in(status);
            assert!(cancel(&mut c, now).is_err());
            assert_eq!(c.status, status);
        }
    }

    #[test]
    fn test_mark_expired_requires_past_expiry() {
        let now = Utc::now();
        let mut c = coupon_in(CouponStatus::Active);
        c.expires_at = Some(now + Duration::days(1));

        assert!(mark_expired(&mut c, now).is_err());

        c.expires_at = Some(now - Duration::seconds(1));
        mark_expired(&mut c, now).unwrap();
        assert_eq!(c.status, CouponStatus::Expired);
    }

    #[test]
    fn test_mark_expired_only_from_active() {
        let now = Utc::now();
        for status in [
            CouponStatus::Created,
            CouponStatus::Sent,
            CouponStatus::Redeemed,
            CouponStatus::Cancelled,
        ] {
            let mut c = coupon_in(status);
            c.expires_at = Some(now - Duration::days(1));

            assert!(mark_expired(&mut c, now).is_err());
            assert_eq!(c.status, status);
        }
    }
}
