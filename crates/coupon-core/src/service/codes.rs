//! 标识符生成
//!
//! - 券码：12 位大写字母数字，供人工输入；与存量冲突时重试，
//!   连续 5 次冲突后回退为完整的唯一标识
//! - QR 令牌：128 位十六进制字符的随机值，无法由券码推导，猜测不可行
//! - 审计短 ID：10 位无元音字母数字，避免随机拼出冒犯性字符串

use rand::Rng;
use uuid::Uuid;

use crate::error::Result;
use crate::repository::traits::CouponRepositoryTrait;

/// 券码字符集（大写字母 + 数字）
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 审计短 ID 字符集（无元音，避免拼出单词）
const REDEMPTION_ID_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXYZ0123456789";

/// 券码长度
pub const CODE_LENGTH: usize = 12;

/// 券码冲突重试次数上限
const CODE_COLLISION_RETRIES: usize = 5;

/// 审计短 ID 长度
pub const REDEMPTION_ID_LENGTH: usize = 10;

/// 生成一个随机券码（不保证唯一）
fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// 冲突兜底：完整唯一标识（32 位大写十六进制）
fn fallback_code() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

/// 生成全局唯一券码
///
/// 对存量做冲突检查，最多重试 5 次，之后回退为完整唯一标识。
pub async fn generate_unique_code(repo: &dyn CouponRepositoryTrait) -> Result<String> {
    for _ in 0..CODE_COLLISION_RETRIES {
        let code = random_code();
        if !repo.code_exists(&code).await? {
            return Ok(code);
        }
    }

    Ok(fallback_code())
}

/// 生成 QR 核销令牌（128 位十六进制字符，512 位随机量）
pub fn generate_qr_token() -> String {
    let mut rng = rand::rng();
    (0..4)
        .map(|_| format!("{:032x}", rng.random::<u128>()))
        .collect()
}

/// 生成核销审计短 ID（10 位无元音字母数字）
pub fn generate_redemption_id() -> String {
    let mut rng = rand::rng();
    (0..REDEMPTION_ID_LENGTH)
        .map(|_| REDEMPTION_ID_ALPHABET[rng.random_range(0..REDEMPTION_ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_code_format() {
        let code = random_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_fallback_code_format() {
        let code = fallback_code();
        assert_eq!(code.len(), 32);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_qr_token_format() {
        let token = generate_qr_token();
        assert_eq!(token.len(), 128);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_qr_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..100).map(|_| generate_qr_token()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_redemption_id_has_no_vowels() {
        for _ in 0..100 {
            let id = generate_redemption_id();
            assert_eq!(id.len(), REDEMPTION_ID_LENGTH);
            assert!(!id.chars().any(|c| "AEIOUaeiou".contains(c)));
        }
    }

    #[tokio::test]
    async fn test_generate_unique_code_retries_then_falls_back() {
        use crate::repository::traits::MockCouponRepositoryTrait;

        // 所有候选码都冲突时回退为完整唯一标识
        let mut repo = MockCouponRepositoryTrait::new();
        repo.expect_code_exists().times(5).returning(|_| Ok(true));

        let code = generate_unique_code(&repo).await.unwrap();
        assert_eq!(code.len(), 32);
    }

    #[tokio::test]
    async fn test_generate_unique_code_first_try() {
        use crate::repository::traits::MockCouponRepositoryTrait;

        let mut repo = MockCouponRepositoryTrait::new();
        repo.expect_code_exists().times(1).returning(|_| Ok(false));

        let code = generate_unique_code(&repo).await.unwrap();
        assert_eq!(code.len(), CODE_LENGTH);
    }
}
