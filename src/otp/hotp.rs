//! HOTP (基于计数器的一次性密码) 实现模块
//!
//! 符合 RFC 4226：计数器按 8 字节大端序编码，用共享密钥做 HMAC-SHA-1，
//! 动态截断后对 10^6 取模得到 6 位验证码。
//!
//! SHA-1 在这里只作为 HOTP 规定的 HMAC 压缩函数使用，不依赖其抗碰撞性，
//! 但也不能换成别的哈希——认证器应用只和这个固定构造互操作。

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{CryptoError, Error, Result};
use crate::otp::DIGITS;

/// 生成 HOTP 验证码
///
/// # Arguments
///
/// * `secret` - 共享密钥字节
/// * `counter` - 计数器值
///
/// # Returns
///
/// 返回 6 位数字验证码（保留前导零）
///
/// # Example
///
/// ```rust
/// use twofa::otp::hotp;
///
/// // RFC 4226 附录 D 的测试密钥
/// let code = hotp(b"12345678901234567890", 0).unwrap();
/// assert_eq!(code, "755224");
/// ```
pub fn hotp(secret: &[u8], counter: u64) -> Result<String> {
    // 计数器编码为 8 字节大端整数
    let counter_bytes = counter.to_be_bytes();

    let mut mac = Hmac::<Sha1>::new_from_slice(secret)
        .map_err(|_| Error::Crypto(CryptoError::InvalidKey("invalid secret key".to_string())))?;
    mac.update(&counter_bytes);
    let hash = mac.finalize().into_bytes();

    // 动态截断：末字节低 4 位作为偏移量，读取 4 字节并屏蔽符号位
    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(hash[offset] & 0x7f)) << 24
        | u32::from(hash[offset + 1]) << 16
        | u32::from(hash[offset + 2]) << 8
        | u32::from(hash[offset + 3]);

    // 取模得到指定位数的码，左填充零
    let modulo = 10u32.pow(DIGITS);
    let code = binary % modulo;

    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4226 附录 D 测试向量
    #[test]
    fn test_rfc4226_test_vectors() {
        let secret = b"12345678901234567890";

        let expected_codes = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];

        for (counter, expected) in expected_codes.iter().enumerate() {
            let code = hotp(secret, counter as u64).unwrap();
            assert_eq!(&code, expected, "Failed at counter {}", counter);
        }
    }

    #[test]
    fn test_code_is_six_digits() {
        let code = hotp(b"12345678901234567890", 12345).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let secret = b"12345678901234567890";
        for counter in 0..5000u64 {
            let code = hotp(secret, counter).unwrap();
            assert_eq!(code.len(), 6, "code must be zero-padded at counter {}", counter);
        }
    }

    #[test]
    fn test_different_counters_differ() {
        let secret = b"12345678901234567890";
        let code0 = hotp(secret, 0).unwrap();
        let code1 = hotp(secret, 1).unwrap();
        assert_ne!(code0, code1);
    }

    #[test]
    fn test_deterministic() {
        let secret = b"another secret value";
        assert_eq!(hotp(secret, 42).unwrap(), hotp(secret, 42).unwrap());
    }
}
