//! 安全随机数生成模块
//!
//! 提供密码学安全的随机数生成功能，用于生成共享密钥、备用码等敏感数据。
//!
//! 密钥和备用码必须来自操作系统的 CSPRNG；随机源失败是唯一的致命错误，
//! 必须中止调用方的设置流程而不是降级。

use rand::{Rng, TryRngCore, rngs::OsRng};

use crate::error::{CryptoError, Error, Result};

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Arguments
///
/// * `length` - 要生成的字节数
///
/// # Example
///
/// ```rust
/// use twofa::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(20).unwrap();
/// assert_eq!(bytes.len(), 20);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 生成一组备用码
///
/// 每个备用码为 8 个大写十六进制字符，按 `XXXX-XXXX` 分组显示。
///
/// # Arguments
///
/// * `count` - 要生成的备用码数量
///
/// # Example
///
/// ```rust
/// use twofa::random::generate_backup_codes;
///
/// let codes = generate_backup_codes(10).unwrap();
/// assert_eq!(codes.len(), 10);
/// for code in &codes {
///     assert_eq!(code.len(), 9);
///     assert_eq!(&code[4..5], "-");
/// }
/// ```
pub fn generate_backup_codes(count: usize) -> Result<Vec<String>> {
    let mut codes = Vec::with_capacity(count);

    for _ in 0..count {
        let bytes = generate_random_bytes(4)?;
        let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        codes.push(format!("{}-{}", &hex[..4], &hex[4..]));
    }

    Ok(codes)
}

/// 生成指定位数的数字验证码
///
/// 每一位在 0-9 中均匀取值，**不抑制前导零**（"012345" 是合法验证码）。
///
/// # Example
///
/// ```rust
/// use twofa::random::generate_numeric_code;
///
/// let code = generate_numeric_code(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_digit()));
/// ```
pub fn generate_numeric_code(digits: usize) -> String {
    let modulo = 10u64.pow(digits as u32);
    let value: u64 = rand::rng().random_range(0..modulo);
    format!("{:0>width$}", value, width = digits)
}

/// 常量时间比较两个字节切片
///
/// 用于验证码比较，防止时序攻击
///
/// # Example
///
/// ```rust
/// use twofa::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"847291", b"847291"));
/// assert!(!constant_time_compare(b"847291", b"847292"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}
