//! TOTP (基于时间的一次性密码) 实现模块
//!
//! 符合 RFC 6238：以 `floor(时间戳 / 30)` 作为计数器委托给 HOTP。
//! 验证时在允许的时间窗口内逐步比较，容忍服务器与认证器设备之间的时钟偏差。
//!
//! ## 示例
//!
//! ```rust
//! use twofa::otp::totp::{TotpGenerator, TotpConfig, TotpSecret};
//!
//! let config = TotpConfig::default().with_issuer("MyShop");
//! let generator = TotpGenerator::new(config);
//!
//! // 为用户生成密钥
//! let secret = TotpSecret::generate().unwrap();
//!
//! // 生成 otpauth URI 供认证器扫描
//! let uri = generator.provisioning_uri(&secret, "user@example.com");
//! assert!(uri.starts_with("otpauth://totp/"));
//!
//! // 验证用户输入的码
//! let code = generator.generate_code(&secret).unwrap();
//! assert!(generator.verify(&secret, &code).unwrap());
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::base32;
use crate::error::Result;
use crate::otp::hotp::hotp;
use crate::otp::{DIGITS, SECRET_LENGTH, TIME_STEP};
use crate::random::{constant_time_compare_str, generate_random_bytes};

/// TOTP 共享密钥
///
/// 密钥只应存在于凭证存储和注册期间的 otpauth URI 中，
/// 不要写入日志或错误信息。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpSecret {
    /// 原始密钥字节
    pub raw: Vec<u8>,

    /// Base32 编码的密钥（用于显示和 URI）
    pub base32: String,
}

impl TotpSecret {
    /// 从安全随机源生成新密钥（20 字节 / 160 位）
    ///
    /// 随机源失败会返回 `Error::Crypto`，调用方必须中止设置流程。
    pub fn generate() -> Result<Self> {
        let bytes = generate_random_bytes(SECRET_LENGTH)?;
        Ok(Self::from_bytes(bytes))
    }

    /// 从原始字节创建
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let encoded = base32::encode(&bytes);
        Self {
            raw: bytes,
            base32: encoded,
        }
    }

    /// 从 Base32 字符串创建
    ///
    /// 解码是宽容的：大小写、填充和字母表外的字符都被忽略，
    /// 因此这里没有失败路径。
    pub fn from_base32(text: &str) -> Self {
        let raw = base32::decode(text);
        let encoded = base32::encode(&raw);
        Self { raw, base32: encoded }
    }
}

/// TOTP 配置
///
/// 时间步长（30 秒）和位数（6 位）是本部署的固定常量，不在配置范围内；
/// 可配置的只有签发者名称和验证时的容差窗口。
#[derive(Debug, Clone)]
pub struct TotpConfig {
    /// 允许的时间偏差窗口（前后各多少个时间步）
    ///
    /// 默认为 1，即接受上一步、当前步、下一步共三个码，
    /// 有效接受窗口 90 秒。
    pub window: u64,

    /// 签发者名称（显示在认证器应用中，嵌入 otpauth URI）
    pub issuer: Option<String>,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            window: 1,
            issuer: None,
        }
    }
}

impl TotpConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置时间偏差窗口
    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    /// 设置签发者
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// TOTP 生成器
///
/// 纯计算组件：生成验证码、在容差窗口内验证、构造 otpauth URI。
/// 不接触任何存储。
#[derive(Debug, Clone)]
pub struct TotpGenerator {
    config: TotpConfig,
}

impl TotpGenerator {
    /// 创建新的 TOTP 生成器
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    /// 使用默认配置创建生成器
    pub fn default_generator() -> Self {
        Self::new(TotpConfig::default())
    }

    /// 生成当前时间的 TOTP 验证码
    pub fn generate_code(&self, secret: &TotpSecret) -> Result<String> {
        self.generate_code_at(secret, current_timestamp())
    }

    /// 生成指定时间戳的 TOTP 验证码
    pub fn generate_code_at(&self, secret: &TotpSecret, timestamp: u64) -> Result<String> {
        hotp(&secret.raw, timestamp / TIME_STEP)
    }

    /// 验证 TOTP 验证码（当前时间，配置的容差窗口）
    pub fn verify(&self, secret: &TotpSecret, code: &str) -> Result<bool> {
        self.verify_at(secret, code, current_timestamp())
    }

    /// 验证指定时间戳的 TOTP 验证码（配置的容差窗口）
    pub fn verify_at(&self, secret: &TotpSecret, code: &str, timestamp: u64) -> Result<bool> {
        self.verify_at_with_window(secret, code, timestamp, self.config.window)
    }

    /// 验证指定时间戳的 TOTP 验证码，显式指定容差窗口
    ///
    /// 对 `k` 取 `[-window, +window]` 内的每个偏移计算
    /// `totp(secret, timestamp + k*30)`，任一精确匹配即通过。
    /// 比较使用常量时间算法。
    pub fn verify_at_with_window(
        &self,
        secret: &TotpSecret,
        code: &str,
        timestamp: u64,
        window: u64,
    ) -> Result<bool> {
        let normalized = normalize_code(code);

        // 长度不符直接拒绝，避免空输入进入比较
        if normalized.len() != DIGITS as usize {
            return Ok(false);
        }

        for offset in -(window as i64)..=(window as i64) {
            let shifted = timestamp as i64 + offset * TIME_STEP as i64;
            if shifted < 0 {
                continue;
            }
            let expected = self.generate_code_at(secret, shifted as u64)?;
            if constant_time_compare_str(&normalized, &expected) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// 生成 otpauth:// 配置 URI
    ///
    /// 此 URI 嵌入 Base32 密钥、签发者、算法、位数和步长，
    /// 供调用方渲染为可扫描的注册二维码。纯格式化，无副作用。
    pub fn provisioning_uri(&self, secret: &TotpSecret, account: &str) -> String {
        let account_enc = urlencoding::encode(account);

        match self.config.issuer {
            Some(ref issuer) => {
                let issuer_enc = urlencoding::encode(issuer);
                format!(
                    "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA-1&digits={}&period={}",
                    issuer_enc, account_enc, secret.base32, issuer_enc, DIGITS, TIME_STEP
                )
            }
            None => format!(
                "otpauth://totp/{}?secret={}&algorithm=SHA-1&digits={}&period={}",
                account_enc, secret.base32, DIGITS, TIME_STEP
            ),
        }
    }

    /// 获取当前验证码的剩余有效时间（秒）
    pub fn time_remaining(&self) -> u64 {
        TIME_STEP - (current_timestamp() % TIME_STEP)
    }

    /// 获取配置
    pub fn config(&self) -> &TotpConfig {
        &self.config
    }
}

/// 获取当前 Unix 时间戳
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// 规范化输入码（移除空格和连字符）
fn normalize_code(code: &str) -> String {
    code.replace([' ', '-'], "")
}
