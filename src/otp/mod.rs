//! 一次性密码 (OTP) 模块
//!
//! 提供 HOTP（基于计数器）和 TOTP（基于时间）验证码的生成与验证。
//!
//! 本部署的参数是固定常量：30 秒步长、6 位验证码、HMAC-SHA-1、20 字节密钥。
//! 它们通过 otpauth URI 公告给认证器应用，注册后不能单方面变更，
//! 否则双方生成的验证码不再一致。
//!
//! ## 示例
//!
//! ```rust
//! use twofa::otp::totp::{TotpGenerator, TotpSecret};
//!
//! let generator = TotpGenerator::default_generator();
//!
//! // 为用户生成密钥
//! let secret = TotpSecret::generate().unwrap();
//!
//! // 生成当前验证码并验证
//! let code = generator.generate_code(&secret).unwrap();
//! assert!(generator.verify(&secret, &code).unwrap());
//! ```

pub mod hotp;
pub mod totp;

pub use hotp::hotp;
pub use totp::{TotpConfig, TotpGenerator, TotpSecret};

/// TOTP 时间步长（秒）
pub const TIME_STEP: u64 = 30;

/// 验证码位数
pub const DIGITS: u32 = 6;

/// 共享密钥长度（字节），160 位
pub const SECRET_LENGTH: usize = 20;
