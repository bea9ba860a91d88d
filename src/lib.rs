//! # twofa
//!
//! 一个 TOTP 双因素认证引擎。
//!
//! ## 功能特性
//!
//! - **Base32 编解码**: 共享密钥的文本表示（RFC 4648，宽容解码）
//! - **HOTP/TOTP**: 符合 RFC 4226 / RFC 6238 的验证码生成与验证
//! - **容差窗口验证**: 容忍服务器与认证器设备之间的时钟偏差
//! - **备用码**: 一次性使用，并发安全的原子消耗
//! - **邮件回退码**: 短时效数字验证码（10 分钟、3 次尝试）
//! - **凭证生命周期**: 未配置 → 待验证 → 已启用 的显式状态机
//! - **可插拔存储**: 按用户标识的键值接口，内置内存实现
//!
//! 速率限制、审计日志、邮件投递和会话管理都是外部协作方，
//! 本库不包含它们。
//!
//! ## 注册流程示例
//!
//! ```rust
//! use twofa::{TotpConfig, TotpGenerator, TwoFactorManager, VerifiedMethod};
//!
//! let manager = TwoFactorManager::new(TotpConfig::default().with_issuer("MyShop"));
//!
//! // 生成密钥、备用码和注册 URI
//! let enrollment = manager.setup("alice@example.com").unwrap();
//! assert_eq!(enrollment.backup_codes.len(), 10);
//!
//! // 用户扫码后提交认证器显示的验证码
//! let generator = TotpGenerator::default_generator();
//! let code = generator.generate_code(&enrollment.secret).unwrap();
//! manager.confirm("alice@example.com", &code).unwrap();
//!
//! // 之后每次登录验证
//! let code = generator.generate_code(&enrollment.secret).unwrap();
//! let method = manager.verify("alice@example.com", &code).unwrap();
//! assert_eq!(method, VerifiedMethod::Totp);
//! ```
//!
//! ## 邮件回退码示例
//!
//! ```rust
//! use twofa::TwoFactorManager;
//!
//! let manager = TwoFactorManager::with_default_config();
//!
//! // 签发验证码（邮件投递由应用层负责）
//! let code = manager.issue_email_code("alice@example.com").unwrap();
//!
//! // 用户输入收到的验证码
//! manager.check_email_code("alice@example.com", &code).unwrap();
//! ```

pub mod base32;
pub mod error;
pub mod manager;
pub mod otp;
pub mod random;
pub mod store;

pub use error::{CryptoError, Error, Result, StorageError};

// ============================================================================
// OTP 相关导出
// ============================================================================

pub use otp::hotp::hotp;
pub use otp::totp::{TotpConfig, TotpGenerator, TotpSecret};
pub use otp::{DIGITS, SECRET_LENGTH, TIME_STEP};

// ============================================================================
// 生命周期管理相关导出
// ============================================================================

pub use manager::{
    EnrollmentData, TwoFactorManager, TwoFactorStatus, VerifiedMethod, BACKUP_CODE_COUNT,
    EMAIL_CODE_MAX_ATTEMPTS, EMAIL_CODE_TTL_MINUTES,
};

// ============================================================================
// 存储相关导出
// ============================================================================

pub use store::{CredentialStore, InMemoryCredentialStore, PendingEmailCode, TwoFactorCredential};
