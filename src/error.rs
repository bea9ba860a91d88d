//! 统一错误类型模块
//!
//! 提供 twofa 库中所有操作的错误类型定义。
//!
//! 这里的错误都是**可预期的业务结果**，调用方应该按错误种类分支处理
//! （例如 `NotConfigured` 提示用户去开启 2FA，而不是显示"验证码错误"），
//! 而不是当作异常统一兜底。唯一的致命错误是 `Crypto`：
//! 安全随机源失败时必须中止设置流程，绝不能降级到弱随机源。

use std::fmt;

/// twofa 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// twofa 库的错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 用户没有 2FA 凭证记录
    ///
    /// 与 `InvalidCode` 区分开，以便 UI 引导用户进行注册而不是提示验证码错误。
    NotConfigured,

    /// 凭证存在但尚未通过首次确认（仍处于待验证状态）
    NotEnabled,

    /// 凭证已启用（`setup`/`confirm` 在错误的状态下被调用）
    AlreadyEnabled,

    /// 提交的 TOTP/备用码/邮件验证码不匹配
    InvalidCode,

    /// 邮件验证码已过期（超过有效期）
    Expired,

    /// 邮件验证码尝试次数超限
    ///
    /// 报告此错误的同时验证码记录已被销毁，后续重复提交会得到
    /// `NotConfigured`，不会获得新的尝试机会。
    AttemptsExceeded,

    /// 加密原语错误（随机数生成失败等）
    Crypto(CryptoError),

    /// 存储后端错误
    Storage(StorageError),
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 随机数生成失败
    RngFailed(String),
    /// 密钥无效
    InvalidKey(String),
}

/// 存储相关错误
///
/// 内置的内存存储不会产生这些错误，自定义后端（数据库、Redis 等）
/// 通过它们向上传递故障。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 连接失败
    ConnectionFailed(String),
    /// 操作失败
    OperationFailed(String),
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConfigured => write!(f, "two-factor authentication is not configured"),
            Error::NotEnabled => write!(f, "two-factor authentication is not enabled yet"),
            Error::AlreadyEnabled => write!(f, "two-factor authentication is already enabled"),
            Error::InvalidCode => write!(f, "invalid verification code"),
            Error::Expired => write!(f, "verification code has expired"),
            Error::AttemptsExceeded => write!(f, "maximum verification attempts exceeded"),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailed(msg) => write!(f, "random number generation failed: {}", msg),
            CryptoError::InvalidKey(msg) => write!(f, "invalid key: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(msg) => write!(f, "storage connection failed: {}", msg),
            StorageError::OperationFailed(msg) => write!(f, "storage operation failed: {}", msg),
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::error::Error for CryptoError {}
impl std::error::Error for StorageError {}

// ============================================================================
// From 实现 - 方便错误转换
// ============================================================================

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}
