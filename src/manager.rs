//! 双因素凭证生命周期管理模块
//!
//! 管理每个用户的 2FA 注册状态机，并提供登录时的组合验证入口。
//!
//! ## 状态机
//!
//! ```text
//! 未配置 --setup()--> 待验证 --confirm(code)--> 已启用 --disable()--> 未配置
//!                                                  |
//!                                  regenerate_backup_codes(code)
//!                                  （仍为已启用，备用码整组替换）
//! ```
//!
//! 邮件回退验证码是与上述状态机平行的独立机制：按需签发、10 分钟过期、
//! 3 次失败即销毁。本模块只生成和校验验证码，**不负责发送邮件**——
//! 投递由应用层通过邮件服务完成。
//!
//! ## 示例
//!
//! ```rust
//! use twofa::manager::{TwoFactorManager, VerifiedMethod};
//! use twofa::otp::totp::{TotpConfig, TotpGenerator};
//!
//! let manager = TwoFactorManager::new(TotpConfig::default().with_issuer("MyShop"));
//!
//! // 1. 用户发起注册
//! let enrollment = manager.setup("user@example.com").unwrap();
//! println!("请扫描: {}", enrollment.uri);
//!
//! // 2. 用户提交认证器显示的验证码完成确认
//! let generator = TotpGenerator::default_generator();
//! let code = generator.generate_code(&enrollment.secret).unwrap();
//! manager.confirm("user@example.com", &code).unwrap();
//!
//! // 3. 之后每次登录走组合验证
//! let code = generator.generate_code(&enrollment.secret).unwrap();
//! let method = manager.verify("user@example.com", &code).unwrap();
//! assert_eq!(method, VerifiedMethod::Totp);
//! ```

use chrono::{Duration, Utc};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::otp::totp::{TotpConfig, TotpGenerator, TotpSecret};
use crate::random::{constant_time_compare_str, generate_backup_codes, generate_numeric_code};
use crate::store::{
    CredentialStore, InMemoryCredentialStore, PendingEmailCode, TwoFactorCredential,
};

/// 每次设置生成的备用码数量
pub const BACKUP_CODE_COUNT: usize = 10;

/// 邮件验证码位数
pub const EMAIL_CODE_DIGITS: usize = 6;

/// 邮件验证码有效期（分钟）
pub const EMAIL_CODE_TTL_MINUTES: i64 = 10;

/// 邮件验证码最大失败次数，达到后记录销毁
pub const EMAIL_CODE_MAX_ATTEMPTS: u32 = 3;

/// 注册结果
///
/// 明文备用码只在这里返回一次，应立即展示给用户保存。
#[derive(Debug, Clone)]
pub struct EnrollmentData {
    /// 新生成的共享密钥
    pub secret: TotpSecret,

    /// otpauth:// URI（用于渲染注册二维码）
    pub uri: String,

    /// 备用码列表（显示格式 `XXXX-XXXX`）
    pub backup_codes: Vec<String>,
}

/// 组合验证通过的方式
///
/// 调用方需要区分两者：备用码通过时应提示用户剩余库存，
/// 余量不足时引导重新生成。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedMethod {
    /// 通过认证器的 TOTP 验证码
    Totp,
    /// 通过一次性备用码
    BackupCode {
        /// 消耗后剩余的备用码数量
        remaining: usize,
    },
}

/// 用户的 2FA 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorStatus {
    /// 没有凭证记录
    Unconfigured,
    /// 已生成密钥，等待首次确认
    PendingVerification,
    /// 已启用
    Enabled {
        /// 剩余备用码数量
        backup_codes_remaining: usize,
    },
}

/// 双因素凭证生命周期管理器
///
/// 所有操作对文档内的输入都是全函数：未知用户统一返回
/// `Error::NotConfigured` 而不是崩溃，调用方可以把 2FA 当作可选功能，
/// 无需对"未开启"做特殊分支。
pub struct TwoFactorManager<S: CredentialStore = InMemoryCredentialStore> {
    store: S,
    totp: TotpGenerator,
}

impl TwoFactorManager<InMemoryCredentialStore> {
    /// 使用内存存储创建管理器
    pub fn new(config: TotpConfig) -> Self {
        Self {
            store: InMemoryCredentialStore::new(),
            totp: TotpGenerator::new(config),
        }
    }

    /// 使用默认配置创建管理器
    pub fn with_default_config() -> Self {
        Self::new(TotpConfig::default())
    }
}

impl<S: CredentialStore> TwoFactorManager<S> {
    /// 使用自定义存储创建管理器
    pub fn with_store(store: S, config: TotpConfig) -> Self {
        Self {
            store,
            totp: TotpGenerator::new(config),
        }
    }

    /// 发起 2FA 注册
    ///
    /// 生成新密钥和一组备用码，凭证以待验证状态写入存储。
    /// 处于待验证状态时重复调用会重新生成（放弃旧密钥重新注册）；
    /// 已启用时返回 `AlreadyEnabled`，必须先 `disable`。
    ///
    /// `user_id` 同时用作 otpauth URI 中的账户标签。
    ///
    /// # Errors
    ///
    /// - `AlreadyEnabled` - 该用户已启用 2FA
    /// - `Crypto` - 安全随机源失败（中止设置，不降级）
    pub fn setup(&self, user_id: &str) -> Result<EnrollmentData> {
        if let Some(existing) = self.store.get_credential(user_id)? {
            if existing.enabled {
                return Err(Error::AlreadyEnabled);
            }
        }

        let secret = TotpSecret::generate()?;
        let backup_codes = generate_backup_codes(BACKUP_CODE_COUNT)?;

        let credential = TwoFactorCredential {
            secret: secret.raw.clone(),
            enabled: false,
            backup_codes: normalize_backup_set(&backup_codes),
            verified_at: None,
        };
        self.store.put_credential(user_id, credential)?;

        let uri = self.totp.provisioning_uri(&secret, user_id);

        Ok(EnrollmentData {
            secret,
            uri,
            backup_codes,
        })
    }

    /// 确认注册（待验证 → 已启用）
    ///
    /// 用户提交认证器显示的第一个验证码，证明扫码成功。
    /// 验证失败不改变状态，注册可以重试或放弃。
    ///
    /// # Errors
    ///
    /// - `NotConfigured` - 尚未调用 `setup`
    /// - `AlreadyEnabled` - 已经确认过
    /// - `InvalidCode` - 验证码不在容差窗口内
    pub fn confirm(&self, user_id: &str, code: &str) -> Result<()> {
        let mut credential = self
            .store
            .get_credential(user_id)?
            .ok_or(Error::NotConfigured)?;

        if credential.enabled {
            return Err(Error::AlreadyEnabled);
        }

        let secret = TotpSecret::from_bytes(credential.secret.clone());
        if !self.totp.verify(&secret, code)? {
            return Err(Error::InvalidCode);
        }

        credential.enabled = true;
        credential.verified_at = Some(Utc::now());
        self.store.put_credential(user_id, credential)
    }

    /// 关闭 2FA（已启用 → 未配置，凭证记录删除）
    ///
    /// 必须显式调用；是否要求重新认证由上层把关。
    ///
    /// # Errors
    ///
    /// - `NotConfigured` - 没有凭证记录
    /// - `NotEnabled` - 凭证仍处于待验证状态
    pub fn disable(&self, user_id: &str) -> Result<()> {
        let credential = self
            .store
            .get_credential(user_id)?
            .ok_or(Error::NotConfigured)?;

        if !credential.enabled {
            return Err(Error::NotEnabled);
        }

        self.store.delete_credential(user_id)
    }

    /// 登录时的组合验证
    ///
    /// 先尝试 TOTP（容差窗口内），失败后回退到备用码。
    /// 备用码匹配即被原子地移除——包括同一用户的并发提交，
    /// 一个备用码至多通过一次。
    ///
    /// # Errors
    ///
    /// - `NotConfigured` - 该用户未配置 2FA
    /// - `NotEnabled` - 凭证尚未通过首次确认（待验证凭证不可用于登录）
    /// - `InvalidCode` - 两条路径都未匹配
    pub fn verify(&self, user_id: &str, code: &str) -> Result<VerifiedMethod> {
        let credential = self
            .store
            .get_credential(user_id)?
            .ok_or(Error::NotConfigured)?;

        if !credential.enabled {
            return Err(Error::NotEnabled);
        }

        let secret = TotpSecret::from_bytes(credential.secret.clone());
        if self.totp.verify(&secret, code)? {
            return Ok(VerifiedMethod::Totp);
        }

        let normalized = normalize_backup_code(code);
        if let Some(remaining) = self.store.take_backup_code(user_id, &normalized)? {
            return Ok(VerifiedMethod::BackupCode { remaining });
        }

        Err(Error::InvalidCode)
    }

    /// 重新生成备用码
    ///
    /// 整组替换现有备用码。要求提交一个当前有效的验证码
    /// （TOTP 或剩余备用码均可）作为持有认证器的证明，
    /// 防止被盗会话静默作废用户手里的备用码。
    ///
    /// # Errors
    ///
    /// 同 [`verify`](Self::verify)，外加 `Crypto`（随机源失败）。
    pub fn regenerate_backup_codes(&self, user_id: &str, code: &str) -> Result<Vec<String>> {
        self.verify(user_id, code)?;

        let mut credential = self
            .store
            .get_credential(user_id)?
            .ok_or(Error::NotConfigured)?;

        let backup_codes = generate_backup_codes(BACKUP_CODE_COUNT)?;
        credential.backup_codes = normalize_backup_set(&backup_codes);
        self.store.put_credential(user_id, credential)?;

        Ok(backup_codes)
    }

    /// 查询用户的 2FA 状态
    ///
    /// 供设置页面渲染用：未配置 / 待验证 / 已启用（含剩余备用码数量）。
    pub fn status(&self, user_id: &str) -> Result<TwoFactorStatus> {
        match self.store.get_credential(user_id)? {
            None => Ok(TwoFactorStatus::Unconfigured),
            Some(credential) if !credential.enabled => Ok(TwoFactorStatus::PendingVerification),
            Some(credential) => Ok(TwoFactorStatus::Enabled {
                backup_codes_remaining: credential.backup_codes.len(),
            }),
        }
    }

    // ========================================================================
    // 邮件回退验证码
    // ========================================================================

    /// 签发邮件回退验证码
    ///
    /// 创建或替换该用户的待验证条目，返回 6 位数字验证码
    /// 交给应用层的邮件服务投递。每个用户同一时刻至多一条。
    pub fn issue_email_code(&self, user_id: &str) -> Result<String> {
        let code = generate_numeric_code(EMAIL_CODE_DIGITS);
        let now = Utc::now();

        let entry = PendingEmailCode {
            code: code.clone(),
            expires_at: now + Duration::minutes(EMAIL_CODE_TTL_MINUTES),
            attempts: 0,
        };
        self.store.put_email_code(user_id, entry)?;

        Ok(code)
    }

    /// 校验邮件回退验证码
    ///
    /// **此调用不是幂等的**：校验本身会改变状态——匹配成功删除条目
    /// （单次使用），失败累加尝试计数，第 3 次失败销毁条目。
    ///
    /// 检查顺序：过期优先于尝试计数。过期条目直接销毁并报告
    /// `Expired`，该次提交不计入尝试。
    ///
    /// # Errors
    ///
    /// - `NotConfigured` - 没有待验证条目（从未签发，或已被销毁）
    /// - `Expired` - 超过 10 分钟有效期（条目已删除）
    /// - `AttemptsExceeded` - 第 3 次失败（条目已删除）
    /// - `InvalidCode` - 不匹配，仍有剩余尝试机会
    pub fn check_email_code(&self, user_id: &str, code: &str) -> Result<()> {
        let entry = self
            .store
            .get_email_code(user_id)?
            .ok_or(Error::NotConfigured)?;

        if Utc::now() > entry.expires_at {
            self.store.delete_email_code(user_id)?;
            return Err(Error::Expired);
        }

        if constant_time_compare_str(code, &entry.code) {
            // 单次使用
            self.store.delete_email_code(user_id)?;
            return Ok(());
        }

        let attempts = self.store.bump_email_attempts(user_id)?;
        if attempts >= EMAIL_CODE_MAX_ATTEMPTS {
            self.store.delete_email_code(user_id)?;
            return Err(Error::AttemptsExceeded);
        }

        Err(Error::InvalidCode)
    }

    /// 获取 TOTP 生成器（验证引擎的纯计算部分）
    pub fn totp(&self) -> &TotpGenerator {
        &self.totp
    }

    /// 获取存储引用
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// 规范化备用码输入（去除分隔符，转为大写）
fn normalize_backup_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// 把显示格式的备用码规范化后装入集合
fn normalize_backup_set(codes: &[String]) -> HashSet<String> {
    codes.iter().map(|c| normalize_backup_code(c)).collect()
}
