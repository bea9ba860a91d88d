//! 凭证存储模块
//!
//! 定义 2FA 引擎需要的键值存储接口以及内置的内存实现。
//!
//! 引擎本身与存储无关：测试和单实例部署用内存实现，生产环境实现
//! [`CredentialStore`] 接到数据库或 Redis。存储按用户标识保存两类记录：
//! 双因素凭证和待验证的邮件验证码，两者相互独立。
//!
//! ## 并发契约
//!
//! 整个引擎唯一需要的临界区是备用码的"读取-匹配-移除"序列：
//! [`CredentialStore::take_backup_code`] 必须实现为单个原子操作，
//! 否则同一备用码可能通过两个并发会话。其余操作互不阻塞，
//! 不同用户的请求可以完全并行。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::random::constant_time_compare_str;

/// 用户的双因素凭证记录
///
/// `enabled = false` 的凭证处于待验证状态，只能用于注册确认，
/// 绝不能通过登录时的验证。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorCredential {
    /// 共享密钥（20 字节原始数据）
    pub secret: Vec<u8>,

    /// 是否已通过首次确认
    pub enabled: bool,

    /// 未使用的备用码集合（规范化存储：8 个大写十六进制字符，无分隔符）
    pub backup_codes: HashSet<String>,

    /// 首次验证成功的时间
    pub verified_at: Option<DateTime<Utc>>,
}

/// 待验证的邮件验证码记录
///
/// 每个用户最多一条，独立于双因素凭证存在。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEmailCode {
    /// 6 位数字验证码（保留前导零）
    pub code: String,

    /// 过期时间（签发后 10 分钟）
    pub expires_at: DateTime<Utc>,

    /// 已失败的尝试次数
    pub attempts: u32,
}

/// 凭证存储接口
///
/// 实现此 trait 以提供自定义的存储后端（如数据库、Redis 等）。
/// 自定义后端的故障通过 `Error::Storage` 上报。
pub trait CredentialStore: Send + Sync {
    /// 获取用户的双因素凭证
    fn get_credential(&self, user_id: &str) -> Result<Option<TwoFactorCredential>>;

    /// 写入用户的双因素凭证（覆盖已有记录）
    fn put_credential(&self, user_id: &str, credential: TwoFactorCredential) -> Result<()>;

    /// 删除用户的双因素凭证
    fn delete_credential(&self, user_id: &str) -> Result<()>;

    /// 原子地消耗一个备用码
    ///
    /// 在单个临界区内完成"测试存在并移除"：若 `code`（规范化形式）
    /// 在用户的备用码集合中，将其移除并返回剩余数量；否则返回 `None`。
    ///
    /// 同一用户并发提交同一备用码时，至多一个调用能得到 `Some`。
    fn take_backup_code(&self, user_id: &str, code: &str) -> Result<Option<usize>>;

    /// 获取用户的待验证邮件验证码
    fn get_email_code(&self, user_id: &str) -> Result<Option<PendingEmailCode>>;

    /// 写入用户的邮件验证码（覆盖已有记录）
    fn put_email_code(&self, user_id: &str, entry: PendingEmailCode) -> Result<()>;

    /// 删除用户的邮件验证码
    fn delete_email_code(&self, user_id: &str) -> Result<()>;

    /// 原子地递增邮件验证码的失败次数，返回递增后的值
    ///
    /// 记录不存在时返回 0，不创建记录。
    fn bump_email_attempts(&self, user_id: &str) -> Result<u32>;
}

/// 内存存储实现
///
/// 适用于测试和单实例部署。生产环境建议使用持久化存储。
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    credentials: Arc<RwLock<HashMap<String, TwoFactorCredential>>>,
    email_codes: Arc<RwLock<HashMap<String, PendingEmailCode>>>,
}

impl InMemoryCredentialStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的凭证数量
    pub fn len(&self) -> usize {
        self.credentials.read().unwrap().len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.credentials.read().unwrap().is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get_credential(&self, user_id: &str) -> Result<Option<TwoFactorCredential>> {
        let credentials = self.credentials.read().unwrap();
        Ok(credentials.get(user_id).cloned())
    }

    fn put_credential(&self, user_id: &str, credential: TwoFactorCredential) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap();
        credentials.insert(user_id.to_string(), credential);
        Ok(())
    }

    fn delete_credential(&self, user_id: &str) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap();
        credentials.remove(user_id);
        Ok(())
    }

    fn take_backup_code(&self, user_id: &str, code: &str) -> Result<Option<usize>> {
        // 写锁覆盖整个"匹配并移除"序列，封死 TOCTOU 窗口
        let mut credentials = self.credentials.write().unwrap();

        let Some(credential) = credentials.get_mut(user_id) else {
            return Ok(None);
        };

        let matched = credential
            .backup_codes
            .iter()
            .find(|stored| constant_time_compare_str(code, stored))
            .cloned();

        match matched {
            Some(stored) => {
                credential.backup_codes.remove(&stored);
                Ok(Some(credential.backup_codes.len()))
            }
            None => Ok(None),
        }
    }

    fn get_email_code(&self, user_id: &str) -> Result<Option<PendingEmailCode>> {
        let email_codes = self.email_codes.read().unwrap();
        Ok(email_codes.get(user_id).cloned())
    }

    fn put_email_code(&self, user_id: &str, entry: PendingEmailCode) -> Result<()> {
        let mut email_codes = self.email_codes.write().unwrap();
        email_codes.insert(user_id.to_string(), entry);
        Ok(())
    }

    fn delete_email_code(&self, user_id: &str) -> Result<()> {
        let mut email_codes = self.email_codes.write().unwrap();
        email_codes.remove(user_id);
        Ok(())
    }

    fn bump_email_attempts(&self, user_id: &str) -> Result<u32> {
        let mut email_codes = self.email_codes.write().unwrap();
        match email_codes.get_mut(user_id) {
            Some(entry) => {
                entry.attempts += 1;
                Ok(entry.attempts)
            }
            None => Ok(0),
        }
    }
}
