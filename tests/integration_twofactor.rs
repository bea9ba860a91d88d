//! 集成测试：双因素认证引擎
//!
//! 覆盖完整的注册、登录、备用码和邮件回退码流程。

use std::sync::Arc;
use std::thread;

use twofa::error::Error;
use twofa::manager::{TwoFactorManager, TwoFactorStatus, VerifiedMethod};
use twofa::otp::totp::{TotpConfig, TotpGenerator, TotpSecret};
use twofa::store::{CredentialStore, InMemoryCredentialStore};

fn manager() -> TwoFactorManager {
    TwoFactorManager::new(TotpConfig::default().with_issuer("MyShop"))
}

/// 当前有效的 TOTP 码（模拟用户的认证器应用）
fn authenticator_code(secret: &TotpSecret) -> String {
    TotpGenerator::default_generator()
        .generate_code(secret)
        .expect("Code generation should succeed")
}

/// 端到端场景：注册 → 确认 → 登录 → 备用码
#[test]
fn test_end_to_end_flow() {
    let manager = manager();

    // 1. setup 返回密钥和 10 个备用码
    let enrollment = manager.setup("u1").expect("Setup should succeed");
    assert_eq!(enrollment.backup_codes.len(), 10);
    assert!(!enrollment.secret.base32.is_empty());

    // 2. 用认证器的验证码确认，状态变为已启用
    let code = authenticator_code(&enrollment.secret);
    manager.confirm("u1", &code).expect("Confirm should succeed");
    assert!(matches!(
        manager.status("u1").unwrap(),
        TwoFactorStatus::Enabled { .. }
    ));

    // 3. 下次登录验证成功
    let code = authenticator_code(&enrollment.secret);
    let method = manager.verify("u1", &code).expect("Login should succeed");
    assert_eq!(method, VerifiedMethod::Totp);

    // 4. 错误码被拒绝（极小概率 000000 恰好有效，此时跳过断言）
    if authenticator_code(&enrollment.secret) != "000000" {
        assert_eq!(manager.verify("u1", "000000"), Err(Error::InvalidCode));
    }

    // 5. 备用码 B1 第一次成功、第二次失败
    let b1 = &enrollment.backup_codes[0];
    let method = manager.verify("u1", b1).expect("Backup code should work");
    assert_eq!(method, VerifiedMethod::BackupCode { remaining: 9 });
    assert_eq!(manager.verify("u1", b1), Err(Error::InvalidCode));
}

/// 注册时序：confirm 必须在 setup 之后、且只能成功一次
#[test]
fn test_enrollment_sequencing() {
    let manager = manager();

    // setup 之前 confirm 报告未配置
    assert_eq!(manager.confirm("u1", "123456"), Err(Error::NotConfigured));

    let enrollment = manager.setup("u1").unwrap();
    let code = authenticator_code(&enrollment.secret);

    // 有效验证码让状态进入已启用
    manager.confirm("u1", &code).unwrap();

    // 第二次 confirm 报告已启用
    assert_eq!(manager.confirm("u1", &code), Err(Error::AlreadyEnabled));
}

/// 待验证的凭证不能用于登录验证
#[test]
fn test_pending_credential_never_verifies_login() {
    let manager = manager();
    let enrollment = manager.setup("u1").unwrap();

    let code = authenticator_code(&enrollment.secret);
    assert_eq!(manager.verify("u1", &code), Err(Error::NotEnabled));

    // 备用码同样不可用
    assert_eq!(
        manager.verify("u1", &enrollment.backup_codes[0]),
        Err(Error::NotEnabled)
    );
}

/// 并发提交同一个备用码，全局恰好成功一次
#[test]
fn test_backup_code_concurrent_single_use() {
    let manager = Arc::new(manager());
    let enrollment = manager.setup("u1").unwrap();
    manager
        .confirm("u1", &authenticator_code(&enrollment.secret))
        .unwrap();

    let backup = enrollment.backup_codes[0].clone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        let backup = backup.clone();
        handles.push(thread::spawn(move || manager.verify("u1", &backup).is_ok()));
    }

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1, "exactly one submission should win");

    // 其余 9 个备用码未受影响
    match manager.status("u1").unwrap() {
        TwoFactorStatus::Enabled {
            backup_codes_remaining,
        } => assert_eq!(backup_codes_remaining, 9),
        other => panic!("unexpected status: {:?}", other),
    }
}

/// 不同用户的验证互不干扰
#[test]
fn test_users_are_independent() {
    let manager = manager();

    let e1 = manager.setup("u1").unwrap();
    let e2 = manager.setup("u2").unwrap();
    assert_ne!(e1.secret.raw, e2.secret.raw);

    manager.confirm("u1", &authenticator_code(&e1.secret)).unwrap();

    // u2 仍处于待验证，u1 的状态不受影响
    assert_eq!(
        manager.status("u2").unwrap(),
        TwoFactorStatus::PendingVerification
    );

    // u1 的备用码不能用于 u2
    manager.confirm("u2", &authenticator_code(&e2.secret)).unwrap();
    assert_eq!(
        manager.verify("u2", &e1.backup_codes[0]),
        Err(Error::InvalidCode)
    );
}

/// 备用码余量告警信息：组合验证报告使用的方式和剩余数量
#[test]
fn test_low_backup_inventory_reporting() {
    let manager = manager();
    let enrollment = manager.setup("u1").unwrap();
    manager
        .confirm("u1", &authenticator_code(&enrollment.secret))
        .unwrap();

    for (i, code) in enrollment.backup_codes.iter().take(3).enumerate() {
        let method = manager.verify("u1", code).unwrap();
        assert_eq!(
            method,
            VerifiedMethod::BackupCode {
                remaining: 9 - i
            }
        );
    }
}

/// 重新生成备用码需要持有证明，并使旧码全部失效
#[test]
fn test_backup_code_regeneration() {
    let manager = manager();
    let enrollment = manager.setup("u1").unwrap();
    manager
        .confirm("u1", &authenticator_code(&enrollment.secret))
        .unwrap();

    // 使用一个备用码作为持有证明
    let proof = enrollment.backup_codes[0].clone();
    let fresh = manager
        .regenerate_backup_codes("u1", &proof)
        .expect("Regeneration should succeed");

    assert_eq!(fresh.len(), 10);

    // 所有旧备用码（包括未使用的）全部失效
    for old in &enrollment.backup_codes {
        assert_eq!(manager.verify("u1", old), Err(Error::InvalidCode));
    }

    // 新备用码可用
    let method = manager.verify("u1", &fresh[0]).unwrap();
    assert_eq!(method, VerifiedMethod::BackupCode { remaining: 9 });
}

/// 关闭后凭证彻底删除，可重新注册
#[test]
fn test_disable_and_re_enroll() {
    let manager = manager();
    let enrollment = manager.setup("u1").unwrap();
    manager
        .confirm("u1", &authenticator_code(&enrollment.secret))
        .unwrap();

    manager.disable("u1").unwrap();
    assert_eq!(manager.status("u1").unwrap(), TwoFactorStatus::Unconfigured);

    // 旧密钥的验证码不再被接受
    let stale_code = authenticator_code(&enrollment.secret);
    assert_eq!(manager.verify("u1", &stale_code), Err(Error::NotConfigured));

    // 重新注册得到新密钥
    let again = manager.setup("u1").unwrap();
    assert_ne!(again.secret.raw, enrollment.secret.raw);
}

/// 邮件回退码生命周期：3 次失败后即使正确的码也必须重新签发
#[test]
fn test_email_code_lifecycle() {
    let manager = manager();

    let code = manager.issue_email_code("u1").unwrap();
    assert_eq!(code.len(), 6);

    let wrong = if code == "999999" { "888888" } else { "999999" };

    // 3 次错误提交耗尽尝试次数
    assert_eq!(manager.check_email_code("u1", wrong), Err(Error::InvalidCode));
    assert_eq!(manager.check_email_code("u1", wrong), Err(Error::InvalidCode));
    assert_eq!(
        manager.check_email_code("u1", wrong),
        Err(Error::AttemptsExceeded)
    );

    // 第 4 次提交（正确的码）报告需要重新签发
    assert_eq!(manager.check_email_code("u1", &code), Err(Error::NotConfigured));

    // 重新签发后正常工作，且单次使用
    let fresh = manager.issue_email_code("u1").unwrap();
    manager.check_email_code("u1", &fresh).unwrap();
    assert_eq!(manager.check_email_code("u1", &fresh), Err(Error::NotConfigured));
}

/// 邮件回退码独立于 2FA 凭证状态
#[test]
fn test_email_code_independent_of_totp_state() {
    let manager = manager();

    // 从未 setup 的用户也可以走邮件验证
    let code = manager.issue_email_code("u1").unwrap();
    manager.check_email_code("u1", &code).unwrap();

    // 已启用 2FA 的用户同样可以
    let enrollment = manager.setup("u2").unwrap();
    manager
        .confirm("u2", &authenticator_code(&enrollment.secret))
        .unwrap();
    let code = manager.issue_email_code("u2").unwrap();
    manager.check_email_code("u2", &code).unwrap();

    // 邮件码验证不影响凭证状态
    assert!(matches!(
        manager.status("u2").unwrap(),
        TwoFactorStatus::Enabled { .. }
    ));
}

/// 自定义存储注入：引擎不依赖内置内存实现
#[test]
fn test_manager_with_injected_store() {
    let store = InMemoryCredentialStore::new();
    let manager = TwoFactorManager::with_store(store.clone(), TotpConfig::default());

    let enrollment = manager.setup("u1").unwrap();
    manager
        .confirm("u1", &authenticator_code(&enrollment.secret))
        .unwrap();

    // 同一个存储背后的记录可以直接观察到
    assert_eq!(store.len(), 1);
    let credential = store.get_credential("u1").unwrap().unwrap();
    assert!(credential.enabled);
    assert_eq!(credential.backup_codes.len(), 10);
}

/// 密钥可以从 otpauth URI 中的 base32 恢复（认证器与服务端一致）
#[test]
fn test_secret_round_trip_through_uri() {
    let manager = manager();
    let enrollment = manager.setup("u1").unwrap();

    // URI 内嵌的 base32 与密钥一致
    assert!(enrollment.uri.contains(&format!("secret={}", enrollment.secret.base32)));

    // 从 base32 恢复出的密钥生成相同的验证码
    let restored = TotpSecret::from_base32(&enrollment.secret.base32);
    assert_eq!(restored.raw, enrollment.secret.raw);

    let generator = TotpGenerator::default_generator();
    let code = generator.generate_code(&restored).unwrap();
    manager.confirm("u1", &code).unwrap();
}
