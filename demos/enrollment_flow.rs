//! 2FA 注册与登录流程示例
//!
//! 展示如何使用 twofa 完成注册、确认、登录验证、备用码和邮件回退码。
//!
//! 运行: cargo run --example enrollment_flow

use twofa::{TotpConfig, TotpGenerator, TwoFactorManager, TwoFactorStatus, VerifiedMethod};

fn main() {
    let manager = TwoFactorManager::new(TotpConfig::default().with_issuer("Demo Shop"));
    let user = "alice@example.com";

    // ========================================================================
    // 1. 注册
    // ========================================================================
    println!("=== 注册 ===");

    let enrollment = manager.setup(user).expect("密钥生成失败");
    println!("扫描此 URI 注册认证器:");
    println!("  {}", enrollment.uri);
    println!("请妥善保存以下备用码:");
    for code in &enrollment.backup_codes {
        println!("  {}", code);
    }

    // ========================================================================
    // 2. 确认（模拟用户认证器生成验证码）
    // ========================================================================
    println!("\n=== 确认 ===");

    let authenticator = TotpGenerator::default_generator();
    let code = authenticator
        .generate_code(&enrollment.secret)
        .expect("验证码生成失败");
    println!("用户输入认证器验证码: {}", code);

    manager.confirm(user, &code).expect("确认失败");
    println!("2FA 已启用: {:?}", manager.status(user).unwrap());

    // ========================================================================
    // 3. 登录验证
    // ========================================================================
    println!("\n=== 登录验证 ===");

    let code = authenticator.generate_code(&enrollment.secret).unwrap();
    match manager.verify(user, &code) {
        Ok(VerifiedMethod::Totp) => println!("TOTP 验证通过"),
        Ok(VerifiedMethod::BackupCode { remaining }) => {
            println!("备用码验证通过，剩余 {} 个", remaining)
        }
        Err(e) => println!("验证失败: {}", e),
    }

    // ========================================================================
    // 4. 备用码登录（手机不在身边时）
    // ========================================================================
    println!("\n=== 备用码登录 ===");

    let backup = &enrollment.backup_codes[0];
    match manager.verify(user, backup) {
        Ok(VerifiedMethod::BackupCode { remaining }) => {
            println!("备用码验证通过，剩余 {} 个", remaining);
            if remaining <= 2 {
                println!("备用码即将用尽，请重新生成");
            }
        }
        other => println!("意外结果: {:?}", other),
    }

    // 同一个备用码不能再次使用
    match manager.verify(user, backup) {
        Err(e) => println!("重复使用被拒绝: {}", e),
        Ok(_) => unreachable!("备用码只能使用一次"),
    }

    // ========================================================================
    // 5. 邮件回退码
    // ========================================================================
    println!("\n=== 邮件回退码 ===");

    let email_code = manager.issue_email_code(user).expect("签发失败");
    println!("发送到用户邮箱的验证码: {}", email_code);

    match manager.check_email_code(user, &email_code) {
        Ok(()) => println!("邮件验证码通过"),
        Err(e) => println!("验证失败: {}", e),
    }

    // ========================================================================
    // 6. 关闭 2FA
    // ========================================================================
    println!("\n=== 关闭 ===");

    manager.disable(user).expect("关闭失败");
    assert_eq!(manager.status(user).unwrap(), TwoFactorStatus::Unconfigured);
    println!("2FA 已关闭，凭证记录删除");
}
