//! Base32 编解码模块
//!
//! 实现 RFC 4648 的 32 字符字母表（`A-Z`、`2-7`）编解码，用于共享密钥的
//! 文本表示（otpauth URI 和手工录入）。
//!
//! 与通用 Base32 实现的区别：
//!
//! - 编码输出不带填充字符
//! - 解码时自动去除 `=`、统一大小写，并**跳过**字母表之外的字符
//!   （兼容用户手工抄写时夹带的空格、连字符等）
//!
//! 两个函数都是无副作用的全函数：任何输入都有输出，空输入或全非法输入
//! 产生空输出，没有错误路径。

/// RFC 4648 Base32 字母表
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// 将字节序列编码为 Base32 文本
///
/// 从左到右把输入比特流切成 5 比特一组，末组不足 5 比特时在右侧补零。
/// 输出不带 `=` 填充。
///
/// # Example
///
/// ```rust
/// use twofa::base32::encode;
///
/// assert_eq!(encode(b"foobar"), "MZXW6YTBOI");
/// ```
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            let index = ((buffer >> (bits - 5)) & 0x1f) as usize;
            out.push(ALPHABET[index] as char);
            bits -= 5;
        }
    }

    // 末组右侧补零
    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        out.push(ALPHABET[index] as char);
    }

    out
}

/// 将 Base32 文本解码为字节序列
///
/// 编码的逆操作：拼接 5 比特值，凑满 8 比特输出一个字节，
/// 末尾不足一个字节的比特被丢弃。
///
/// 大小写不敏感；`=` 填充和字母表之外的字符被直接跳过而不是报错。
///
/// # Example
///
/// ```rust
/// use twofa::base32::decode;
///
/// assert_eq!(decode("MZXW6YTBOI"), b"foobar");
/// assert_eq!(decode("mzxw 6ytb-oi=="), b"foobar");
/// ```
pub fn decode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for c in text.chars() {
        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u32 - 'A' as u32,
            c @ '2'..='7' => c as u32 - '2' as u32 + 26,
            // 填充和非法字符直接跳过
            _ => continue,
        };

        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            out.push(((buffer >> (bits - 8)) & 0xff) as u8);
            bits -= 8;
        }
    }

    out
}
