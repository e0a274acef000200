//! 地址验证模块
//!
//! Stellar 账户地址（StrKey）：
//! - 56 个字符，RFC 4648 base32 字母表（A-Z, 2-7），无填充
//! - 解码后 35 字节：1 字节版本（ed25519 公钥 = 6 << 3）+ 32 字节公钥 + 2 字节 CRC16-XModem（小端）
//!
//! 私钥种子（S 开头）与复用账户（M 开头，69 位）不会被当作身份接受。

use once_cell::sync::Lazy;
use regex::Regex;

/// ed25519 公钥的版本字节，编码后首字符为 'G'
const VERSION_ACCOUNT_ID: u8 = 6 << 3;

const ACCOUNT_DECODED_LEN: usize = 35;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

static ACCOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^G[A-Z2-7]{55}$").expect("account address pattern is valid"));

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证账户地址（格式 + 版本字节 + 校验和）
    pub fn validate_account(address: &str) -> bool {
        if !ACCOUNT_PATTERN.is_match(address) {
            return false;
        }

        let decoded = match decode_base32(address) {
            Some(bytes) if bytes.len() == ACCOUNT_DECODED_LEN => bytes,
            _ => return false,
        };

        if decoded[0] != VERSION_ACCOUNT_ID {
            return false;
        }

        let (body, checksum) = decoded.split_at(ACCOUNT_DECODED_LEN - 2);
        let expected = u16::from_le_bytes([checksum[0], checksum[1]]);
        crc16_xmodem(body) == expected
    }

    /// 由 32 字节 ed25519 公钥编码账户地址
    pub fn encode_account(public_key: &[u8; 32]) -> String {
        let mut payload = Vec::with_capacity(ACCOUNT_DECODED_LEN);
        payload.push(VERSION_ACCOUNT_ID);
        payload.extend_from_slice(public_key);
        let checksum = crc16_xmodem(&payload);
        payload.extend_from_slice(&checksum.to_le_bytes());
        encode_base32(&payload)
    }

    /// 缩写地址用于展示：`GAAZI4...CWN7`
    ///
    /// 地址过短时原样返回，空地址返回 `Unknown`。
    pub fn format_address(address: &str, start_len: usize, end_len: usize) -> String {
        if address.is_empty() {
            return "Unknown".to_string();
        }
        let chars: Vec<char> = address.chars().collect();
        if chars.len() < start_len + end_len {
            return address.to_string();
        }
        let head: String = chars[..start_len].iter().collect();
        let tail: String = chars[chars.len() - end_len..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn decode_base32(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for c in input.bytes() {
        let value: u32 = match c {
            b'A'..=b'Z' => (c - b'A') as u32,
            b'2'..=b'7' => (c - b'2' + 26) as u32,
            _ => return None,
        };

        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    // 剩余的填充位必须为零
    if buffer != 0 {
        return None;
    }
    Some(out)
}

fn encode_base32(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}
