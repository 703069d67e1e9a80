//! Webhook 签名校验
//!
//! `x-line-signature` = base64(HMAC-SHA256(channel_secret, 原始请求体))。
//! 必须对原始字节计算，解析成 JSON 后再序列化会改变内容。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// 常数时间比较签名
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    let Ok(expected) = STANDARD.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// 计算签名（测试与本地模拟 LINE 请求用）
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    // HMAC 接受任意长度的 key，new_from_slice 不会失败
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}
