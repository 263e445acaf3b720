use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::core::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Number of digits in a completion code
pub const OTP_LENGTH: usize = 6;

/// Source of completion codes
pub trait OtpGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random zero-padded 6-digit codes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOtpGenerator;

impl OtpGenerator for RandomOtpGenerator {
    fn generate(&self) -> String {
        let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{:06}", code)
    }
}

/// Always returns the same code
#[derive(Debug, Clone)]
pub struct FixedOtpGenerator(pub String);

impl FixedOtpGenerator {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

impl OtpGenerator for FixedOtpGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

fn otp_mac(installation_id: &str, code: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(installation_id.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid OTP key: {}", e)))?;
    mac.update(code.trim().as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 of the code keyed with the installation id.
///
/// Only this hash is stored.
pub fn hash_otp(installation_id: &str, code: &str) -> Result<String> {
    Ok(hex::encode(otp_mac(installation_id, code)?.finalize().into_bytes()))
}

/// Constant-time check of a submitted code against a stored hash
pub fn otp_matches(installation_id: &str, code: &str, stored_hash: &str) -> bool {
    let Ok(expected) = hex::decode(stored_hash) else {
        return false;
    };
    otp_mac(installation_id, code)
        .map(|mac| mac.verify_slice(&expected).is_ok())
        .unwrap_or(false)
}
