use crate::core::{AppError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Variable lookup, `std::env` in production and a map in tests
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

pub(crate) fn parse_or<T: FromStr>(get: &Lookup<'_>, name: &str, default: T) -> Result<T> {
    match get(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}", name))),
        _ => Ok(default),
    }
}

fn required(get: &Lookup<'_>, name: &str) -> Result<String> {
    get(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Configuration(format!("{} not set", name)))
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub gateways: GatewayConfig,
    pub payment: PaymentConfig,
    pub otp: OtpConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// `json` switches the subscriber to JSON lines
    pub log_format: String,
    pub store_mode: StoreMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    MySql,
    Memory,
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown STORE_MODE: {}", other)),
        }
    }
}

/// Base URLs of the peer services
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub quote_service_url: String,
    pub user_service_url: String,
    pub notification_service_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEngineMode {
    Local,
    Remote,
}

impl FromStr for PaymentEngineMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("Unknown PAYMENT_ENGINE_MODE: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorMode {
    Http,
    Mock,
}

impl FromStr for ProcessorMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "mock" => Ok(Self::Mock),
            other => Err(format!("Unknown PAYMENT_PROCESSOR_MODE: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub engine_mode: PaymentEngineMode,
    /// Required when the engine is remote
    pub service_url: Option<String>,
    pub processor_mode: ProcessorMode,
    pub processor_url: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, Copy)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub identity_secret: String,
    pub internal_api_key_hash: String,
    pub rate_limit_per_minute: u32,
}

fn mode<T: FromStr<Err = String>>(get: &Lookup<'_>, name: &str, default: T) -> Result<T> {
    match get(name) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(AppError::Configuration),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(get: &Lookup<'_>) -> Result<Self> {
        let config = Config {
            app: AppConfig {
                env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
                log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                log_format: get("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
                store_mode: mode(get, "STORE_MODE", StoreMode::MySql)?,
            },
            database: DatabaseConfig::from_lookup(get)?,
            server: ServerConfig::from_lookup(get)?,
            gateways: GatewayConfig {
                quote_service_url: required(get, "QUOTE_SERVICE_URL")?,
                user_service_url: required(get, "USER_SERVICE_URL")?,
                notification_service_url: required(get, "NOTIFICATION_SERVICE_URL")?,
                timeout: Duration::from_secs(parse_or(get, "GATEWAY_TIMEOUT_SECS", 10)?),
            },
            payment: PaymentConfig {
                engine_mode: mode(get, "PAYMENT_ENGINE_MODE", PaymentEngineMode::Local)?,
                service_url: get("PAYMENT_SERVICE_URL").filter(|v| !v.trim().is_empty()),
                processor_mode: mode(get, "PAYMENT_PROCESSOR_MODE", ProcessorMode::Http)?,
                processor_url: get("PAYMENT_PROCESSOR_URL").filter(|v| !v.trim().is_empty()),
                currency: get("CURRENCY").unwrap_or_else(|| "SAR".to_string()),
            },
            otp: OtpConfig {
                ttl_minutes: parse_or(get, "OTP_TTL_MINUTES", 10)?,
                max_attempts: parse_or(get, "MAX_OTP_ATTEMPTS", 3)?,
            },
            security: SecurityConfig {
                identity_secret: required(get, "IDENTITY_SHARED_SECRET")?,
                internal_api_key_hash: required(get, "INTERNAL_API_KEY_HASH")?,
                rate_limit_per_minute: parse_or(get, "RATE_LIMIT_PER_MINUTE", 1000)?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.app.store_mode == StoreMode::MySql && self.database.url.is_empty() {
            return Err(AppError::Configuration(
                "DATABASE_URL is required when STORE_MODE=mysql".to_string(),
            ));
        }

        if self.payment.engine_mode == PaymentEngineMode::Remote && self.payment.service_url.is_none() {
            return Err(AppError::Configuration(
                "PAYMENT_SERVICE_URL is required when PAYMENT_ENGINE_MODE=remote".to_string(),
            ));
        }

        if self.payment.processor_mode == ProcessorMode::Http && self.payment.processor_url.is_none() {
            return Err(AppError::Configuration(
                "PAYMENT_PROCESSOR_URL is required when PAYMENT_PROCESSOR_MODE=http".to_string(),
            ));
        }

        if self.gateways.timeout.is_zero() {
            return Err(AppError::Configuration(
                "GATEWAY_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.otp.ttl_minutes <= 0 || self.otp.max_attempts <= 0 {
            return Err(AppError::Configuration(
                "OTP_TTL_MINUTES and MAX_OTP_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        if self.security.rate_limit_per_minute == 0 {
            return Err(AppError::Configuration(
                "Rate limit must be greater than 0".to_string(),
            ));
        }

        if self.payment.currency.len() != 3 {
            return Err(AppError::Configuration(
                "CURRENCY must be a 3-letter ISO code".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}
