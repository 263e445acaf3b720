pub mod installation_service;
pub mod otp;

pub use installation_service::{
    CompleteInput, InstallationService, OtpPolicy, QualityCheckInput, ScheduleInput, VerifyInput,
    DEFAULT_MAX_OTP_ATTEMPTS, DEFAULT_OTP_TTL_MINUTES,
};
pub use otp::{FixedOtpGenerator, OtpGenerator, RandomOtpGenerator};
