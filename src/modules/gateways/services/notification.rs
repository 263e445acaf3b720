use async_trait::async_trait;
use std::time::Duration;

use crate::core::{AppError, Result};
use crate::modules::gateways::models::{DispatchAck, OtpMessage};

use super::http_client::GatewayClient;

/// Outbound SMS delivery
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver an OTP message. A refused dispatch is an error.
    async fn send_otp(&self, message: &OtpMessage) -> Result<()>;
}

pub struct HttpNotificationGateway {
    client: GatewayClient,
}

impl HttpNotificationGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: GatewayClient::new("Notification service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn send_otp(&self, message: &OtpMessage) -> Result<()> {
        let ack: DispatchAck = self.client.post_json("/sms/otp", message).await?;

        if !ack.success {
            tracing::warn!(project_id = %message.project_id, reason = ?ack.message, "OTP dispatch refused");
            return Err(AppError::unavailable(format!(
                "Notification service refused the OTP message{}",
                ack.message.map(|m| format!(": {}", m)).unwrap_or_default()
            )));
        }

        tracing::info!(project_id = %message.project_id, "OTP dispatched");
        Ok(())
    }
}
