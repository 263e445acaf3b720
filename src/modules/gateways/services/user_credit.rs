use async_trait::async_trait;
use std::time::Duration;

use crate::core::Result;
use crate::modules::gateways::models::{CreditAdjustment, CreditBalance, CreditProfile};

use super::http_client::GatewayClient;

/// User profile and SAMA credit ledger
#[async_trait]
pub trait UserCreditGateway: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<CreditProfile>;

    async fn adjust_credit(&self, user_id: &str, adjustment: &CreditAdjustment) -> Result<CreditBalance>;
}

pub struct HttpUserCreditGateway {
    client: GatewayClient,
}

impl HttpUserCreditGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: GatewayClient::new("User service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl UserCreditGateway for HttpUserCreditGateway {
    async fn fetch_profile(&self, user_id: &str) -> Result<CreditProfile> {
        self.client.get_json(&format!("/users/{}", user_id)).await
    }

    async fn adjust_credit(&self, user_id: &str, adjustment: &CreditAdjustment) -> Result<CreditBalance> {
        let balance: CreditBalance = self
            .client
            .patch_json(&format!("/users/{}/credit", user_id), adjustment)
            .await?;

        tracing::info!(
            user_id = %user_id,
            project_id = %adjustment.project_id,
            operation = ?adjustment.operation,
            amount = %adjustment.amount,
            before = %balance.before_amount,
            after = %balance.after_amount,
            "Adjusted user credit"
        );

        Ok(balance)
    }
}
