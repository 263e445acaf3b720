use async_trait::async_trait;
use std::time::Duration;

use crate::core::Result;
use crate::modules::gateways::models::{ChargeRequest, ChargeResult};

use super::http_client::GatewayClient;

/// Charges money from the payer.
///
/// A declined charge is `Ok` with `success == false`; only transport problems are errors.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult>;

    fn name(&self) -> &str;
}

pub struct HttpPaymentProcessor {
    client: GatewayClient,
}

impl HttpPaymentProcessor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: GatewayClient::new("Payment processor", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        let result: ChargeResult = self.client.post_json("/charges", request).await?;

        tracing::info!(
            reference = %request.reference,
            amount = %request.amount,
            currency = %request.currency,
            success = result.success,
            gateway_reference = %result.reference,
            "Charge processed"
        );

        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// In-process processor that approves every charge.
///
/// Gateway references are derived from the request reference so runs are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPaymentProcessor;

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        tracing::debug!(reference = %request.reference, amount = %request.amount, "Mock charge approved");

        Ok(ChargeResult {
            success: true,
            reference: format!("MOCK-{}", request.reference),
            message: Some("Approved".to_string()),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
