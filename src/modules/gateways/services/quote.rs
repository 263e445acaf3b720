use async_trait::async_trait;
use std::time::Duration;

use crate::core::Result;
use crate::modules::gateways::models::Quote;

use super::http_client::GatewayClient;

/// Read access to contractor quotes
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    async fn fetch_quote(&self, request_id: &str, contractor_id: &str) -> Result<Quote>;
}

/// Quote service over HTTP
pub struct HttpQuoteGateway {
    client: GatewayClient,
}

impl HttpQuoteGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: GatewayClient::new("Quote service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl QuoteGateway for HttpQuoteGateway {
    async fn fetch_quote(&self, request_id: &str, contractor_id: &str) -> Result<Quote> {
        let path = format!("/quote/{}/contractor/{}", request_id, contractor_id);
        let quote: Quote = self.client.get_json(&path).await?;

        tracing::debug!(
            quote_id = %quote.id,
            request_id = %request_id,
            contractor_id = %contractor_id,
            admin_status = ?quote.admin_status,
            "Fetched quote"
        );

        Ok(quote)
    }
}
