use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::core::{AppError, Caller, ErrorKind, Result};
use crate::middleware::auth::{
    sign_identity, IDENTITY_SIGNATURE_HEADER, USER_ID_HEADER, USER_ROLE_HEADER,
};
use crate::modules::projects::models::ProjectAggregate;

use super::payment_engine::{
    AmountInput, PaymentEngine, PaymentSummary, ReleaseInput, SelectPaymentInput,
};

const SERVICE: &str = "Payment service";

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: RemoteError,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    kind: ErrorKind,
    message: String,
}

/// Payment engine deployed as a separate service.
///
/// Forwards the caller's signed identity and decodes the peer's tagged error body, so callers
/// see the same error kinds as with the local engine.
pub struct RemotePaymentEngine {
    client: Client,
    base_url: String,
    identity_secret: Vec<u8>,
}

impl RemotePaymentEngine {
    pub fn new(base_url: impl Into<String>, identity_secret: impl Into<Vec<u8>>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build payment service client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity_secret: identity_secret.into(),
        })
    }

    fn url(&self, project_id: &str, suffix: &str) -> String {
        format!("{}/api/projects/{}/payment{}", self.base_url, project_id, suffix)
    }

    fn with_identity(&self, request: RequestBuilder, caller: &Caller) -> Result<RequestBuilder> {
        let role = caller.role.as_str();
        let signature = sign_identity(&self.identity_secret, &caller.id, role)?;

        Ok(request
            .header(USER_ID_HEADER, caller.id.as_str())
            .header(USER_ROLE_HEADER, role)
            .header(IDENTITY_SIGNATURE_HEADER, signature))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        caller: &Caller,
        project_id: &str,
        suffix: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.client.post(self.url(project_id, suffix)).json(body);
        self.execute(self.with_identity(request, caller)?).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::from_transport(SERVICE, &e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::from_transport(SERVICE, &e));
        }

        let body = response.text().await.unwrap_or_default();
        Err(decode_error(status.as_u16(), &body))
    }
}

/// Rebuild the peer's error from its tagged body, falling back to the status code
fn decode_error(status: u16, body: &str) -> AppError {
    match serde_json::from_str::<RemoteErrorBody>(body) {
        Ok(parsed) => AppError::from_kind(parsed.error.kind, parsed.error.message),
        Err(_) => {
            tracing::warn!(status, body = %body, "Payment service returned an untagged error");
            AppError::from_kind(
                ErrorKind::from_status(status),
                format!("{} responded with status {}", SERVICE, status),
            )
        }
    }
}

#[async_trait]
impl PaymentEngine for RemotePaymentEngine {
    async fn select_payment_method(
        &self,
        caller: &Caller,
        project_id: &str,
        input: SelectPaymentInput,
    ) -> Result<ProjectAggregate> {
        self.post(caller, project_id, "/method", &input).await
    }

    async fn process_full_payment(
        &self,
        caller: &Caller,
        project_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate> {
        self.post(caller, project_id, "/full", &AmountInput { amount }).await
    }

    async fn process_downpayment(
        &self,
        caller: &Caller,
        project_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate> {
        self.post(caller, project_id, "/downpayment", &AmountInput { amount })
            .await
    }

    async fn pay_installment(
        &self,
        caller: &Caller,
        project_id: &str,
        installment_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate> {
        let suffix = format!("/installments/{}", installment_id);
        self.post(caller, project_id, &suffix, &AmountInput { amount }).await
    }

    async fn release_payment_to_contractor(
        &self,
        caller: &Caller,
        project_id: &str,
        input: ReleaseInput,
    ) -> Result<ProjectAggregate> {
        self.post(caller, project_id, "/release", &input).await
    }

    async fn get_payment_summary(&self, caller: &Caller, project_id: &str) -> Result<PaymentSummary> {
        let request = self.client.get(self.url(project_id, ""));
        self.execute(self.with_identity(request, caller)?).await
    }
}
