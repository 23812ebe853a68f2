use tracing::{info, warn};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{ClientError, ClientResult};
use crate::model::{
    OfflineApproval, OfflinePaymentRequest, Page, PageRequest, Payment, PaymentConfirmation,
    PaymentIntent, PaymentIntentRequest, StripeConfig,
};
use crate::types::PaymentIntentId;

/// Card payments through the processor, and offline payments.
#[derive(Clone)]
pub struct PaymentsApi {
    client: ApiClient,
}

impl PaymentsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn stripe_config(&self) -> ClientResult<StripeConfig> {
        self.client
            .execute_json(ApiRequest::get("/api/payments/stripe/config"))
            .await
    }

    pub async fn create_payment_intent(
        &self,
        intent: &PaymentIntentRequest,
    ) -> ClientResult<PaymentIntent> {
        let request = ApiRequest::post("/api/payments/stripe/create-payment-intent").json(intent)?;
        let created: PaymentIntent = self.client.execute_json(request).await?;
        info!(
            "Created payment intent {} for {:.2} {}",
            created.payment_intent_id, created.amount, created.currency
        );
        Ok(created)
    }

    /// Ask the server to sync a payment intent's status from the processor.
    ///
    /// A 400 here is the processor refusing the payment and is reported as
    /// [`ClientError::Payment`]; it is never retried.
    pub async fn confirm_payment(&self, id: &PaymentIntentId) -> ClientResult<PaymentConfirmation> {
        let request = ApiRequest::post("/api/payments/stripe/confirm").segment(id);
        match self.client.execute_json(request).await {
            Err(ClientError::Api(err)) if err.status == Some(400) || err.status == Some(402) => {
                warn!("Payment {} rejected: {}", id, err.message);
                Err(ClientError::Payment(err.message))
            }
            other => other,
        }
    }

    pub async fn list(&self, page: PageRequest) -> ClientResult<Page<Payment>> {
        self.client
            .execute_json(super::paged(ApiRequest::get("/api/payments"), page))
            .await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Payment> {
        self.client
            .execute_json(ApiRequest::get("/api/payments").segment(id))
            .await
    }

    pub async fn approve_offline(&self, approval: &OfflineApproval) -> ClientResult<Payment> {
        let request = ApiRequest::post("/api/payments/offline-approve").json(approval)?;
        self.client.execute_json(request).await
    }

    pub async fn create_offline(&self, payment: &OfflinePaymentRequest) -> ClientResult<Payment> {
        let request = ApiRequest::post("/api/payments/create-offline").json(payment)?;
        self.client.execute_json(request).await
    }
}
