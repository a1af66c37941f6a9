//! PayTabs server-key query gateway.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

use crate::domain::payments::{
    errors::{CallbackError, GatewayError},
    gateway::{
        CallbackPayload, CallbackRequest, PaymentGateway, PaymentSession, SessionRequest,
        digests_match, format_major_units, http_client, url_with_params,
    },
    reference::generate_reference,
};

pub const PAYTABS: &str = "paytabs";

/// Approved transaction status.
const APPROVED: &str = "A";

#[derive(Debug, Clone)]
pub struct PaytabsConfig {
    pub base_url: String,
    pub profile_id: u64,
    pub server_key: String,
    pub currency: String,

    /// Buyer return page; the enrollment id is appended.
    pub return_url: String,

    /// Server-to-server callback; the enrollment id is appended.
    pub callback_url: String,

    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PaytabsGateway {
    client: reqwest::Client,
    config: PaytabsConfig,
}

#[derive(Debug, Deserialize)]
struct PaymentRequestResponse {
    tran_ref: String,
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    payment_result: Option<PaymentResult>,
}

#[derive(Debug, Deserialize)]
struct PaymentResult {
    response_status: String,
}

impl PaytabsGateway {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: PaytabsConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn body_signature(&self, body: &[u8]) -> Result<String, CallbackError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.config.server_key.as_bytes())
            .map_err(|_| CallbackError::InvalidSignature)?;
        mac.update(body);

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentGateway for PaytabsGateway {
    fn name(&self) -> &'static str {
        PAYTABS
    }

    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, GatewayError> {
        let cart_id = generate_reference(request.enrollment, Timestamp::now());
        let enrollment = request.enrollment.to_string();
        let params = [("enrollment_id", enrollment.as_str())];

        let response = self
            .client
            .post(self.endpoint("/payment/request"))
            .header("authorization", &self.config.server_key)
            .json(&json!({
                "profile_id": self.config.profile_id,
                "tran_type": "sale",
                "tran_class": "ecom",
                "cart_id": cart_id,
                "cart_description": request.description,
                "cart_currency": self.config.currency,
                "cart_amount": format_major_units(request.amount),
                "return": url_with_params(&self.config.return_url, &params)?,
                "callback": url_with_params(&self.config.callback_url, &params)?,
                "customer_details": {
                    "name": request.customer.name.as_deref().unwrap_or("Student"),
                    "email": request.customer.email.as_deref().unwrap_or_default(),
                    "phone": request.customer.phone.as_deref().unwrap_or_default(),
                    "city": "Cairo",
                    "country": "EG",
                },
                "hide_shipping": true,
            }))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let created: PaymentRequestResponse = response.json().await?;

        Ok(PaymentSession {
            redirect_url: created.redirect_url,
            reference: created.tran_ref,
        })
    }

    async fn verify(&self, reference: &str) -> Result<bool, GatewayError> {
        let response = self
            .client
            .post(self.endpoint("/payment/query"))
            .header("authorization", &self.config.server_key)
            .json(&json!({
                "profile_id": self.config.profile_id,
                "tran_ref": reference,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), reference, "paytabs query rejected");

            return Ok(false);
        }

        let query: QueryResponse = response.json().await?;

        Ok(query
            .payment_result
            .is_some_and(|result| result.response_status == APPROVED))
    }

    fn parse_callback(
        &self,
        callback: &CallbackRequest,
    ) -> Result<CallbackPayload, CallbackError> {
        let provided = callback
            .signature
            .as_deref()
            .ok_or(CallbackError::InvalidSignature)?;

        if !digests_match(&self.body_signature(&callback.body)?, provided) {
            return Err(CallbackError::InvalidSignature);
        }

        let body = callback.json()?;

        let reference = callback
            .input(&body, "tran_ref")
            .ok_or(CallbackError::MissingField("tran_ref"))?;

        let cart_id = callback.input(&body, "cart_id").unwrap_or_default();
        let enrollment = callback.enrollment(&body, &cart_id)?;

        Ok(CallbackPayload {
            reference,
            enrollment,
        })
    }
}
