//! Fawry redirect-signature gateway.
//!
//! Sessions are built locally: the buyer is redirected to a signed charge URL. The
//! status endpoint is queried to verify payment.

use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Deserialize;
use tracing::debug;

use crate::domain::payments::{
    errors::{CallbackError, GatewayError},
    gateway::{
        CallbackPayload, CallbackRequest, PaymentGateway, PaymentSession, SessionRequest,
        digests_match, format_major_units, http_client, sha256_hex, url_with_params,
    },
    reference::generate_reference,
};

pub const FAWRY: &str = "fawry";

#[derive(Debug, Clone)]
pub struct FawryConfig {
    pub base_url: String,
    pub merchant_code: String,
    pub secret: String,
    pub currency: String,

    /// Where Fawry sends the buyer afterwards; the enrollment id is appended.
    pub return_url: String,

    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FawryGateway {
    client: reqwest::Client,
    config: FawryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status_code: Option<i64>,
    payment_status: Option<String>,
}

impl FawryGateway {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: FawryConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn reference_signature(&self, reference: &str) -> String {
        sha256_hex(&[&self.config.merchant_code, reference, &self.config.secret])
    }
}

#[async_trait]
impl PaymentGateway for FawryGateway {
    fn name(&self) -> &'static str {
        FAWRY
    }

    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, GatewayError> {
        let reference = generate_reference(request.enrollment, Timestamp::now());
        let customer = request.user.to_string();
        let amount = format_major_units(request.amount);
        let enrollment = request.enrollment.to_string();

        let signature = sha256_hex(&[
            &self.config.merchant_code,
            &reference,
            &customer,
            &amount,
            &self.config.secret,
        ]);

        let return_url = url_with_params(
            &self.config.return_url,
            &[("enrollment_id", enrollment.as_str())],
        )?;

        let redirect_url = url_with_params(
            &self.endpoint("/ECommerceWeb/Fawry/payments/charge"),
            &[
                ("merchantCode", self.config.merchant_code.as_str()),
                ("merchantRefNum", reference.as_str()),
                ("customerProfileId", customer.as_str()),
                ("amount", amount.as_str()),
                ("currencyCode", self.config.currency.as_str()),
                ("signature", signature.as_str()),
                ("returnUrl", return_url.as_str()),
            ],
        )?;

        Ok(PaymentSession {
            redirect_url,
            reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<bool, GatewayError> {
        let signature = self.reference_signature(reference);

        let response = self
            .client
            .get(self.endpoint("/ECommerceWeb/Fawry/payments/status"))
            .query(&[
                ("merchantCode", self.config.merchant_code.as_str()),
                ("merchantRefNumber", reference),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), reference, "fawry status query rejected");

            return Ok(false);
        }

        let status: StatusResponse = response.json().await?;

        Ok(status.status_code == Some(200) && status.payment_status.as_deref() == Some("PAID"))
    }

    fn parse_callback(
        &self,
        callback: &CallbackRequest,
    ) -> Result<CallbackPayload, CallbackError> {
        let body = callback.json()?;

        let reference = callback
            .input(&body, "merchantRefNumber")
            .ok_or(CallbackError::MissingField("merchantRefNumber"))?;

        let provided = callback
            .input(&body, "signature")
            .ok_or(CallbackError::InvalidSignature)?;

        if !digests_match(&self.reference_signature(&reference), &provided) {
            return Err(CallbackError::InvalidSignature);
        }

        let enrollment = callback.enrollment(&body, &reference)?;

        Ok(CallbackPayload {
            reference,
            enrollment,
        })
    }
}
