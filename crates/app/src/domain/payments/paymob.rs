//! Paymob token-auth order gateway.
//!
//! An API key is exchanged for a short-lived bearer token, an order is registered,
//! and a payment key scoped to that order is embedded in the iframe URL. The order
//! id is the payment reference.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha512;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::domain::payments::{
    errors::{CallbackError, GatewayError},
    gateway::{
        CallbackPayload, CallbackRequest, PaymentGateway, PaymentSession, SessionRequest,
        digests_match, http_client, scalar_to_string, url_with_params,
    },
    reference::generate_reference,
};

pub const PAYMOB: &str = "paymob";

/// Tokens are valid for an hour; refresh a little early.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(58 * 60);

/// Payment keys expire after this many seconds.
const PAYMENT_KEY_EXPIRATION: u64 = 3600;

/// Transaction fields covered by the callback HMAC, in signing order.
const HMAC_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order.id",
    "owner",
    "pending",
    "source_data.pan",
    "source_data.sub_type",
    "source_data.type",
    "success",
];

#[derive(Debug, Clone)]
pub struct PaymobConfig {
    pub base_url: String,
    pub api_key: String,
    pub integration_id: u64,
    pub iframe_url: String,
    pub currency: String,

    /// Secret for callback HMACs. Without one, callbacks are trusted only through
    /// re-verification against the order.
    pub hmac_secret: Option<String>,

    pub timeout: Duration,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct PaymobGateway {
    client: reqwest::Client,
    config: PaymobConfig,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct PaymentKeyResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct OrderStatusResponse {
    #[serde(default)]
    paid_amount_cents: i64,
}

impl PaymobGateway {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: PaymobConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            config,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// A bearer token, exchanged for the API key when the cached one has lapsed.
    async fn auth_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.token.clone());
        }

        let response = self
            .client
            .post(self.endpoint("/api/auth/tokens"))
            .json(&json!({ "api_key": self.config.api_key }))
            .send()
            .await?;

        let TokenResponse { token } = successful(response).await?.json().await?;

        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + TOKEN_LIFETIME,
        });

        Ok(token)
    }

    fn verify_hmac(&self, secret: &str, body: &Value, provided: &str) -> Result<(), CallbackError> {
        let transaction = body.get("obj").unwrap_or(body);

        let message: String = HMAC_FIELDS
            .iter()
            .map(|path| {
                path.split('.')
                    .try_fold(transaction, |value, key| value.get(key))
                    .and_then(scalar_to_string)
                    .unwrap_or_default()
            })
            .collect();

        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
            .map_err(|_| CallbackError::InvalidSignature)?;
        mac.update(message.as_bytes());

        let expected = hex::encode(mac.finalize().into_bytes());

        if digests_match(&expected, provided) {
            Ok(())
        } else {
            Err(CallbackError::InvalidSignature)
        }
    }
}

async fn successful(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    Err(GatewayError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

fn split_name(name: Option<&str>) -> (String, String) {
    let name = name.map(str::trim).filter(|name| !name.is_empty());

    match name.and_then(|name| name.split_once(' ')) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (
            name.unwrap_or("Student").to_string(),
            "NA".to_string(),
        ),
    }
}

#[async_trait]
impl PaymentGateway for PaymobGateway {
    fn name(&self) -> &'static str {
        PAYMOB
    }

    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, GatewayError> {
        let token = self.auth_token().await?;
        let merchant_order_id = generate_reference(request.enrollment, Timestamp::now());

        let order: OrderResponse = successful(
            self.client
                .post(self.endpoint("/api/ecommerce/orders"))
                .bearer_auth(&token)
                .json(&json!({
                    "auth_token": token,
                    "delivery_needed": false,
                    "amount_cents": request.amount,
                    "currency": self.config.currency,
                    "merchant_order_id": merchant_order_id,
                    "items": [{
                        "name": request.description,
                        "amount_cents": request.amount,
                        "quantity": 1,
                    }],
                }))
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        let (first_name, last_name) = split_name(request.customer.name.as_deref());

        let payment_key: PaymentKeyResponse = successful(
            self.client
                .post(self.endpoint("/api/acceptance/payment_keys"))
                .bearer_auth(&token)
                .json(&json!({
                    "auth_token": token,
                    "amount_cents": request.amount,
                    "expiration": PAYMENT_KEY_EXPIRATION,
                    "order_id": order.id,
                    "currency": self.config.currency,
                    "integration_id": self.config.integration_id,
                    "billing_data": {
                        "first_name": first_name,
                        "last_name": last_name,
                        "email": request.customer.email.as_deref().unwrap_or("NA"),
                        "phone_number": request.customer.phone.as_deref().unwrap_or("NA"),
                        "apartment": "NA",
                        "floor": "NA",
                        "building": "NA",
                        "street": "NA",
                        "shipping_method": "NA",
                        "postal_code": "NA",
                        "city": "Cairo",
                        "state": "NA",
                        "country": "EG",
                    },
                }))
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        let redirect_url = url_with_params(
            &self.config.iframe_url,
            &[("payment_token", payment_key.token.as_str())],
        )?;

        Ok(PaymentSession {
            redirect_url,
            reference: order.id.to_string(),
        })
    }

    async fn verify(&self, reference: &str) -> Result<bool, GatewayError> {
        let token = self.auth_token().await?;

        let response = self
            .client
            .get(self.endpoint(&format!("/api/ecommerce/orders/{reference}")))
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), reference, "paymob order lookup rejected");

            return Ok(false);
        }

        let order: OrderStatusResponse = response.json().await?;

        Ok(order.paid_amount_cents > 0)
    }

    fn parse_callback(
        &self,
        callback: &CallbackRequest,
    ) -> Result<CallbackPayload, CallbackError> {
        let body = callback.json()?;

        if let Some(secret) = &self.config.hmac_secret {
            let provided = callback
                .query_param("hmac")
                .ok_or(CallbackError::InvalidSignature)?;

            self.verify_hmac(secret, &body, provided)?;
        }

        let order = body.get("obj").and_then(|obj| obj.get("order"));

        let reference = order
            .and_then(|order| order.get("id"))
            .and_then(scalar_to_string)
            .or_else(|| callback.input(&body, "order_id"))
            .or_else(|| callback.input(&body, "order"))
            .ok_or(CallbackError::MissingField("order.id"))?;

        let merchant_order_id = order
            .and_then(|order| order.get("merchant_order_id"))
            .and_then(scalar_to_string)
            .or_else(|| callback.input(&body, "merchant_order_id"))
            .unwrap_or_default();

        let enrollment = callback
            .enrollment(&body, &merchant_order_id)
            .or_else(|_| callback.enrollment(&body, &reference))?;

        Ok(CallbackPayload {
            reference,
            enrollment,
        })
    }
}
