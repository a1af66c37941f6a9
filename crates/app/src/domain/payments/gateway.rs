//! Payment gateway capability.

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::{
    enrollments::records::EnrollmentUuid,
    payments::{
        errors::{CallbackError, GatewayError},
        reference::enrollment_from_reference,
    },
    users::UserUuid,
};

/// Buyer details some providers require for billing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// What a gateway needs to open a payable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub enrollment: EnrollmentUuid,
    pub user: UserUuid,
    pub description: String,

    /// Amount to charge in minor units.
    pub amount: u64,

    pub customer: CustomerDetails,
}

/// A payable session opened with a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// Where the buyer completes payment.
    pub redirect_url: String,

    /// Reference used to verify the payment later.
    pub reference: String,
}

/// A raw provider callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackRequest {
    pub body: Vec<u8>,
    pub query: Vec<(String, String)>,

    /// Value of the `signature` header, when sent.
    pub signature: Option<String>,
}

impl CallbackRequest {
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The body as JSON. An empty body reads as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::Malformed`] when the body is not JSON.
    pub fn json(&self) -> Result<Value, CallbackError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        Ok(serde_json::from_slice(&self.body)?)
    }

    /// A field from the JSON body, falling back to the query string.
    #[must_use]
    pub fn input(&self, body: &Value, name: &str) -> Option<String> {
        body.get(name)
            .and_then(scalar_to_string)
            .or_else(|| self.query_param(name).map(ToString::to_string))
            .filter(|value| !value.is_empty())
    }

    /// Resolve the enrollment from an explicit `enrollment_id`, else from the reference.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::MissingField`] when neither identifies an enrollment.
    pub fn enrollment(
        &self,
        body: &Value,
        reference: &str,
    ) -> Result<EnrollmentUuid, CallbackError> {
        self.input(body, "enrollment_id")
            .and_then(|id| id.parse::<uuid::Uuid>().ok())
            .map(EnrollmentUuid::from_uuid)
            .or_else(|| enrollment_from_reference(reference))
            .ok_or(CallbackError::MissingField("enrollment_id"))
    }
}

/// The trusted content of a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub reference: String,
    pub enrollment: EnrollmentUuid,
}

/// A payment provider.
///
/// Implementations differ only in wire protocol; adding a provider never touches
/// enrollment orchestration.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registry name, also stored as the enrollment's payment method.
    fn name(&self) -> &'static str;

    /// Open a payable session for an enrollment.
    async fn create_session(&self, request: &SessionRequest)
    -> Result<PaymentSession, GatewayError>;

    /// Ask the provider whether `reference` has been paid.
    async fn verify(&self, reference: &str) -> Result<bool, GatewayError>;

    /// Authenticate and decode a callback. Never contacts the provider.
    fn parse_callback(&self, callback: &CallbackRequest)
    -> Result<CallbackPayload, CallbackError>;
}

/// Render minor units as a two-decimal major-unit string.
#[must_use]
pub fn format_major_units(amount: u64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}

/// Append query parameters to a configured URL.
pub(crate) fn url_with_params(base: &str, params: &[(&str, &str)]) -> Result<String, GatewayError> {
    reqwest::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|error| GatewayError::InvalidUrl(format!("{base}: {error}")))
}

/// Build a client bounded by `timeout`.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[must_use]
pub(crate) fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();

    for part in parts {
        hasher.update(part.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Compare two hex digests without leaking timing.
#[must_use]
pub(crate) fn digests_match(expected: &str, provided: &str) -> bool {
    let expected = expected.to_ascii_lowercase();
    let provided = provided.trim().to_ascii_lowercase();

    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
