//! Client-app deep links for buyers returning from a provider.

use crate::domain::payments::{errors::GatewayError, gateway::CallbackRequest};

/// Default client-app URL scheme.
pub const DEFAULT_APP_SCHEME: &str = "lmsapp";

/// Query names providers use for the payment reference, in lookup order.
const REFERENCE_PARAMS: [&str; 4] = ["merchantRefNumber", "tran_ref", "order", "reference"];

/// Build `{scheme}://payment/result?success&enrollment_id&reference&gateway` from the
/// query string a provider returned the buyer with.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidUrl`] when `scheme` cannot form a URL.
pub fn build_return_link(
    scheme: &str,
    gateway: &str,
    query: &CallbackRequest,
) -> Result<String, GatewayError> {
    let success = query.query_param("success").unwrap_or("false");
    let enrollment = query.query_param("enrollment_id").unwrap_or_default();
    let reference = REFERENCE_PARAMS
        .iter()
        .find_map(|name| query.query_param(name))
        .unwrap_or_default();

    let mut url = reqwest::Url::parse(&format!("{scheme}://payment/result"))
        .map_err(|error| GatewayError::InvalidUrl(format!("{scheme}: {error}")))?;

    url.query_pairs_mut()
        .append_pair("success", success)
        .append_pair("enrollment_id", enrollment)
        .append_pair("reference", reference)
        .append_pair("gateway", gateway);

    Ok(url.into())
}
