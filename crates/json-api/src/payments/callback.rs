//! Payment Callback Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use tracing::error;

use lectern_app::domain::payments::{CallbackRequest, PaymentsServiceError};

use crate::{
    extensions::*,
    observability::{
        VerificationOutcome, VerificationSource, record_callback_rejection, record_verification,
    },
    payments::{PaymentOutcomeResponse, errors::into_status_error},
    state::State,
};

pub(crate) const SIGNATURE_HEADER: &str = "signature";

/// Payment Callback Handler
///
/// Receives a provider's server-to-server notification. The payload is trusted only
/// after the provider's signature checks out, and the payment is always re-verified
/// with the provider before the enrollment completes.
#[endpoint(
    tags("payments"),
    summary = "Payment Provider Callback",
    responses(
        (status_code = StatusCode::OK, description = "Callback processed"),
        (status_code = StatusCode::BAD_REQUEST, description = "Untrusted or malformed callback"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown gateway or enrollment"),
    ),
)]
pub(crate) async fn handler(
    gateway: PathParam<String>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<PaymentOutcomeResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_404()?;
    let gateway = gateway.into_inner();

    let signature = req.header::<String>(SIGNATURE_HEADER);

    let query = req
        .queries()
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let body = req
        .payload()
        .await
        .map_err(|source| {
            error!(gateway = %gateway, "failed to read callback body: {source}");

            StatusError::bad_request().brief("Unreadable callback body")
        })?
        .to_vec();

    let callback = CallbackRequest {
        body,
        query,
        signature,
    };

    match state
        .app
        .payments
        .handle_callback(tenant, &gateway, callback)
        .await
    {
        Ok(success) => {
            record_verification(
                VerificationSource::Callback,
                VerificationOutcome::from_paid(success),
            );

            Ok(Json(PaymentOutcomeResponse { success }))
        }
        Err(service_error) => {
            if matches!(service_error, PaymentsServiceError::InvalidCallback { .. }) {
                record_callback_rejection(&gateway);
                record_verification(VerificationSource::Callback, VerificationOutcome::Rejected);
            }

            Err(into_status_error(service_error))
        }
    }
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use lectern_app::domain::payments::CallbackError;

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID, tenant_service};

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        tenant_service(mocks, Router::with_path("payments/{gateway}/callback").post(handler))
    }

    #[tokio::test]
    async fn test_callback_forwards_raw_request() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_handle_callback()
            .once()
            .withf(|tenant, gateway, callback| {
                *tenant == TEST_TENANT_UUID
                    && gateway == "paytabs"
                    && callback.body == br#"{"tran_ref":"TST1"}"#
                    && callback.signature.as_deref() == Some("abc123")
                    && callback.query_param("enrollment_id") == Some("42")
            })
            .return_once(|_, _, _| Ok(true));

        let mut res =
            TestClient::post("http://example.com/payments/paytabs/callback?enrollment_id=42")
                .add_header(SIGNATURE_HEADER, "abc123", true)
                .raw_json(r#"{"tran_ref":"TST1"}"#)
                .send(&make_service(mocks))
                .await;

        let body: PaymentOutcomeResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert!(body.success, "verified callbacks report success");

        Ok(())
    }

    #[tokio::test]
    async fn test_forged_callback_returns_400() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_handle_callback()
            .once()
            .return_once(|_, _, _| {
                Err(PaymentsServiceError::InvalidCallback {
                    gateway: "fawry".to_string(),
                    source: CallbackError::InvalidSignature,
                })
            });

        let res = TestClient::post("http://example.com/payments/fawry/callback")
            .raw_json("{}")
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_gateway_returns_404() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_handle_callback()
            .once()
            .return_once(|_, gateway, _| {
                Err(PaymentsServiceError::UnknownGateway(gateway.to_string()))
            });

        let res = TestClient::post("http://example.com/payments/stripe/callback")
            .raw_json("{}")
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
