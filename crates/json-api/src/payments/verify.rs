//! Verify Payment Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lectern_app::domain::enrollments::records::EnrollmentUuid;

use crate::{
    enrollments::errors::into_status_error as enrollment_status_error,
    extensions::*,
    observability::{VerificationOutcome, VerificationSource, record_verification},
    payments::{PaymentOutcomeResponse, errors::into_status_error},
    state::State,
};

/// Verify Payment Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct VerifyPaymentRequest {
    /// Provider reference returned when the enrollment was created
    pub reference: String,

    pub enrollment_uuid: Uuid,
}

/// Verify Payment Handler
///
/// Confirms a payment with its provider and completes the enrollment once paid.
/// An unpaid or unconfirmed payment is `success: false`, not an error. Only the
/// enrollment's owner may verify it; anyone else gets a 404.
#[endpoint(
    tags("payments"),
    summary = "Verify Payment",
    responses(
        (status_code = StatusCode::OK, description = "Verification outcome"),
        (status_code = StatusCode::NOT_FOUND, description = "Enrollment not found"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<VerifyPaymentRequest>,
    depot: &mut Depot,
) -> Result<Json<PaymentOutcomeResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_404()?;
    let user = depot.user_uuid_or_401()?;

    let request = json.into_inner();
    let enrollment = EnrollmentUuid::from_uuid(request.enrollment_uuid);

    let owner = state
        .app
        .enrollments
        .get_enrollment(tenant, enrollment)
        .await
        .map_err(enrollment_status_error)?
        .user_uuid;

    if owner != user {
        return Err(StatusError::not_found().brief("Enrollment not found"));
    }

    let success = state
        .app
        .payments
        .verify_payment(tenant, &request.reference, enrollment)
        .await
        .map_err(into_status_error)?;

    record_verification(
        VerificationSource::Client,
        VerificationOutcome::from_paid(success),
    );

    Ok(Json(PaymentOutcomeResponse { success }))
}
