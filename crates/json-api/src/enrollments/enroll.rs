//! Enroll Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use lectern_app::domain::{
    courses::records::CourseUuid,
    enrollments::{
        EnrollmentsServiceError,
        data::{EnrollmentRequest, EnrollmentResult},
    },
    payments::gateway::CustomerDetails,
};

use crate::{
    enrollments::errors::into_status_error,
    extensions::*,
    observability::{EnrollmentOutcome, record_enrollment},
    state::State,
};

/// Enroll Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct EnrollRequest {
    /// Coupon to redeem
    #[serde(default)]
    pub coupon_code: Option<String>,

    /// Buyer name for providers that require billing details
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,
}

/// Enrollment Created Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct EnrollmentCreatedResponse {
    /// Created enrollment UUID
    pub enrollment_uuid: Uuid,

    /// Payment status after creation
    pub status: String,

    /// Where the buyer pays; absent for free enrollments
    pub payment_url: Option<String>,

    /// Provider reference to verify later
    pub reference: Option<String>,

    /// Gateway handling payment
    pub gateway: Option<String>,
}

impl From<EnrollmentResult> for EnrollmentCreatedResponse {
    fn from(result: EnrollmentResult) -> Self {
        Self {
            enrollment_uuid: result.enrollment.uuid.into_uuid(),
            status: result.enrollment.payment_status.as_str().to_string(),
            payment_url: result.payment_url,
            reference: result.reference,
            gateway: result.gateway,
        }
    }
}

/// An empty body enrolls without a coupon.
async fn parse_enroll_request(req: &mut Request) -> Result<EnrollRequest, StatusError> {
    let payload = req.payload().await.map_err(|source| {
        debug!("failed to read enroll body: {source}");

        StatusError::bad_request().brief("Unreadable request body")
    })?;

    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(EnrollRequest::default());
    }

    serde_json::from_slice(payload).map_err(|source| {
        StatusError::bad_request()
            .brief("Invalid enrollment request")
            .detail(source.to_string())
    })
}

/// Enroll Handler
///
/// Enrolls the caller, opening a payment session when payment is due.
/// The JSON body is optional.
#[endpoint(
    tags("enrollments"),
    summary = "Enroll in Course",
    responses(
        (status_code = StatusCode::CREATED, description = "Enrollment created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Malformed request body"),
        (status_code = StatusCode::NOT_FOUND, description = "Course not found"),
        (status_code = StatusCode::CONFLICT, description = "Already enrolled"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Enrollment refused"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Payment session failed"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    course: PathParam<Uuid>,
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<EnrollmentCreatedResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_404()?;
    let user = depot.user_uuid_or_401()?;
    let body = parse_enroll_request(req).await?;

    let request = EnrollmentRequest {
        user,
        course: CourseUuid::from_uuid(course.into_inner()),
        coupon_code: body.coupon_code,
        customer: CustomerDetails {
            name: body.name,
            email: body.email,
            phone: body.phone,
        },
    };

    let result = state.app.enrollments.enroll(tenant, request).await;

    record_enrollment(match &result {
        Ok(result) if result.payment_url.is_none() => EnrollmentOutcome::Free,
        Ok(_) => EnrollmentOutcome::Pending,
        Err(EnrollmentsServiceError::PaymentSession { .. }) => EnrollmentOutcome::SessionFailed,
        Err(_) => EnrollmentOutcome::Rejected,
    });

    let result = result.map_err(into_status_error)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(result.into()))
}
